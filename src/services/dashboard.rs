use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    entities::{
        item::{self, Entity as ItemEntity},
        transaction::{self, Entity as TransactionEntity, TransactionKind},
    },
    errors::ServiceError,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SalesMetrics {
    pub total_sales: i64,
    pub total_revenue: Decimal,
    pub sales_today: i64,
    pub revenue_today: Decimal,
    pub sales_last_7_days: i64,
    pub revenue_last_7_days: Decimal,
    pub sales_last_30_days: i64,
    pub revenue_last_30_days: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PurchaseMetrics {
    pub total_purchases: i64,
    pub total_spend: Decimal,
    pub purchases_last_30_days: i64,
    pub spend_last_30_days: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InventoryMetrics {
    pub total_items: i64,
    pub low_stock_items: i64,
    pub out_of_stock_items: i64,
    /// Stock valued at cost, over items that carry a cost price
    pub stock_valuation: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardMetrics {
    pub sales: SalesMetrics,
    pub purchases: PurchaseMetrics,
    pub inventory: InventoryMetrics,
    pub generated_at: DateTime<Utc>,
}

/// One day of sales, for charting
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SalesTrendPoint {
    /// Calendar day, `YYYY-MM-DD`
    pub date: String,
    pub revenue: Decimal,
    pub count: i64,
}

/// Dashboard service aggregating live rows into metrics
#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DatabaseConnection>,
}

impl DashboardService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get the full dashboard metric set
    pub async fn get_dashboard_metrics(&self) -> Result<DashboardMetrics, ServiceError> {
        info!("Generating dashboard metrics");

        let sales = self.get_sales_metrics().await?;
        let purchases = self.get_purchase_metrics().await?;
        let inventory = self.get_inventory_metrics().await?;

        Ok(DashboardMetrics {
            sales,
            purchases,
            inventory,
            generated_at: Utc::now(),
        })
    }

    /// Sales counts and revenue over the usual windows
    pub async fn get_sales_metrics(&self) -> Result<SalesMetrics, ServiceError> {
        let now = Utc::now();
        let today_start = now.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();
        let week_start = now - Duration::days(7);
        let month_start = now - Duration::days(30);

        let all_sales = self.live_transactions(TransactionKind::Sale).await?;

        let window =
            |since: DateTime<Utc>| all_sales.iter().filter(move |t| t.created_at >= since);

        Ok(SalesMetrics {
            total_sales: all_sales.len() as i64,
            total_revenue: all_sales.iter().map(|t| t.total_amount).sum(),
            sales_today: window(today_start).count() as i64,
            revenue_today: window(today_start).map(|t| t.total_amount).sum(),
            sales_last_7_days: window(week_start).count() as i64,
            revenue_last_7_days: window(week_start).map(|t| t.total_amount).sum(),
            sales_last_30_days: window(month_start).count() as i64,
            revenue_last_30_days: window(month_start).map(|t| t.total_amount).sum(),
        })
    }

    /// Purchase counts and spend
    pub async fn get_purchase_metrics(&self) -> Result<PurchaseMetrics, ServiceError> {
        let month_start = Utc::now() - Duration::days(30);

        let all_purchases = self.live_transactions(TransactionKind::Purchase).await?;
        let recent: Vec<_> = all_purchases
            .iter()
            .filter(|t| t.created_at >= month_start)
            .collect();

        Ok(PurchaseMetrics {
            total_purchases: all_purchases.len() as i64,
            total_spend: all_purchases.iter().map(|t| t.total_amount).sum(),
            purchases_last_30_days: recent.len() as i64,
            spend_last_30_days: recent.iter().map(|t| t.total_amount).sum(),
        })
    }

    /// Inventory health over the live catalog
    pub async fn get_inventory_metrics(&self) -> Result<InventoryMetrics, ServiceError> {
        let db = &*self.db;

        let total_items = ItemEntity::find()
            .filter(item::Column::Deleted.eq(false))
            .count(db)
            .await?;

        let out_of_stock_items = ItemEntity::find()
            .filter(item::Column::Deleted.eq(false))
            .filter(item::Column::QuantityOnHand.eq(0))
            .count(db)
            .await?;

        let all_items = ItemEntity::find()
            .filter(item::Column::Deleted.eq(false))
            .all(db)
            .await?;

        let low_stock_items = all_items
            .iter()
            .filter(|i| match i.reorder_point {
                Some(point) => i.quantity_on_hand <= point,
                None => false,
            })
            .count() as i64;

        let stock_valuation: Decimal = all_items
            .iter()
            .filter_map(|i| {
                i.cost_price
                    .map(|cost| cost * Decimal::from(i.quantity_on_hand))
            })
            .sum();

        Ok(InventoryMetrics {
            total_items: total_items as i64,
            low_stock_items,
            out_of_stock_items: out_of_stock_items as i64,
            stock_valuation,
        })
    }

    /// Per-day revenue over the trailing `days` window
    pub async fn get_sales_trends(&self, days: i32) -> Result<Vec<SalesTrendPoint>, ServiceError> {
        let start_date = Utc::now() - Duration::days(days as i64);

        let sales = TransactionEntity::find()
            .filter(transaction::Column::Kind.eq(TransactionKind::Sale))
            .filter(transaction::Column::Deleted.eq(false))
            .filter(transaction::Column::CreatedAt.gte(start_date))
            .order_by_asc(transaction::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        // Group by calendar day and sum revenue
        let mut daily: BTreeMap<String, (Decimal, i64)> = BTreeMap::new();
        for sale in sales {
            let date_key = sale.created_at.format("%Y-%m-%d").to_string();
            let entry = daily.entry(date_key).or_insert((Decimal::ZERO, 0));
            entry.0 += sale.total_amount;
            entry.1 += 1;
        }

        Ok(daily
            .into_iter()
            .map(|(date, (revenue, count))| SalesTrendPoint {
                date,
                revenue,
                count,
            })
            .collect())
    }

    async fn live_transactions(
        &self,
        kind: TransactionKind,
    ) -> Result<Vec<transaction::Model>, ServiceError> {
        TransactionEntity::find()
            .filter(transaction::Column::Kind.eq(kind))
            .filter(transaction::Column::Deleted.eq(false))
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }
}
