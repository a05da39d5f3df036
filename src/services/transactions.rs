use crate::{
    entities::{
        item, partner,
        partner::PartnerKind,
        transaction, transaction_item,
        transaction::TransactionKind,
        Item, ItemModel, Transaction, TransactionItem, TransactionItemModel, TransactionModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{documents, partners::PartnerService},
};
use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 100;

/// Service recording purchases and sales.
///
/// Every write path here runs inside one database transaction: the partner
/// resolution, document-number allocation, header insert, line inserts and
/// stock movements commit or roll back together.
#[derive(Clone)]
pub struct TransactionService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

/// A transaction header with its line items
#[derive(Debug, Serialize)]
pub struct TransactionWithLines {
    pub transaction: TransactionModel,
    pub lines: Vec<TransactionItemModel>,
}

impl TransactionService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Record a purchase: stock in from a supplier.
    #[instrument(skip(self, input))]
    pub async fn create_purchase(
        &self,
        input: CreatePurchaseInput,
    ) -> Result<TransactionWithLines, ServiceError> {
        validate_lines(&input.lines, |line| (line.quantity, line.unit_cost))?;

        let txn = self.db.begin().await?;

        let supplier = match (input.supplier_id, input.supplier_name.as_deref()) {
            (Some(id), _) => {
                PartnerService::get_partner_of_kind(&txn, id, PartnerKind::Supplier).await?
            }
            (None, Some(name)) => find_or_create_supplier(&txn, name).await?,
            (None, None) => {
                return Err(ServiceError::ValidationError(
                    "Either supplier_id or supplier_name is required".to_string(),
                ));
            }
        };

        let mut stock_events = Vec::with_capacity(input.lines.len());
        let mut prepared = Vec::with_capacity(input.lines.len());
        let mut total = Decimal::ZERO;

        for line in &input.lines {
            let item = adjust_stock(&txn, line.item_id, line.quantity).await?;
            stock_events.push(Event::StockAdjusted {
                item_id: item.id,
                delta: line.quantity,
                quantity_on_hand: item.quantity_on_hand,
            });

            let line_total = line.unit_cost * Decimal::from(line.quantity);
            total += line_total;
            prepared.push((line.item_id, line.quantity, line.unit_cost, line_total));
        }

        let now = Utc::now();
        let document_number =
            documents::next_document_number(&txn, TransactionKind::Purchase, now.year()).await?;

        let header = transaction::ActiveModel {
            kind: Set(TransactionKind::Purchase),
            document_number: Set(document_number.clone()),
            partner_id: Set(supplier.id),
            total_amount: Set(total),
            notes: Set(input.notes),
            created_by: Set(input.created_by),
            deleted: Set(false),
            created_at: Set(now),
            updated_at: Set(None),
            ..Default::default()
        };
        let header = header.insert(&txn).await?;

        let lines = insert_lines(&txn, header.id, prepared).await?;

        txn.commit().await?;

        for event in stock_events {
            self.event_sender.send_or_log(event).await;
        }
        self.event_sender
            .send_or_log(Event::PurchaseRecorded {
                transaction_id: header.id,
                document_number,
                total_amount: total,
            })
            .await;

        info!(
            "Recorded purchase {} from supplier {}",
            header.document_number, supplier.id
        );
        Ok(TransactionWithLines {
            transaction: header,
            lines,
        })
    }

    /// Record a sale: stock out to a customer. Fails with 422 when any line
    /// would drive stock negative; nothing is written in that case.
    #[instrument(skip(self, input))]
    pub async fn create_sale(
        &self,
        input: CreateSaleInput,
    ) -> Result<TransactionWithLines, ServiceError> {
        validate_lines(&input.lines, |line| {
            (line.quantity, line.unit_price.unwrap_or(Decimal::ZERO))
        })?;

        let txn = self.db.begin().await?;

        let customer =
            PartnerService::get_partner_of_kind(&txn, input.customer_id, PartnerKind::Customer)
                .await?;

        let mut stock_events = Vec::with_capacity(input.lines.len());
        let mut prepared = Vec::with_capacity(input.lines.len());
        let mut total = Decimal::ZERO;

        for line in &input.lines {
            let item = adjust_stock(&txn, line.item_id, -line.quantity).await?;
            stock_events.push(Event::StockAdjusted {
                item_id: item.id,
                delta: -line.quantity,
                quantity_on_hand: item.quantity_on_hand,
            });

            // The catalog price applies unless the till overrides it
            let unit_price = line.unit_price.unwrap_or(item.unit_price);
            let line_total = unit_price * Decimal::from(line.quantity);
            total += line_total;
            prepared.push((line.item_id, line.quantity, unit_price, line_total));
        }

        let now = Utc::now();
        let document_number =
            documents::next_document_number(&txn, TransactionKind::Sale, now.year()).await?;

        let header = transaction::ActiveModel {
            kind: Set(TransactionKind::Sale),
            document_number: Set(document_number.clone()),
            partner_id: Set(customer.id),
            total_amount: Set(total),
            notes: Set(input.notes),
            created_by: Set(input.created_by),
            deleted: Set(false),
            created_at: Set(now),
            updated_at: Set(None),
            ..Default::default()
        };
        let header = header.insert(&txn).await?;

        let lines = insert_lines(&txn, header.id, prepared).await?;

        txn.commit().await?;

        for event in stock_events {
            self.event_sender.send_or_log(event).await;
        }
        self.event_sender
            .send_or_log(Event::SaleRecorded {
                transaction_id: header.id,
                document_number,
                total_amount: total,
            })
            .await;

        info!(
            "Recorded sale {} to customer {}",
            header.document_number, customer.id
        );
        Ok(TransactionWithLines {
            transaction: header,
            lines,
        })
    }

    /// Get a live transaction of the given kind, with its lines
    #[instrument(skip(self))]
    pub async fn get_transaction(
        &self,
        kind: TransactionKind,
        id: i64,
    ) -> Result<TransactionWithLines, ServiceError> {
        let header = Transaction::find_by_id(id)
            .filter(transaction::Column::Kind.eq(kind))
            .filter(transaction::Column::Deleted.eq(false))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{} {} not found", kind, id)))?;

        let lines = TransactionItem::find()
            .filter(transaction_item::Column::TransactionId.eq(id))
            .order_by_asc(transaction_item::Column::Id)
            .all(&*self.db)
            .await?;

        Ok(TransactionWithLines {
            transaction: header,
            lines,
        })
    }

    /// List live transactions of the given kind
    #[instrument(skip(self))]
    pub async fn list_transactions(
        &self,
        kind: TransactionKind,
        query: TransactionListQuery,
    ) -> Result<TransactionListResult, ServiceError> {
        let mut db_query = Transaction::find()
            .filter(transaction::Column::Kind.eq(kind))
            .filter(transaction::Column::Deleted.eq(false));

        if let Some(partner_id) = query.partner_id {
            db_query = db_query.filter(transaction::Column::PartnerId.eq(partner_id));
        }

        let total = db_query.clone().count(&*self.db).await?;

        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = query.offset.unwrap_or(0);

        let transactions = db_query
            .order_by_desc(transaction::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(&*self.db)
            .await?;

        Ok(TransactionListResult {
            transactions,
            total,
        })
    }

    /// Soft-delete a transaction and reverse its stock effect, atomically.
    /// Archiving a purchase removes the received stock again, so it fails
    /// with 422 when that stock has already been sold.
    #[instrument(skip(self))]
    pub async fn archive_transaction(
        &self,
        kind: TransactionKind,
        id: i64,
    ) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let header = Transaction::find_by_id(id)
            .filter(transaction::Column::Kind.eq(kind))
            .filter(transaction::Column::Deleted.eq(false))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{} {} not found", kind, id)))?;

        let stock_events = replay_stock(&txn, &header, StockReplay::Reverse).await?;

        let mut active: transaction::ActiveModel = header.into();
        active.deleted = Set(true);
        active.updated_at = Set(Some(Utc::now()));
        active.update(&txn).await?;

        txn.commit().await?;

        for event in stock_events {
            self.event_sender.send_or_log(event).await;
        }
        self.event_sender
            .send_or_log(Event::TransactionArchived(id))
            .await;

        info!("Archived transaction {}", id);
        Ok(())
    }

    /// Restore an archived transaction, replaying its stock effect.
    #[instrument(skip(self))]
    pub async fn restore_transaction(&self, id: i64) -> Result<TransactionModel, ServiceError> {
        let txn = self.db.begin().await?;

        let header = Transaction::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Transaction {} not found", id)))?;

        if !header.deleted {
            return Err(ServiceError::Conflict(format!(
                "Transaction {} is not archived",
                id
            )));
        }

        let stock_events = replay_stock(&txn, &header, StockReplay::Apply).await?;

        let mut active: transaction::ActiveModel = header.into();
        active.deleted = Set(false);
        active.updated_at = Set(Some(Utc::now()));
        let restored = active.update(&txn).await?;

        txn.commit().await?;

        for event in stock_events {
            self.event_sender.send_or_log(event).await;
        }
        self.event_sender
            .send_or_log(Event::TransactionRestored(id))
            .await;

        info!("Restored transaction {}", id);
        Ok(restored)
    }
}

/// Direction a transaction's stock effect is replayed in
#[derive(Debug, Clone, Copy)]
enum StockReplay {
    /// Re-apply the original effect (restore)
    Apply,
    /// Undo the original effect (archive)
    Reverse,
}

async fn replay_stock<C: ConnectionTrait>(
    conn: &C,
    header: &TransactionModel,
    direction: StockReplay,
) -> Result<Vec<Event>, ServiceError> {
    let lines = TransactionItem::find()
        .filter(transaction_item::Column::TransactionId.eq(header.id))
        .all(conn)
        .await?;

    let sign = match (header.kind, direction) {
        (TransactionKind::Purchase, StockReplay::Apply) => 1,
        (TransactionKind::Purchase, StockReplay::Reverse) => -1,
        (TransactionKind::Sale, StockReplay::Apply) => -1,
        (TransactionKind::Sale, StockReplay::Reverse) => 1,
    };

    let mut events = Vec::with_capacity(lines.len());
    for line in lines {
        let delta = sign * line.quantity;
        let item = adjust_stock(conn, line.item_id, delta).await?;
        events.push(Event::StockAdjusted {
            item_id: item.id,
            delta,
            quantity_on_hand: item.quantity_on_hand,
        });
    }

    Ok(events)
}

/// Move an item's stock level by `delta`, rejecting movements that would
/// leave it negative.
async fn adjust_stock<C: ConnectionTrait>(
    conn: &C,
    item_id: Uuid,
    delta: i64,
) -> Result<ItemModel, ServiceError> {
    let item = Item::find_by_id(item_id)
        .filter(item::Column::Deleted.eq(false))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))?;

    let new_quantity = item.quantity_on_hand + delta;
    if new_quantity < 0 {
        return Err(ServiceError::InsufficientStock(format!(
            "Item {} ({}) has {} on hand, short by {}",
            item.name,
            item.sku,
            item.quantity_on_hand,
            -new_quantity
        )));
    }

    let mut active: item::ActiveModel = item.into();
    active.quantity_on_hand = Set(new_quantity);
    active.update(conn).await.map_err(Into::into)
}

async fn insert_lines<C: ConnectionTrait>(
    conn: &C,
    transaction_id: i64,
    prepared: Vec<(Uuid, i64, Decimal, Decimal)>,
) -> Result<Vec<TransactionItemModel>, ServiceError> {
    let mut lines = Vec::with_capacity(prepared.len());
    for (item_id, quantity, unit_price, line_total) in prepared {
        let line = transaction_item::ActiveModel {
            transaction_id: Set(transaction_id),
            item_id: Set(item_id),
            quantity: Set(quantity),
            unit_price: Set(unit_price),
            line_total: Set(line_total),
            ..Default::default()
        };
        lines.push(line.insert(conn).await?);
    }
    Ok(lines)
}

fn validate_lines<T>(lines: &[T], extract: impl Fn(&T) -> (i64, Decimal)) -> Result<(), ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::ValidationError(
            "At least one line item is required".to_string(),
        ));
    }

    for line in lines {
        let (quantity, price) = extract(line);
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Line quantities must be positive".to_string(),
            ));
        }
        if price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Line prices cannot be negative".to_string(),
            ));
        }
    }

    Ok(())
}

async fn find_or_create_supplier<C: ConnectionTrait>(
    conn: &C,
    name: &str,
) -> Result<crate::entities::PartnerModel, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::ValidationError(
            "Supplier name cannot be blank".to_string(),
        ));
    }

    let existing = crate::entities::Partner::find()
        .filter(partner::Column::Kind.eq(PartnerKind::Supplier))
        .filter(partner::Column::Deleted.eq(false))
        .filter(partner::Column::Name.eq(name))
        .one(conn)
        .await?;

    if let Some(found) = existing {
        return Ok(found);
    }

    let created = partner::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        kind: Set(PartnerKind::Supplier),
        email: Set(None),
        phone: Set(None),
        address: Set(None),
        deleted: Set(false),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    };
    created.insert(conn).await.map_err(Into::into)
}

/// One line of a purchase
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PurchaseLineInput {
    pub item_id: Uuid,
    pub quantity: i64,
    pub unit_cost: Decimal,
}

/// Input for recording a purchase
#[derive(Debug, Deserialize, Serialize)]
pub struct CreatePurchaseInput {
    /// Existing supplier, or...
    pub supplier_id: Option<Uuid>,
    /// ...a supplier name to look up or create on the fly
    pub supplier_name: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub lines: Vec<PurchaseLineInput>,
}

/// One line of a sale
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SaleLineInput {
    pub item_id: Uuid,
    pub quantity: i64,
    /// Defaults to the item's catalog price when omitted
    pub unit_price: Option<Decimal>,
}

/// Input for recording a sale
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateSaleInput {
    pub customer_id: Uuid,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub lines: Vec<SaleLineInput>,
}

/// Transaction list query
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionListQuery {
    pub partner_id: Option<Uuid>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Transaction list result
#[derive(Debug, Serialize)]
pub struct TransactionListResult {
    pub transactions: Vec<TransactionModel>,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_lines_are_rejected() {
        let lines: Vec<PurchaseLineInput> = vec![];
        let err = validate_lines(&lines, |l| (l.quantity, l.unit_cost)).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        let lines = vec![PurchaseLineInput {
            item_id: Uuid::new_v4(),
            quantity: 0,
            unit_cost: dec!(5.00),
        }];
        assert!(validate_lines(&lines, |l| (l.quantity, l.unit_cost)).is_err());

        let lines = vec![SaleLineInput {
            item_id: Uuid::new_v4(),
            quantity: -3,
            unit_price: Some(dec!(5.00)),
        }];
        assert!(validate_lines(&lines, |l| (
            l.quantity,
            l.unit_price.unwrap_or(Decimal::ZERO)
        ))
        .is_err());
    }

    #[test]
    fn negative_prices_are_rejected() {
        let lines = vec![PurchaseLineInput {
            item_id: Uuid::new_v4(),
            quantity: 2,
            unit_cost: dec!(-0.01),
        }];
        assert!(validate_lines(&lines, |l| (l.quantity, l.unit_cost)).is_err());
    }

    #[test]
    fn line_totals_use_decimal_arithmetic() {
        let unit_cost = dec!(19.99);
        let quantity = 3_i64;
        assert_eq!(unit_cost * Decimal::from(quantity), dec!(59.97));
    }

    #[test]
    fn replay_signs_invert_per_kind_and_direction() {
        // purchase apply adds stock, sale apply removes it; reverse flips both
        let cases = [
            (TransactionKind::Purchase, StockReplay::Apply, 1),
            (TransactionKind::Purchase, StockReplay::Reverse, -1),
            (TransactionKind::Sale, StockReplay::Apply, -1),
            (TransactionKind::Sale, StockReplay::Reverse, 1),
        ];
        for (kind, direction, expected) in cases {
            let sign = match (kind, direction) {
                (TransactionKind::Purchase, StockReplay::Apply) => 1,
                (TransactionKind::Purchase, StockReplay::Reverse) => -1,
                (TransactionKind::Sale, StockReplay::Apply) => -1,
                (TransactionKind::Sale, StockReplay::Reverse) => 1,
            };
            assert_eq!(sign, expected);
        }
    }
}
