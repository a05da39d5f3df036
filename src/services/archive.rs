use crate::{
    entities::{
        item, partner, transaction, Item, ItemModel, Partner, PartnerModel, Transaction,
        TransactionModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 100;

/// Archive service: lists soft-deleted rows and restores items and partners.
/// Transaction restore lives in `TransactionService` because it replays
/// stock movements.
#[derive(Clone)]
pub struct ArchiveService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ArchiveService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Archived items, newest first
    #[instrument(skip(self))]
    pub async fn list_archived_items(
        &self,
        page: ArchivePage,
    ) -> Result<(Vec<ItemModel>, u64), ServiceError> {
        let query = Item::find().filter(item::Column::Deleted.eq(true));
        let total = query.clone().count(&*self.db).await?;

        let items = query
            .order_by_desc(item::Column::CreatedAt)
            .limit(page.limit())
            .offset(page.offset())
            .all(&*self.db)
            .await?;

        Ok((items, total))
    }

    /// Archived partners, newest first
    #[instrument(skip(self))]
    pub async fn list_archived_partners(
        &self,
        page: ArchivePage,
    ) -> Result<(Vec<PartnerModel>, u64), ServiceError> {
        let query = Partner::find().filter(partner::Column::Deleted.eq(true));
        let total = query.clone().count(&*self.db).await?;

        let partners = query
            .order_by_desc(partner::Column::CreatedAt)
            .limit(page.limit())
            .offset(page.offset())
            .all(&*self.db)
            .await?;

        Ok((partners, total))
    }

    /// Archived transactions of both kinds, newest first
    #[instrument(skip(self))]
    pub async fn list_archived_transactions(
        &self,
        page: ArchivePage,
    ) -> Result<(Vec<TransactionModel>, u64), ServiceError> {
        let query = Transaction::find().filter(transaction::Column::Deleted.eq(true));
        let total = query.clone().count(&*self.db).await?;

        let transactions = query
            .order_by_desc(transaction::Column::CreatedAt)
            .limit(page.limit())
            .offset(page.offset())
            .all(&*self.db)
            .await?;

        Ok((transactions, total))
    }

    /// Bring an archived item back into the live catalog
    #[instrument(skip(self))]
    pub async fn restore_item(&self, item_id: Uuid) -> Result<ItemModel, ServiceError> {
        let item = Item::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))?;

        if !item.deleted {
            return Err(ServiceError::Conflict(format!(
                "Item {} is not archived",
                item_id
            )));
        }

        let mut active: item::ActiveModel = item.into();
        active.deleted = Set(false);
        let restored = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ItemRestored(item_id))
            .await;

        info!("Restored item {}", item_id);
        Ok(restored)
    }

    /// Bring an archived partner back
    #[instrument(skip(self))]
    pub async fn restore_partner(&self, partner_id: Uuid) -> Result<PartnerModel, ServiceError> {
        let partner = Partner::find_by_id(partner_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Partner {} not found", partner_id)))?;

        if !partner.deleted {
            return Err(ServiceError::Conflict(format!(
                "Partner {} is not archived",
                partner_id
            )));
        }

        let mut active: partner::ActiveModel = partner.into();
        active.deleted = Set(false);
        active.updated_at = Set(Some(Utc::now()));
        let restored = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::PartnerRestored(partner_id))
            .await;

        info!("Restored partner {}", partner_id);
        Ok(restored)
    }
}

/// Pagination window for archive listings
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ArchivePage {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl ArchivePage {
    fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
    }

    fn offset(&self) -> u64 {
        self.offset.unwrap_or(0)
    }
}
