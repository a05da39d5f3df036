use crate::{
    entities::{item, item_image, Item, ItemImage, ItemImageModel, ItemModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
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

/// Catalog service for managing items and their images
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Create a new catalog item
    #[instrument(skip(self))]
    pub async fn create_item(&self, input: CreateItemInput) -> Result<ItemModel, ServiceError> {
        self.ensure_unique_sku(&input.sku, None).await?;

        if input.unit_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "unit_price cannot be negative".to_string(),
            ));
        }
        if matches!(input.cost_price, Some(cost) if cost < Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "cost_price cannot be negative".to_string(),
            ));
        }
        if input.quantity_on_hand < 0 {
            return Err(ServiceError::ValidationError(
                "quantity_on_hand cannot be negative".to_string(),
            ));
        }

        let item_id = Uuid::new_v4();

        let item = item::ActiveModel {
            id: Set(item_id),
            name: Set(input.name.clone()),
            sku: Set(input.sku.clone()),
            description: Set(input.description.clone()),
            unit_price: Set(input.unit_price),
            cost_price: Set(input.cost_price),
            quantity_on_hand: Set(input.quantity_on_hand),
            reorder_point: Set(input.reorder_point),
            deleted: Set(false),
            ..Default::default()
        };

        let item = item.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ItemCreated(item_id))
            .await;

        info!("Created item: {}", item_id);
        Ok(item)
    }

    /// Update an existing item
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        item_id: Uuid,
        input: UpdateItemInput,
    ) -> Result<ItemModel, ServiceError> {
        if let Some(ref sku) = input.sku {
            self.ensure_unique_sku(sku, Some(item_id)).await?;
        }
        if matches!(input.unit_price, Some(price) if price < Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "unit_price cannot be negative".to_string(),
            ));
        }
        if matches!(input.cost_price, Some(cost) if cost < Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "cost_price cannot be negative".to_string(),
            ));
        }

        let item = self.get_item(item_id).await?;
        let mut active: item::ActiveModel = item.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(sku) = input.sku {
            active.sku = Set(sku);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(unit_price) = input.unit_price {
            active.unit_price = Set(unit_price);
        }
        if let Some(cost_price) = input.cost_price {
            active.cost_price = Set(Some(cost_price));
        }
        if let Some(reorder_point) = input.reorder_point {
            active.reorder_point = Set(Some(reorder_point));
        }

        let item = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ItemUpdated(item_id))
            .await;

        info!("Updated item: {}", item_id);
        Ok(item)
    }

    /// Get a live (non-archived) item by ID
    #[instrument(skip(self))]
    pub async fn get_item(&self, item_id: Uuid) -> Result<ItemModel, ServiceError> {
        Item::find_by_id(item_id)
            .filter(item::Column::Deleted.eq(false))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))
    }

    /// Search live items by name or SKU substring
    #[instrument(skip(self))]
    pub async fn search_items(
        &self,
        query: ItemSearchQuery,
    ) -> Result<ItemSearchResult, ServiceError> {
        let mut db_query = Item::find().filter(item::Column::Deleted.eq(false));

        if let Some(search) = &query.search {
            db_query = db_query.filter(
                item::Column::Name
                    .contains(search)
                    .or(item::Column::Sku.contains(search)),
            );
        }

        let total = db_query.clone().count(&*self.db).await?;

        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = query.offset.unwrap_or(0);

        let items = db_query
            .order_by_desc(item::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(&*self.db)
            .await?;

        Ok(ItemSearchResult { items, total })
    }

    /// Items at or below their reorder point. The comparison runs over the
    /// fetched rows; only items that track a reorder point are considered.
    #[instrument(skip(self))]
    pub async fn low_stock_items(&self) -> Result<Vec<ItemModel>, ServiceError> {
        let tracked = Item::find()
            .filter(item::Column::Deleted.eq(false))
            .filter(item::Column::ReorderPoint.is_not_null())
            .order_by_asc(item::Column::Name)
            .all(&*self.db)
            .await?;

        Ok(tracked
            .into_iter()
            .filter(|item| match item.reorder_point {
                Some(point) => item.quantity_on_hand <= point,
                None => false,
            })
            .collect())
    }

    /// Soft-delete an item; its row and history stay in place
    #[instrument(skip(self))]
    pub async fn archive_item(&self, item_id: Uuid) -> Result<(), ServiceError> {
        let item = self.get_item(item_id).await?;

        let mut active: item::ActiveModel = item.into();
        active.deleted = Set(true);
        active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ItemArchived(item_id))
            .await;

        info!("Archived item {}", item_id);
        Ok(())
    }

    /// Record the metadata row for a stored image file
    #[instrument(skip(self, upload))]
    pub async fn record_image(
        &self,
        item_id: Uuid,
        upload: StoredUpload,
    ) -> Result<ItemImageModel, ServiceError> {
        // The item must be live before we attach files to it
        self.get_item(item_id).await?;

        let image_id = Uuid::new_v4();
        let image = item_image::ActiveModel {
            id: Set(image_id),
            item_id: Set(item_id),
            file_name: Set(upload.file_name),
            original_name: Set(upload.original_name),
            content_type: Set(upload.content_type),
            size_bytes: Set(upload.size_bytes),
            created_at: Set(Utc::now()),
        };

        let image = image.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ItemImageUploaded { item_id, image_id })
            .await;

        Ok(image)
    }

    /// List image metadata for an item
    #[instrument(skip(self))]
    pub async fn list_images(&self, item_id: Uuid) -> Result<Vec<ItemImageModel>, ServiceError> {
        self.get_item(item_id).await?;

        ItemImage::find()
            .filter(item_image::Column::ItemId.eq(item_id))
            .order_by_asc(item_image::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// Remove an image row; returns the model so the caller can unlink the
    /// stored file.
    #[instrument(skip(self))]
    pub async fn delete_image(
        &self,
        item_id: Uuid,
        image_id: Uuid,
    ) -> Result<ItemImageModel, ServiceError> {
        let image = ItemImage::find_by_id(image_id)
            .filter(item_image::Column::ItemId.eq(item_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Image {} not found for item {}", image_id, item_id))
            })?;

        let active: item_image::ActiveModel = image.clone().into();
        active.delete(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ItemImageDeleted { item_id, image_id })
            .await;

        Ok(image)
    }

    async fn ensure_unique_sku(
        &self,
        sku: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = Item::find().filter(item::Column::Sku.eq(sku));
        if let Some(id) = exclude_id {
            query = query.filter(item::Column::Id.ne(id));
        }

        if query.one(&*self.db).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "SKU {} already exists",
                sku
            )));
        }

        Ok(())
    }
}

/// Input for creating an item
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CreateItemInput {
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub cost_price: Option<Decimal>,
    pub quantity_on_hand: i64,
    pub reorder_point: Option<i64>,
}

/// Input for updating an item
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdateItemInput {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub unit_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub reorder_point: Option<i64>,
}

/// Metadata of an upload already written to the media directory
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub file_name: String,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: i64,
}

/// Item search query
#[derive(Debug, Clone, Deserialize)]
pub struct ItemSearchQuery {
    pub search: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Item search result
#[derive(Debug, Serialize)]
pub struct ItemSearchResult {
    pub items: Vec<ItemModel>,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn create_item_input_defaults_to_zero_stock() {
        let input = CreateItemInput {
            name: "Espresso Beans 1kg".to_string(),
            sku: "BEAN-1KG".to_string(),
            unit_price: dec!(18.50),
            ..Default::default()
        };

        assert_eq!(input.quantity_on_hand, 0);
        assert!(input.cost_price.is_none());
        assert!(input.reorder_point.is_none());
    }

    #[test]
    fn update_item_input_partial() {
        let input = UpdateItemInput {
            unit_price: Some(dec!(19.99)),
            ..Default::default()
        };

        assert!(input.name.is_none());
        assert!(input.sku.is_none());
        assert_eq!(input.unit_price, Some(dec!(19.99)));
    }

    #[test]
    fn low_stock_comparison_respects_reorder_point() {
        let item = ItemModel {
            id: Uuid::new_v4(),
            name: "Filter Papers".to_string(),
            sku: "FILT-100".to_string(),
            description: None,
            unit_price: dec!(4.00),
            cost_price: Some(dec!(1.50)),
            quantity_on_hand: 5,
            reorder_point: Some(10),
            deleted: false,
            created_at: chrono::Utc::now(),
            updated_at: None,
        };

        let is_low = match item.reorder_point {
            Some(point) => item.quantity_on_hand <= point,
            None => false,
        };
        assert!(is_low);
    }
}
