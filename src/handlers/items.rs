use crate::auth::{AuthRouterExt, AuthUser};
use crate::entities::user::UserRole;
use crate::entities::{ItemImageModel, ItemModel};
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, PaginatedResponse,
    PaginationParams,
};
use crate::services::catalog::{
    CreateItemInput, ItemSearchQuery, StoredUpload, UpdateItemInput,
};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

const MAX_PAGE_SIZE: u64 = 100;
// Generous multipart ceiling; the per-file limit from config is enforced below
const MAX_FORM_BYTES: usize = 16 * 1024 * 1024;

/// Creates the router for item endpoints
pub fn items_routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create_item))
        .route("/:id", put(update_item).delete(archive_item))
        .route("/:id/images", post(upload_item_image))
        .route("/:id/images/:image_id", delete(delete_item_image))
        .layer(DefaultBodyLimit::max(MAX_FORM_BYTES))
        .with_role(UserRole::Manager);

    Router::new()
        .route("/", get(list_items))
        .route("/low-stock", get(low_stock_items))
        .route("/:id", get(get_item))
        .route("/:id/images", get(list_item_images))
        .with_auth()
        .merge(protected)
}

/// Create a new item
///
/// Writes arrive as `multipart/form-data` so an image can ride along with
/// the fields.
#[utoipa::path(
    post,
    path = "/api/v1/items",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Item created", body = ItemResponse),
        (status = 400, description = "Invalid form payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate SKU", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Items"
)]
pub async fn create_item(
    user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let form = read_item_form(&mut multipart, state.config.max_upload_size).await?;

    let name = form
        .name
        .clone()
        .ok_or_else(|| ApiError::ValidationError("name is required".to_string()))?;
    let sku = form
        .sku
        .clone()
        .ok_or_else(|| ApiError::ValidationError("sku is required".to_string()))?;
    let unit_price = form
        .unit_price
        .ok_or_else(|| ApiError::ValidationError("unit_price is required".to_string()))?;

    let input = CreateItemInput {
        name,
        sku,
        description: form.description.clone(),
        unit_price,
        cost_price: form.cost_price,
        quantity_on_hand: form.quantity_on_hand.unwrap_or(0),
        reorder_point: form.reorder_point,
    };

    let item = state
        .services
        .catalog
        .create_item(input)
        .await
        .map_err(map_service_error)?;

    if let Some(upload) = form.image {
        let stored = store_upload(&state.config.media_dir, &upload).await?;
        state
            .services
            .catalog
            .record_image(item.id, stored)
            .await
            .map_err(map_service_error)?;
    }

    Ok(created_response(ItemResponse::render(item, &user)))
}

/// Update an item; every field is optional, a new image is appended
#[utoipa::path(
    put,
    path = "/api/v1/items/:id",
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Item updated", body = ItemResponse),
        (status = 400, description = "Invalid form payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Items"
)]
pub async fn update_item(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let form = read_item_form(&mut multipart, state.config.max_upload_size).await?;

    let input = UpdateItemInput {
        name: form.name.clone(),
        sku: form.sku.clone(),
        description: form.description.clone(),
        unit_price: form.unit_price,
        cost_price: form.cost_price,
        reorder_point: form.reorder_point,
    };

    let item = state
        .services
        .catalog
        .update_item(id, input)
        .await
        .map_err(map_service_error)?;

    if let Some(upload) = form.image {
        let stored = store_upload(&state.config.media_dir, &upload).await?;
        state
            .services
            .catalog
            .record_image(item.id, stored)
            .await
            .map_err(map_service_error)?;
    }

    Ok(success_response(ItemResponse::render(item, &user)))
}

/// Get an item by ID
#[utoipa::path(
    get,
    path = "/api/v1/items/:id",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item retrieved", body = ItemResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Items"
)]
pub async fn get_item(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let item = state
        .services
        .catalog
        .get_item(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ItemResponse::render(item, &user)))
}

/// List items with pagination and substring search on name or SKU
#[utoipa::path(
    get,
    path = "/api/v1/items",
    params(PaginationParams, ItemFilterParams),
    responses(
        (status = 200, description = "Items retrieved"),
        (status = 400, description = "Invalid query parameters", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Items"
)]
pub async fn list_items(
    user: AuthUser,
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<ItemFilterParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    pagination.ensure_valid(MAX_PAGE_SIZE)?;

    let query = ItemSearchQuery {
        search: filter.search.clone(),
        limit: Some(pagination.per_page),
        offset: Some(pagination.offset()),
    };

    let result = state
        .services
        .catalog
        .search_items(query)
        .await
        .map_err(map_service_error)?;

    let items: Vec<ItemResponse> = result
        .items
        .into_iter()
        .map(|item| ItemResponse::render(item, &user))
        .collect();

    Ok(success_response(PaginatedResponse::new(
        items,
        pagination.page,
        pagination.per_page,
        result.total,
    )))
}

/// Items at or below their reorder point
#[utoipa::path(
    get,
    path = "/api/v1/items/low-stock",
    responses(
        (status = 200, description = "Low stock items retrieved")
    ),
    security(("Bearer" = [])),
    tag = "Items"
)]
pub async fn low_stock_items(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let items = state
        .services
        .catalog
        .low_stock_items()
        .await
        .map_err(map_service_error)?;

    let items: Vec<ItemResponse> = items
        .into_iter()
        .map(|item| ItemResponse::render(item, &user))
        .collect();

    Ok(success_response(items))
}

/// Soft-delete an item
#[utoipa::path(
    delete,
    path = "/api/v1/items/:id",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 204, description = "Item archived"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Items"
)]
pub async fn archive_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .catalog
        .archive_item(id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

/// Upload an image for an item
#[utoipa::path(
    post,
    path = "/api/v1/items/:id/images",
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Image stored", body = ItemImageResponse),
        (status = 400, description = "Missing or invalid image part", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Items"
)]
pub async fn upload_item_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let form = read_item_form(&mut multipart, state.config.max_upload_size).await?;
    let upload = form
        .image
        .ok_or_else(|| ApiError::ValidationError("An image part is required".to_string()))?;

    let stored = store_upload(&state.config.media_dir, &upload).await?;
    let image = state
        .services
        .catalog
        .record_image(id, stored)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ItemImageResponse::from(image)))
}

/// List image metadata for an item
#[utoipa::path(
    get,
    path = "/api/v1/items/:id/images",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Images retrieved", body = [ItemImageResponse]),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Items"
)]
pub async fn list_item_images(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let images = state
        .services
        .catalog
        .list_images(id)
        .await
        .map_err(map_service_error)?;

    let images: Vec<ItemImageResponse> = images.into_iter().map(ItemImageResponse::from).collect();

    Ok(success_response(images))
}

/// Delete an item image (row and stored file)
#[utoipa::path(
    delete,
    path = "/api/v1/items/:id/images/:image_id",
    params(
        ("id" = Uuid, Path, description = "Item ID"),
        ("image_id" = Uuid, Path, description = "Image ID")
    ),
    responses(
        (status = 204, description = "Image deleted"),
        (status = 404, description = "Image not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Items"
)]
pub async fn delete_item_image(
    State(state): State<AppState>,
    Path((id, image_id)): Path<(Uuid, Uuid)>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let image = state
        .services
        .catalog
        .delete_image(id, image_id)
        .await
        .map_err(map_service_error)?;

    // The row is gone; a leftover file is only disk noise
    let path = std::path::Path::new(&state.config.media_dir).join(&image.file_name);
    if let Err(err) = tokio::fs::remove_file(&path).await {
        warn!("Failed to remove stored image {}: {}", path.display(), err);
    }

    Ok(no_content_response())
}

// Multipart form handling

/// Fields accepted by the item create/update forms
#[derive(Debug, Default)]
struct ItemForm {
    name: Option<String>,
    sku: Option<String>,
    description: Option<String>,
    unit_price: Option<Decimal>,
    cost_price: Option<Decimal>,
    quantity_on_hand: Option<i64>,
    reorder_point: Option<i64>,
    image: Option<PendingUpload>,
}

#[derive(Debug)]
struct PendingUpload {
    original_name: String,
    content_type: String,
    data: Vec<u8>,
}

/// Field-by-field extraction of the item form. Unknown fields are ignored so
/// clients can evolve ahead of the server.
async fn read_item_form(
    multipart: &mut Multipart,
    max_upload_size: usize,
) -> Result<ItemForm, ApiError> {
    let mut form = ItemForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "image" => {
                let original_name = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "upload".to_string());
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_default();

                if !content_type.starts_with("image/") {
                    return Err(ApiError::ValidationError(
                        "The image part must have an image/* content type".to_string(),
                    ));
                }

                let data = field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed reading image part: {}", e))
                })?;
                if data.len() > max_upload_size {
                    return Err(ApiError::ValidationError(format!(
                        "Image exceeds the maximum upload size of {} bytes",
                        max_upload_size
                    )));
                }

                form.image = Some(PendingUpload {
                    original_name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            text_field => {
                let value = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed reading field {}: {}", text_field, e))
                })?;
                let value = value.trim().to_string();
                if value.is_empty() {
                    continue;
                }

                match text_field {
                    "name" => form.name = Some(value),
                    "sku" => form.sku = Some(value),
                    "description" => form.description = Some(value),
                    "unit_price" => form.unit_price = Some(parse_decimal("unit_price", &value)?),
                    "cost_price" => form.cost_price = Some(parse_decimal("cost_price", &value)?),
                    "quantity_on_hand" => {
                        form.quantity_on_hand = Some(parse_integer("quantity_on_hand", &value)?)
                    }
                    "reorder_point" => {
                        form.reorder_point = Some(parse_integer("reorder_point", &value)?)
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(form)
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, ApiError> {
    value
        .parse::<Decimal>()
        .map_err(|_| ApiError::ValidationError(format!("{} must be a decimal number", field)))
}

fn parse_integer(field: &str, value: &str) -> Result<i64, ApiError> {
    value
        .parse::<i64>()
        .map_err(|_| ApiError::ValidationError(format!("{} must be an integer", field)))
}

/// Write the uploaded bytes into the media directory under a fresh name
async fn store_upload(media_dir: &str, upload: &PendingUpload) -> Result<StoredUpload, ApiError> {
    tokio::fs::create_dir_all(media_dir)
        .await
        .map_err(|e| ApiError::ServiceError(e.into()))?;

    let extension = std::path::Path::new(&upload.original_name)
        .extension()
        .and_then(|ext| ext.to_str());
    let file_name = match extension {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.to_ascii_lowercase()),
        None => Uuid::new_v4().to_string(),
    };

    let path = std::path::Path::new(media_dir).join(&file_name);
    tokio::fs::write(&path, &upload.data)
        .await
        .map_err(|e| ApiError::ServiceError(e.into()))?;

    Ok(StoredUpload {
        file_name,
        original_name: upload.original_name.clone(),
        content_type: upload.content_type.clone(),
        size_bytes: upload.data.len() as i64,
    })
}

// Request/Response DTOs

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ItemFilterParams {
    /// Substring match against name or SKU
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "550e8400-e29b-41d4-a716-446655440000",
    "name": "Espresso Beans 1kg",
    "sku": "BEAN-1KG",
    "description": "Single-origin arabica, medium roast.",
    "unit_price": "18.50",
    "cost_price": "11.20",
    "quantity_on_hand": 42,
    "reorder_point": 10,
    "created_at": "2026-08-06T10:30:00Z"
}))]
pub struct ItemResponse {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub unit_price: Decimal,
    /// Omitted entirely for roles that may not see margins
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_price: Option<Decimal>,
    pub quantity_on_hand: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reorder_point: Option<i64>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ItemResponse {
    /// Shape an item for the viewer: clerks don't see acquisition costs.
    pub fn render(model: ItemModel, viewer: &AuthUser) -> Self {
        let cost_price = if viewer.can_view_costs() {
            model.cost_price
        } else {
            None
        };

        Self {
            id: model.id,
            name: model.name,
            sku: model.sku,
            description: model.description,
            unit_price: model.unit_price,
            cost_price,
            quantity_on_hand: model.quantity_on_hand,
            reorder_point: model.reorder_point,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemImageResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    /// Path the file is served from
    pub url: String,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

impl From<ItemImageModel> for ItemImageResponse {
    fn from(model: ItemImageModel) -> Self {
        Self {
            id: model.id,
            item_id: model.item_id,
            url: format!("/media/{}", model.file_name),
            original_name: model.original_name,
            content_type: model.content_type,
            size_bytes: model.size_bytes,
            created_at: model.created_at,
        }
    }
}
