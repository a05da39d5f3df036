use crate::auth::{AuthRouterExt, AuthUser};
use crate::entities::{
    transaction::TransactionKind, user::UserRole, TransactionItemModel, TransactionModel,
};
use crate::handlers::common::{
    created_response, i64_string, map_service_error, no_content_response, success_response,
    validate_input, PaginatedResponse, PaginationParams,
};
use crate::services::transactions::{
    CreatePurchaseInput, PurchaseLineInput, TransactionListQuery, TransactionWithLines,
};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

const MAX_PAGE_SIZE: u64 = 100;

/// Creates the router for purchase endpoints. Purchases carry acquisition
/// costs, so the whole surface requires at least the manager role.
pub fn purchases_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_purchases).post(create_purchase))
        .route("/:id", get(get_purchase).delete(archive_purchase))
        .with_role(UserRole::Manager)
}

/// Record a purchase: supplier resolution, document number, line items and
/// stock increments commit atomically.
#[utoipa::path(
    post,
    path = "/api/v1/purchases",
    request_body = CreatePurchaseRequest,
    responses(
        (status = 201, description = "Purchase recorded", body = TransactionResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Supplier or item not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Purchases"
)]
pub async fn create_purchase(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePurchaseRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = CreatePurchaseInput {
        supplier_id: payload.supplier_id,
        supplier_name: payload.supplier_name,
        notes: payload.notes,
        created_by: Some(user.user_id),
        lines: payload
            .lines
            .into_iter()
            .map(|line| PurchaseLineInput {
                item_id: line.item_id,
                quantity: line.quantity,
                unit_cost: line.unit_cost,
            })
            .collect(),
    };

    let record = state
        .services
        .transactions
        .create_purchase(input)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(TransactionResponse::from(record)))
}

/// Get a purchase with its line items
#[utoipa::path(
    get,
    path = "/api/v1/purchases/:id",
    params(("id" = String, Path, description = "Purchase ID")),
    responses(
        (status = 200, description = "Purchase retrieved", body = TransactionResponse),
        (status = 404, description = "Purchase not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Purchases"
)]
pub async fn get_purchase(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let record = state
        .services
        .transactions
        .get_transaction(TransactionKind::Purchase, id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(TransactionResponse::from(record)))
}

/// List purchases
#[utoipa::path(
    get,
    path = "/api/v1/purchases",
    params(PaginationParams, TransactionFilterParams),
    responses(
        (status = 200, description = "Purchases retrieved"),
        (status = 400, description = "Invalid query parameters", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Purchases"
)]
pub async fn list_purchases(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<TransactionFilterParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    pagination.ensure_valid(MAX_PAGE_SIZE)?;

    let result = state
        .services
        .transactions
        .list_transactions(
            TransactionKind::Purchase,
            TransactionListQuery {
                partner_id: filter.partner_id,
                limit: Some(pagination.per_page),
                offset: Some(pagination.offset()),
            },
        )
        .await
        .map_err(map_service_error)?;

    let purchases: Vec<TransactionHeaderResponse> = result
        .transactions
        .into_iter()
        .map(TransactionHeaderResponse::from)
        .collect();

    Ok(success_response(PaginatedResponse::new(
        purchases,
        pagination.page,
        pagination.per_page,
        result.total,
    )))
}

/// Soft-delete a purchase, removing the received stock again
#[utoipa::path(
    delete,
    path = "/api/v1/purchases/:id",
    params(("id" = String, Path, description = "Purchase ID")),
    responses(
        (status = 204, description = "Purchase archived"),
        (status = 404, description = "Purchase not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Received stock already consumed", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Purchases"
)]
pub async fn archive_purchase(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .transactions
        .archive_transaction(TransactionKind::Purchase, id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

// Request/Response DTOs shared with the sales handler

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "supplier_name": "Blue Harbor Roasters",
    "notes": "Weekly restock",
    "lines": [
        { "item_id": "550e8400-e29b-41d4-a716-446655440000", "quantity": 24, "unit_cost": "11.20" }
    ]
}))]
pub struct CreatePurchaseRequest {
    /// Existing supplier ID
    #[serde(default)]
    pub supplier_id: Option<Uuid>,
    /// Supplier name to look up or create when no ID is given
    #[serde(default)]
    #[validate(length(min = 1, max = 255))]
    pub supplier_name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(min = 1))]
    pub lines: Vec<PurchaseLineRequest>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct PurchaseLineRequest {
    pub item_id: Uuid,
    pub quantity: i64,
    pub unit_cost: Decimal,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionFilterParams {
    /// Restrict to one partner
    #[serde(default)]
    pub partner_id: Option<Uuid>,
}

/// Transaction header without lines, used in listings
#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionHeaderResponse {
    /// 64-bit row id, serialized as a string
    #[serde(with = "i64_string")]
    #[schema(value_type = String, example = "42")]
    pub id: i64,
    pub kind: TransactionKind,
    pub document_number: String,
    pub partner_id: Uuid,
    pub total_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<TransactionModel> for TransactionHeaderResponse {
    fn from(model: TransactionModel) -> Self {
        Self {
            id: model.id,
            kind: model.kind,
            document_number: model.document_number,
            partner_id: model.partner_id,
            total_amount: model.total_amount,
            notes: model.notes,
            created_by: model.created_by,
            created_at: model.created_at,
        }
    }
}

/// Full transaction: header plus line items
#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionResponse {
    #[serde(flatten)]
    pub header: TransactionHeaderResponse,
    pub lines: Vec<TransactionLineResponse>,
}

impl From<TransactionWithLines> for TransactionResponse {
    fn from(record: TransactionWithLines) -> Self {
        Self {
            header: TransactionHeaderResponse::from(record.transaction),
            lines: record
                .lines
                .into_iter()
                .map(TransactionLineResponse::from)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionLineResponse {
    /// 64-bit row id, serialized as a string
    #[serde(with = "i64_string")]
    #[schema(value_type = String, example = "7")]
    pub id: i64,
    pub item_id: Uuid,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl From<TransactionItemModel> for TransactionLineResponse {
    fn from(model: TransactionItemModel) -> Self {
        Self {
            id: model.id,
            item_id: model.item_id,
            quantity: model.quantity,
            unit_price: model.unit_price,
            line_total: model.line_total,
        }
    }
}
