use crate::auth::{AuthRouterExt, AuthUser};
use crate::entities::{transaction::TransactionKind, user::UserRole};
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginatedResponse, PaginationParams,
};
use crate::handlers::purchases::{
    TransactionFilterParams, TransactionHeaderResponse, TransactionResponse,
};
use crate::services::transactions::{CreateSaleInput, SaleLineInput, TransactionListQuery};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const MAX_PAGE_SIZE: u64 = 100;

/// Creates the router for sales endpoints. Clerks run the till, so create
/// and read only need authentication; voiding a sale is a manager action.
pub fn sales_routes() -> Router<AppState> {
    let manager_only = Router::new()
        .route("/:id", delete(archive_sale))
        .with_role(UserRole::Manager);

    Router::new()
        .route("/", get(list_sales).post(create_sale))
        .route("/:id", get(get_sale))
        .with_auth()
        .merge(manager_only)
}

/// Record a sale: stock decrements, document number and line items commit
/// atomically; insufficient stock fails the whole request with 422.
#[utoipa::path(
    post,
    path = "/api/v1/sales",
    request_body = CreateSaleRequest,
    responses(
        (status = 201, description = "Sale recorded", body = TransactionResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Customer or item not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Sales"
)]
pub async fn create_sale(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateSaleRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = CreateSaleInput {
        customer_id: payload.customer_id,
        notes: payload.notes,
        created_by: Some(user.user_id),
        lines: payload
            .lines
            .into_iter()
            .map(|line| SaleLineInput {
                item_id: line.item_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
            })
            .collect(),
    };

    let record = state
        .services
        .transactions
        .create_sale(input)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(TransactionResponse::from(record)))
}

/// Get a sale with its line items
#[utoipa::path(
    get,
    path = "/api/v1/sales/:id",
    params(("id" = String, Path, description = "Sale ID")),
    responses(
        (status = 200, description = "Sale retrieved", body = TransactionResponse),
        (status = 404, description = "Sale not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Sales"
)]
pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let record = state
        .services
        .transactions
        .get_transaction(TransactionKind::Sale, id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(TransactionResponse::from(record)))
}

/// List sales
#[utoipa::path(
    get,
    path = "/api/v1/sales",
    params(PaginationParams, TransactionFilterParams),
    responses(
        (status = 200, description = "Sales retrieved"),
        (status = 400, description = "Invalid query parameters", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Sales"
)]
pub async fn list_sales(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<TransactionFilterParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    pagination.ensure_valid(MAX_PAGE_SIZE)?;

    let result = state
        .services
        .transactions
        .list_transactions(
            TransactionKind::Sale,
            TransactionListQuery {
                partner_id: filter.partner_id,
                limit: Some(pagination.per_page),
                offset: Some(pagination.offset()),
            },
        )
        .await
        .map_err(map_service_error)?;

    let sales: Vec<TransactionHeaderResponse> = result
        .transactions
        .into_iter()
        .map(TransactionHeaderResponse::from)
        .collect();

    Ok(success_response(PaginatedResponse::new(
        sales,
        pagination.page,
        pagination.per_page,
        result.total,
    )))
}

/// Void a sale: soft-delete and return the sold stock to the shelf
#[utoipa::path(
    delete,
    path = "/api/v1/sales/:id",
    params(("id" = String, Path, description = "Sale ID")),
    responses(
        (status = 204, description = "Sale archived"),
        (status = 404, description = "Sale not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Sales"
)]
pub async fn archive_sale(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .transactions
        .archive_transaction(TransactionKind::Sale, id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

// Request DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "customer_id": "660e8400-e29b-41d4-a716-446655440001",
    "lines": [
        { "item_id": "550e8400-e29b-41d4-a716-446655440000", "quantity": 2 }
    ]
}))]
pub struct CreateSaleRequest {
    pub customer_id: Uuid,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(min = 1))]
    pub lines: Vec<SaleLineRequest>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SaleLineRequest {
    pub item_id: Uuid,
    pub quantity: i64,
    /// Defaults to the item's catalog price when omitted
    #[serde(default)]
    pub unit_price: Option<Decimal>,
}
