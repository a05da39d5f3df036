use crate::auth::{AuthRouterExt, AuthUser};
use crate::entities::user::UserRole;
use crate::handlers::common::{
    map_service_error, success_response, PaginatedResponse, PaginationParams,
};
use crate::handlers::items::ItemResponse;
use crate::handlers::partners::PartnerResponse;
use crate::handlers::purchases::TransactionHeaderResponse;
use crate::services::archive::ArchivePage;
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Router,
};
use uuid::Uuid;

const MAX_PAGE_SIZE: u64 = 100;

/// Creates the router for the archive: listings of soft-deleted rows and
/// their restore endpoints. Managers and up.
pub fn archive_routes() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_archived_items))
        .route("/partners", get(list_archived_partners))
        .route("/transactions", get(list_archived_transactions))
        .route("/items/restore/:id", put(restore_item))
        .route("/partners/restore/:id", put(restore_partner))
        .route("/transactions/restore/:id", put(restore_transaction))
        .with_role(UserRole::Manager)
}

/// Archived items
#[utoipa::path(
    get,
    path = "/api/v1/archive/items",
    params(PaginationParams),
    responses((status = 200, description = "Archived items retrieved")),
    security(("Bearer" = [])),
    tag = "Archive"
)]
pub async fn list_archived_items(
    user: AuthUser,
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    pagination.ensure_valid(MAX_PAGE_SIZE)?;

    let (items, total) = state
        .services
        .archive
        .list_archived_items(page_window(&pagination))
        .await
        .map_err(map_service_error)?;

    let items: Vec<ItemResponse> = items
        .into_iter()
        .map(|item| ItemResponse::render(item, &user))
        .collect();

    Ok(success_response(PaginatedResponse::new(
        items,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Archived partners
#[utoipa::path(
    get,
    path = "/api/v1/archive/partners",
    params(PaginationParams),
    responses((status = 200, description = "Archived partners retrieved")),
    security(("Bearer" = [])),
    tag = "Archive"
)]
pub async fn list_archived_partners(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    pagination.ensure_valid(MAX_PAGE_SIZE)?;

    let (partners, total) = state
        .services
        .archive
        .list_archived_partners(page_window(&pagination))
        .await
        .map_err(map_service_error)?;

    let partners: Vec<PartnerResponse> =
        partners.into_iter().map(PartnerResponse::from).collect();

    Ok(success_response(PaginatedResponse::new(
        partners,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Archived transactions of both kinds
#[utoipa::path(
    get,
    path = "/api/v1/archive/transactions",
    params(PaginationParams),
    responses((status = 200, description = "Archived transactions retrieved")),
    security(("Bearer" = [])),
    tag = "Archive"
)]
pub async fn list_archived_transactions(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    pagination.ensure_valid(MAX_PAGE_SIZE)?;

    let (transactions, total) = state
        .services
        .archive
        .list_archived_transactions(page_window(&pagination))
        .await
        .map_err(map_service_error)?;

    let transactions: Vec<TransactionHeaderResponse> = transactions
        .into_iter()
        .map(TransactionHeaderResponse::from)
        .collect();

    Ok(success_response(PaginatedResponse::new(
        transactions,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Restore an archived item
#[utoipa::path(
    put,
    path = "/api/v1/archive/items/restore/:id",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item restored", body = ItemResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Item is not archived", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Archive"
)]
pub async fn restore_item(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let item = state
        .services
        .archive
        .restore_item(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ItemResponse::render(item, &user)))
}

/// Restore an archived partner
#[utoipa::path(
    put,
    path = "/api/v1/archive/partners/restore/:id",
    params(("id" = Uuid, Path, description = "Partner ID")),
    responses(
        (status = 200, description = "Partner restored", body = PartnerResponse),
        (status = 404, description = "Partner not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Partner is not archived", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Archive"
)]
pub async fn restore_partner(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let partner = state
        .services
        .archive
        .restore_partner(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PartnerResponse::from(partner)))
}

/// Restore an archived transaction, replaying its stock movement
#[utoipa::path(
    put,
    path = "/api/v1/archive/transactions/restore/:id",
    params(("id" = String, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction restored", body = TransactionHeaderResponse),
        (status = 404, description = "Transaction not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Transaction is not archived", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock to replay a sale", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Archive"
)]
pub async fn restore_transaction(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let transaction = state
        .services
        .transactions
        .restore_transaction(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(TransactionHeaderResponse::from(
        transaction,
    )))
}

fn page_window(pagination: &PaginationParams) -> ArchivePage {
    ArchivePage {
        limit: Some(pagination.per_page),
        offset: Some(pagination.offset()),
    }
}
