use crate::auth::{AuthRouterExt, AuthUser};
use crate::entities::{partner::PartnerKind, user::UserRole, PartnerModel};
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginatedResponse, PaginationParams,
};
use crate::services::partners::{CreatePartnerInput, PartnerSearchQuery, UpdatePartnerInput};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

const MAX_PAGE_SIZE: u64 = 100;

/// Creates the router for partner (customer/supplier) endpoints
pub fn partners_routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(create_partner))
        .route("/:id", put(update_partner).delete(archive_partner))
        .with_role(UserRole::Manager);

    Router::new()
        .route("/", get(list_partners))
        .route("/:id", get(get_partner))
        .with_auth()
        .merge(protected)
}

/// Create a customer or supplier
#[utoipa::path(
    post,
    path = "/api/v1/partners",
    request_body = CreatePartnerRequest,
    responses(
        (status = 201, description = "Partner created", body = PartnerResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Partners"
)]
pub async fn create_partner(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePartnerRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = CreatePartnerInput {
        name: payload.name,
        kind: payload.kind,
        email: payload.email,
        phone: payload.phone,
        address: payload.address,
    };

    let partner = state
        .services
        .partners
        .create_partner(input)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(PartnerResponse::from(partner)))
}

/// Update a partner's contact details
#[utoipa::path(
    put,
    path = "/api/v1/partners/:id",
    params(("id" = Uuid, Path, description = "Partner ID")),
    request_body = UpdatePartnerRequest,
    responses(
        (status = 200, description = "Partner updated", body = PartnerResponse),
        (status = 404, description = "Partner not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Partners"
)]
pub async fn update_partner(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePartnerRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = UpdatePartnerInput {
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        address: payload.address,
    };

    let partner = state
        .services
        .partners
        .update_partner(id, input)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PartnerResponse::from(partner)))
}

/// Get a partner by ID
#[utoipa::path(
    get,
    path = "/api/v1/partners/:id",
    params(("id" = Uuid, Path, description = "Partner ID")),
    responses(
        (status = 200, description = "Partner retrieved", body = PartnerResponse),
        (status = 404, description = "Partner not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Partners"
)]
pub async fn get_partner(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let partner = state
        .services
        .partners
        .get_partner(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PartnerResponse::from(partner)))
}

/// List partners, filterable by kind and name substring
#[utoipa::path(
    get,
    path = "/api/v1/partners",
    params(PaginationParams, PartnerFilterParams),
    responses(
        (status = 200, description = "Partners retrieved"),
        (status = 400, description = "Invalid query parameters", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Partners"
)]
pub async fn list_partners(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<PartnerFilterParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    pagination.ensure_valid(MAX_PAGE_SIZE)?;

    let query = PartnerSearchQuery {
        search: filter.search.clone(),
        kind: filter.kind,
        limit: Some(pagination.per_page),
        offset: Some(pagination.offset()),
    };

    let result = state
        .services
        .partners
        .search_partners(query)
        .await
        .map_err(map_service_error)?;

    let partners: Vec<PartnerResponse> = result
        .partners
        .into_iter()
        .map(PartnerResponse::from)
        .collect();

    Ok(success_response(PaginatedResponse::new(
        partners,
        pagination.page,
        pagination.per_page,
        result.total,
    )))
}

/// Soft-delete a partner
#[utoipa::path(
    delete,
    path = "/api/v1/partners/:id",
    params(("id" = Uuid, Path, description = "Partner ID")),
    responses(
        (status = 204, description = "Partner archived"),
        (status = 404, description = "Partner not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Partners"
)]
pub async fn archive_partner(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .partners
        .archive_partner(id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

// Request/Response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Blue Harbor Roasters",
    "kind": "supplier",
    "email": "orders@blueharbor.example",
    "phone": "+1-555-0134",
    "address": "18 Dockside Way, Portland, ME"
}))]
pub struct CreatePartnerRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub kind: PartnerKind,
    #[serde(default)]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdatePartnerRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PartnerFilterParams {
    /// Substring match against the partner name
    #[serde(default)]
    pub search: Option<String>,
    /// Restrict to customers or suppliers
    #[serde(default)]
    pub kind: Option<PartnerKind>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PartnerResponse {
    pub id: Uuid,
    pub name: String,
    pub kind: PartnerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<PartnerModel> for PartnerResponse {
    fn from(model: PartnerModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            kind: model.kind,
            email: model.email,
            phone: model.phone,
            address: model.address,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
