use crate::auth::{AuthRouterExt, AuthUser};
use crate::entities::{user::UserRole, UserModel};
use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginatedResponse, PaginationParams,
};
use crate::services::users::{CreateUserInput, UpdateUserInput, UserListQuery};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

const MAX_PAGE_SIZE: u64 = 100;

/// Creates the router for account management. Admin only.
pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/:id",
            get(get_user).put(update_user).delete(deactivate_user),
        )
        .with_role(UserRole::Admin)
}

/// Create an account
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = CreateUserInput {
        name: payload.name,
        email: payload.email,
        password: payload.password,
        role: payload.role,
    };

    let account = state
        .services
        .users
        .create_user(input)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(UserResponse::from(account)))
}

/// Update an account
#[utoipa::path(
    put,
    path = "/api/v1/users/:id",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Account updated", body = UserResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = UpdateUserInput {
        name: payload.name,
        email: payload.email,
        password: payload.password,
        role: payload.role,
        active: payload.active,
    };

    let account = state
        .services
        .users
        .update_user(id, input)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(UserResponse::from(account)))
}

/// Get an account by ID
#[utoipa::path(
    get,
    path = "/api/v1/users/:id",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account retrieved", body = UserResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let account = state
        .services
        .users
        .get_user(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(UserResponse::from(account)))
}

/// List accounts
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(PaginationParams, UserFilterParams),
    responses(
        (status = 200, description = "Accounts retrieved"),
        (status = 400, description = "Invalid query parameters", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<UserFilterParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    pagination.ensure_valid(MAX_PAGE_SIZE)?;

    let result = state
        .services
        .users
        .list_users(UserListQuery {
            search: filter.search.clone(),
            limit: Some(pagination.per_page),
            offset: Some(pagination.offset()),
        })
        .await
        .map_err(map_service_error)?;

    let users: Vec<UserResponse> = result.users.into_iter().map(UserResponse::from).collect();

    Ok(success_response(PaginatedResponse::new(
        users,
        pagination.page,
        pagination.per_page,
        result.total,
    )))
}

/// Deactivate an account. The row stays for transaction attribution.
#[utoipa::path(
    delete,
    path = "/api/v1/users/:id",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Account deactivated"),
        (status = 400, description = "Cannot deactivate yourself", body = crate::errors::ErrorResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Users"
)]
pub async fn deactivate_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .users
        .deactivate_user(id, user.user_id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

// Request/Response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Dana Whitfield",
    "email": "dana@tillpoint.example",
    "password": "a long passphrase",
    "role": "manager"
}))]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(min = 8))]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserFilterParams {
    /// Substring match against name or email
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<UserModel> for UserResponse {
    fn from(model: UserModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role,
            active: model.active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
