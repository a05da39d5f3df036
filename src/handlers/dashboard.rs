use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::AuthRouterExt;
use crate::entities::user::UserRole;
use crate::{
    errors::ServiceError,
    services::dashboard::{DashboardMetrics, SalesTrendPoint},
    ApiResponse, AppState,
};

/// Build the dashboard Router scoped under `/api/v1/dashboard`. The numbers
/// include spend and valuations, so managers and up only.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/metrics", get(get_dashboard_metrics))
        .route("/sales/trends", get(get_sales_trends))
        .with_role(UserRole::Manager)
}

/// Query parameters for sales trends
#[derive(Debug, Deserialize, IntoParams)]
pub struct SalesTrendsQuery {
    /// Number of days to look back (default: 30)
    #[param(minimum = 1, maximum = 365)]
    pub days: Option<i32>,
}

/// Aggregated metrics for the dashboard landing page
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/metrics",
    responses(
        (status = 200, description = "Dashboard metrics retrieved successfully", body = ApiResponse<DashboardMetrics>)
    ),
    security(("Bearer" = [])),
    tag = "Dashboard"
)]
pub async fn get_dashboard_metrics(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DashboardMetrics>>, ServiceError> {
    let metrics = state.services.dashboard.get_dashboard_metrics().await?;

    Ok(Json(ApiResponse::success(metrics)))
}

/// Per-day sales revenue for charting
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/sales/trends",
    params(SalesTrendsQuery),
    responses(
        (status = 200, description = "Sales trends retrieved successfully", body = ApiResponse<Vec<SalesTrendPoint>>),
        (status = 400, description = "Invalid trend window", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Dashboard"
)]
pub async fn get_sales_trends(
    State(state): State<AppState>,
    Query(params): Query<SalesTrendsQuery>,
) -> Result<Json<ApiResponse<Vec<SalesTrendPoint>>>, ServiceError> {
    let days = params.days.unwrap_or(30);

    if days <= 0 || days > 365 {
        return Err(ServiceError::ValidationError(
            "Days must be between 1 and 365".to_string(),
        ));
    }

    let trends = state.services.dashboard.get_sales_trends(days).await?;
    Ok(Json(ApiResponse::success(trends)))
}
