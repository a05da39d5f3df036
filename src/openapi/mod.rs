use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tillpoint API",
        version = "0.3.0",
        description = r#"
# Tillpoint Inventory & Point-of-Sale API

Backend for small and medium businesses: catalog, purchasing, sales, archival
workflows and dashboard metrics.

## Authentication

All business endpoints require a JWT bearer token obtained from `/auth/login`:

```
Authorization: Bearer <your-jwt-token>
```

Roles are strictly ordered (`admin` > `manager` > `clerk`). Purchases, the
archive and the dashboard need at least `manager`; account management needs
`admin`. Item acquisition costs are omitted from responses rendered for
clerks.

## Pagination

List endpoints take `page` (default 1) and `per_page` (default 20, max 100),
plus endpoint-specific filters such as `search` or `kind`.

## Errors

Failures return a consistent JSON body:

```json
{
  "error": "Not Found",
  "message": "Item 550e8400-... not found",
  "request_id": "req-abc123",
  "timestamp": "2026-08-06T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Items", description = "Catalog management endpoints"),
        (name = "Partners", description = "Customer and supplier endpoints"),
        (name = "Purchases", description = "Stock-in transaction endpoints"),
        (name = "Sales", description = "Stock-out transaction endpoints"),
        (name = "Users", description = "Account management endpoints"),
        (name = "Archive", description = "Soft-delete listings and restore endpoints"),
        (name = "Dashboard", description = "Aggregated metrics endpoints"),
        (name = "Auth", description = "Authentication endpoints")
    ),
    paths(
        // Items
        crate::handlers::items::list_items,
        crate::handlers::items::get_item,
        crate::handlers::items::create_item,
        crate::handlers::items::update_item,
        crate::handlers::items::archive_item,
        crate::handlers::items::low_stock_items,
        crate::handlers::items::upload_item_image,
        crate::handlers::items::list_item_images,
        crate::handlers::items::delete_item_image,

        // Partners
        crate::handlers::partners::list_partners,
        crate::handlers::partners::get_partner,
        crate::handlers::partners::create_partner,
        crate::handlers::partners::update_partner,
        crate::handlers::partners::archive_partner,

        // Purchases
        crate::handlers::purchases::list_purchases,
        crate::handlers::purchases::get_purchase,
        crate::handlers::purchases::create_purchase,
        crate::handlers::purchases::archive_purchase,

        // Sales
        crate::handlers::sales::list_sales,
        crate::handlers::sales::get_sale,
        crate::handlers::sales::create_sale,
        crate::handlers::sales::archive_sale,

        // Users
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::create_user,
        crate::handlers::users::update_user,
        crate::handlers::users::deactivate_user,

        // Archive
        crate::handlers::archive::list_archived_items,
        crate::handlers::archive::list_archived_partners,
        crate::handlers::archive::list_archived_transactions,
        crate::handlers::archive::restore_item,
        crate::handlers::archive::restore_partner,
        crate::handlers::archive::restore_transaction,

        // Dashboard
        crate::handlers::dashboard::get_dashboard_metrics,
        crate::handlers::dashboard::get_sales_trends,

        // Auth
        crate::auth::login_handler,
        crate::auth::refresh_token_handler,
        crate::auth::me_handler,
    ),
    components(
        schemas(
            // Item types
            crate::handlers::items::ItemResponse,
            crate::handlers::items::ItemImageResponse,

            // Partner types
            crate::handlers::partners::CreatePartnerRequest,
            crate::handlers::partners::UpdatePartnerRequest,
            crate::handlers::partners::PartnerResponse,
            crate::entities::partner::PartnerKind,

            // Transaction types
            crate::handlers::purchases::CreatePurchaseRequest,
            crate::handlers::purchases::PurchaseLineRequest,
            crate::handlers::purchases::TransactionHeaderResponse,
            crate::handlers::purchases::TransactionResponse,
            crate::handlers::purchases::TransactionLineResponse,
            crate::handlers::sales::CreateSaleRequest,
            crate::handlers::sales::SaleLineRequest,
            crate::entities::transaction::TransactionKind,

            // User types
            crate::handlers::users::CreateUserRequest,
            crate::handlers::users::UpdateUserRequest,
            crate::handlers::users::UserResponse,
            crate::entities::user::UserRole,

            // Dashboard types
            crate::services::dashboard::DashboardMetrics,
            crate::services::dashboard::SalesMetrics,
            crate::services::dashboard::PurchaseMetrics,
            crate::services::dashboard::InventoryMetrics,
            crate::services::dashboard::SalesTrendPoint,

            // Auth types
            crate::auth::LoginCredentials,
            crate::auth::RefreshTokenRequest,
            crate::auth::TokenPair,
            crate::auth::ProfileResponse,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_covers_core_paths() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Tillpoint API"));
        assert!(json.contains("/api/v1/items"));
        assert!(json.contains("/api/v1/purchases"));
        assert!(json.contains("/api/v1/archive/transactions/restore/"));
    }
}
