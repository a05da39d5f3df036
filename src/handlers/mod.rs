pub mod archive;
pub mod common;
pub mod dashboard;
pub mod items;
pub mod partners;
pub mod purchases;
pub mod sales;
pub mod users;

use crate::auth::AuthService;
use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<crate::services::catalog::CatalogService>,
    pub partners: Arc<crate::services::partners::PartnerService>,
    pub transactions: Arc<crate::services::transactions::TransactionService>,
    pub archive: Arc<crate::services::archive::ArchiveService>,
    pub dashboard: Arc<crate::services::dashboard::DashboardService>,
    pub users: Arc<crate::services::users::UserService>,
    pub auth: Arc<AuthService>,
}

impl AppServices {
    /// Build the service container shared by all HTTP handlers.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        auth_service: Arc<AuthService>,
    ) -> Self {
        let catalog = Arc::new(crate::services::catalog::CatalogService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let partners = Arc::new(crate::services::partners::PartnerService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let transactions = Arc::new(crate::services::transactions::TransactionService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let archive = Arc::new(crate::services::archive::ArchiveService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let dashboard = Arc::new(crate::services::dashboard::DashboardService::new(
            db_pool.clone(),
        ));
        let users = Arc::new(crate::services::users::UserService::new(
            db_pool,
            event_sender,
        ));

        Self {
            catalog,
            partners,
            transactions,
            archive,
            dashboard,
            users,
            auth: auth_service,
        }
    }
}
