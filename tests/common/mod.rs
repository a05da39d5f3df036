#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    middleware, Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;
use tillpoint_api::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db,
    entities::{partner::PartnerKind, user::UserRole, ItemModel, PartnerModel},
    events::{self, EventSender},
    handlers::AppServices,
    services::catalog::CreateItemInput,
    services::partners::CreatePartnerInput,
    services::users::CreateUserInput,
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const ADMIN_PASSWORD: &str = "admin passphrase 1";
pub const CLERK_PASSWORD: &str = "clerk passphrase 1";

const TEST_JWT_SECRET: &str =
    "k3QzXs81hYwR5mN7vTpL2cJf9GbD4aEuW6oHxZiC0rVqSnKgM8yPjAtB1dFeU3lO";

/// Helper harness for spinning up an application state backed by a
/// throwaway SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub admin_id: Uuid,
    pub manager_id: Uuid,
    pub clerk_id: Uuid,
    admin_token: String,
    manager_token: String,
    clerk_token: String,
    db_path: PathBuf,
    _media_dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state and one
    /// account per role.
    pub async fn new() -> Self {
        let db_path = std::env::temp_dir().join(format!("tillpoint_test_{}.db", Uuid::new_v4()));
        let media_dir = TempDir::new().expect("create media temp dir");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_JWT_SECRET.to_string(),
            3600,
            86_400,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.cors_allow_any_origin = true;
        cfg.media_dir = media_dir.path().to_string_lossy().to_string();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");

        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx, Vec::new()));

        let auth_cfg = AuthConfig::new(
            cfg.jwt_secret.clone(),
            "tillpoint-auth".to_string(),
            "tillpoint-api".to_string(),
            Duration::from_secs(cfg.jwt_expiration as u64),
            Duration::from_secs(cfg.refresh_token_expiration as u64),
        );
        let auth_service = Arc::new(AuthService::new(auth_cfg, db_arc.clone()));

        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            auth_service.clone(),
        );

        let state = AppState {
            db: db_arc,
            config: cfg.clone(),
            event_sender,
            services,
        };

        // One account per role, issued tokens up front
        let (admin_id, admin_token) = seed_account(
            &state,
            &auth_service,
            "Test Admin",
            "admin@example.com",
            ADMIN_PASSWORD,
            UserRole::Admin,
        )
        .await;
        let (manager_id, manager_token) = seed_account(
            &state,
            &auth_service,
            "Test Manager",
            "manager@example.com",
            "manager passphrase 1",
            UserRole::Manager,
        )
        .await;
        let (clerk_id, clerk_token) = seed_account(
            &state,
            &auth_service,
            "Test Clerk",
            "clerk@example.com",
            CLERK_PASSWORD,
            UserRole::Clerk,
        )
        .await;

        let auth_service_for_layer = auth_service.clone();
        let router = Router::new()
            .nest("/api/v1", tillpoint_api::api_v1_routes())
            .nest(
                "/auth",
                tillpoint_api::auth::auth_routes().with_state(auth_service.clone()),
            )
            .layer(middleware::from_fn_with_state(
                auth_service_for_layer,
                |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
                 mut req: Request<Body>,
                 next: axum::middleware::Next| async move {
                    req.extensions_mut().insert(auth);
                    next.run(req).await
                },
            ))
            .layer(middleware::from_fn(
                tillpoint_api::middleware_helpers::request_id_middleware,
            ))
            .with_state(state.clone());

        Self {
            router,
            state,
            admin_id,
            manager_id,
            clerk_id,
            admin_token,
            manager_token,
            clerk_token,
            db_path,
            _media_dir: media_dir,
            _event_task: event_task,
        }
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    pub fn manager_token(&self) -> &str {
        &self.manager_token
    }

    pub fn clerk_token(&self) -> &str {
        &self.clerk_token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Send a multipart form request, optionally with an image part.
    pub async fn request_multipart(
        &self,
        method: Method,
        uri: &str,
        fields: &[(&str, &str)],
        image: Option<(&str, &str, &[u8])>,
        token: &str,
    ) -> axum::response::Response {
        let boundary = "tillpoint-test-boundary";
        let mut body = Vec::new();

        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }

        if let Some((file_name, content_type, data)) = image {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }

        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", token))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("failed to build multipart request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Seed an item directly through the service layer.
    pub async fn seed_item(
        &self,
        sku: &str,
        unit_price: Decimal,
        cost_price: Option<Decimal>,
        quantity_on_hand: i64,
    ) -> ItemModel {
        self.state
            .services
            .catalog
            .create_item(CreateItemInput {
                name: format!("Test Item {}", sku),
                sku: sku.to_string(),
                description: None,
                unit_price,
                cost_price,
                quantity_on_hand,
                reorder_point: None,
            })
            .await
            .expect("seed item for tests")
    }

    /// Seed a customer or supplier directly through the service layer.
    pub async fn seed_partner(&self, name: &str, kind: PartnerKind) -> PartnerModel {
        self.state
            .services
            .partners
            .create_partner(CreatePartnerInput {
                name: name.to_string(),
                kind,
                email: None,
                phone: None,
                address: None,
            })
            .await
            .expect("seed partner for tests")
    }
}

async fn seed_account(
    state: &AppState,
    auth_service: &AuthService,
    name: &str,
    email: &str,
    password: &str,
    role: UserRole,
) -> (Uuid, String) {
    let account = state
        .services
        .users
        .create_user(CreateUserInput {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role,
        })
        .await
        .expect("seed account for tests");

    let tokens = auth_service
        .generate_token(&account)
        .expect("issue tokens for test account");

    (account.id, tokens.access_token)
}

/// Parse a response body as JSON.
pub async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body should be JSON")
}

/// Assert a status and return the parsed body for further checks.
pub async fn expect_status(
    response: axum::response::Response,
    expected: StatusCode,
) -> Value {
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    assert_eq!(
        status,
        expected,
        "unexpected status; body: {}",
        String::from_utf8_lossy(&body)
    );
    if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("response body should be JSON")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
        let _ = std::fs::remove_file(&self.db_path);
    }
}
