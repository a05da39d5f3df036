mod common;

use axum::http::{Method, StatusCode};
use common::{expect_status, TestApp, ADMIN_PASSWORD, CLERK_PASSWORD};
use serde_json::json;

#[tokio::test]
async fn login_issues_tokens_and_me_returns_the_profile() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": "admin@example.com", "password": ADMIN_PASSWORD })),
            None,
        )
        .await;
    let tokens = expect_status(response, StatusCode::OK).await;
    let access_token = tokens["access_token"].as_str().expect("access token");
    assert_eq!(tokens["token_type"], "Bearer");
    assert!(tokens["refresh_token"].is_string());

    let response = app
        .request(Method::GET, "/auth/me", None, Some(access_token))
        .await;
    let profile = expect_status(response, StatusCode::OK).await;
    assert_eq!(profile["email"], "admin@example.com");
    assert_eq!(profile["role"], "admin");
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": "admin@example.com", "password": "not the password" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_rotates_the_token_pair() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": "clerk@example.com", "password": CLERK_PASSWORD })),
            None,
        )
        .await;
    let tokens = expect_status(response, StatusCode::OK).await;
    let refresh_token = tokens["refresh_token"].as_str().unwrap();

    let response = app
        .request(
            Method::POST,
            "/auth/refresh",
            Some(json!({ "refresh_token": refresh_token })),
            None,
        )
        .await;
    let rotated = expect_status(response, StatusCode::OK).await;
    assert!(rotated["access_token"].is_string());

    // An access token is not accepted as a refresh token
    let access_token = tokens["access_token"].as_str().unwrap();
    let response = app
        .request(
            Method::POST,
            "/auth/refresh",
            Some(json!({ "refresh_token": access_token })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn role_gates_hold_across_the_surface() {
    let app = TestApp::new().await;

    // Clerk: no user management, no dashboard, no archive
    for uri in ["/api/v1/users", "/api/v1/dashboard/metrics", "/api/v1/archive/items"] {
        let response = app
            .request(Method::GET, uri, None, Some(app.clerk_token()))
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "clerk reached {uri}");
    }

    // Manager: dashboard yes, user management no
    let response = app
        .request(
            Method::GET,
            "/api/v1/dashboard/metrics",
            None,
            Some(app.manager_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(Method::GET, "/api/v1/users", None, Some(app.manager_token()))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Admin: everything
    let response = app
        .request(Method::GET, "/api/v1/users", None, Some(app.admin_token()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn deactivated_accounts_cannot_log_in() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/users/{}", app.clerk_id),
            None,
            Some(app.admin_token()),
        )
        .await;
    expect_status(response, StatusCode::NO_CONTENT).await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": "clerk@example.com", "password": CLERK_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admins_cannot_deactivate_themselves() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/users/{}", app.admin_id),
            None,
            Some(app.admin_token()),
        )
        .await;
    expect_status(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn user_creation_enforces_unique_email() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "name": "Second Admin",
                "email": "admin@example.com",
                "password": "another passphrase",
                "role": "admin"
            })),
            Some(app.admin_token()),
        )
        .await;
    expect_status(response, StatusCode::CONFLICT).await;
}
