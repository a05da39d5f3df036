mod common;

use axum::http::{Method, StatusCode};
use chrono::{Datelike, Utc};
use common::{expect_status, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use tillpoint_api::entities::partner::PartnerKind;

#[tokio::test]
async fn sale_decrements_stock_and_defaults_to_catalog_price() {
    let app = TestApp::new().await;
    let customer = app.seed_partner("Corner Cafe", PartnerKind::Customer).await;
    let item = app.seed_item("BEAN-1KG", dec!(18.50), None, 10).await;
    let year = Utc::now().year();

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "customer_id": customer.id,
                "lines": [{ "item_id": item.id, "quantity": 2 }]
            })),
            Some(app.clerk_token()),
        )
        .await;
    let sale = expect_status(response, StatusCode::CREATED).await;

    assert_eq!(sale["kind"], "sale");
    assert_eq!(sale["document_number"], format!("INV-{}-{:06}", year, 1));
    // Catalog price applied: 2 * 18.50
    assert_eq!(sale["total_amount"], "37.00");
    assert_eq!(sale["lines"][0]["unit_price"], "18.50");

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/items/{}", item.id),
            None,
            Some(app.clerk_token()),
        )
        .await;
    let after = expect_status(response, StatusCode::OK).await;
    assert_eq!(after["quantity_on_hand"], 8);
}

#[tokio::test]
async fn sale_honors_explicit_price_overrides() {
    let app = TestApp::new().await;
    let customer = app.seed_partner("Discount Dan", PartnerKind::Customer).await;
    let item = app.seed_item("DISC-1", dec!(10.00), None, 5).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "customer_id": customer.id,
                "lines": [{ "item_id": item.id, "quantity": 3, "unit_price": "8.00" }]
            })),
            Some(app.clerk_token()),
        )
        .await;
    let sale = expect_status(response, StatusCode::CREATED).await;
    assert_eq!(sale["total_amount"], "24.00");
}

#[tokio::test]
async fn insufficient_stock_fails_atomically() {
    let app = TestApp::new().await;
    let customer = app.seed_partner("Big Order Bob", PartnerKind::Customer).await;
    let plenty = app.seed_item("PLENTY-1", dec!(1.00), None, 100).await;
    let scarce = app.seed_item("SCARCE-1", dec!(1.00), None, 1).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "customer_id": customer.id,
                "lines": [
                    { "item_id": plenty.id, "quantity": 10 },
                    { "item_id": scarce.id, "quantity": 5 }
                ]
            })),
            Some(app.clerk_token()),
        )
        .await;
    expect_status(response, StatusCode::UNPROCESSABLE_ENTITY).await;

    // The first line's decrement rolled back with the rest
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/items/{}", plenty.id),
            None,
            Some(app.clerk_token()),
        )
        .await;
    let unchanged = expect_status(response, StatusCode::OK).await;
    assert_eq!(unchanged["quantity_on_hand"], 100);

    // No sale row survived
    let response = app
        .request(Method::GET, "/api/v1/sales", None, Some(app.clerk_token()))
        .await;
    let listed = expect_status(response, StatusCode::OK).await;
    assert_eq!(listed["pagination"]["total"], 0);
}

#[tokio::test]
async fn selling_to_a_supplier_is_rejected() {
    let app = TestApp::new().await;
    let supplier = app.seed_partner("Supply Side", PartnerKind::Supplier).await;
    let item = app.seed_item("SIDE-1", dec!(2.00), None, 10).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "customer_id": supplier.id,
                "lines": [{ "item_id": item.id, "quantity": 1 }]
            })),
            Some(app.clerk_token()),
        )
        .await;
    expect_status(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn voiding_a_sale_returns_stock_and_needs_manager() {
    let app = TestApp::new().await;
    let customer = app.seed_partner("Returner", PartnerKind::Customer).await;
    let item = app.seed_item("VOID-1", dec!(5.00), None, 10).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "customer_id": customer.id,
                "lines": [{ "item_id": item.id, "quantity": 4 }]
            })),
            Some(app.clerk_token()),
        )
        .await;
    let sale = expect_status(response, StatusCode::CREATED).await;
    let sale_id = sale["id"].as_str().expect("sale id").to_string();

    // Clerks cannot void
    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/sales/{sale_id}"),
            None,
            Some(app.clerk_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Managers can
    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/sales/{sale_id}"),
            None,
            Some(app.manager_token()),
        )
        .await;
    expect_status(response, StatusCode::NO_CONTENT).await;

    // The sold units are back on the shelf
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/items/{}", item.id),
            None,
            Some(app.clerk_token()),
        )
        .await;
    let after = expect_status(response, StatusCode::OK).await;
    assert_eq!(after["quantity_on_hand"], 10);

    // And the sale is gone from the live list
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/sales/{sale_id}"),
            None,
            Some(app.clerk_token()),
        )
        .await;
    expect_status(response, StatusCode::NOT_FOUND).await;
}
