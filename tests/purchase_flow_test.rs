mod common;

use axum::http::{Method, StatusCode};
use chrono::{Datelike, Utc};
use common::{expect_status, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn purchase_increments_stock_and_allocates_sequential_numbers() {
    let app = TestApp::new().await;
    let beans = app.seed_item("BEAN-1KG", dec!(18.50), Some(dec!(11.20)), 10).await;
    let filters = app.seed_item("FILT-100", dec!(4.00), Some(dec!(1.50)), 0).await;
    let year = Utc::now().year();

    let response = app
        .request(
            Method::POST,
            "/api/v1/purchases",
            Some(json!({
                "supplier_name": "Blue Harbor Roasters",
                "notes": "Weekly restock",
                "lines": [
                    { "item_id": beans.id, "quantity": 24, "unit_cost": "11.20" },
                    { "item_id": filters.id, "quantity": 10, "unit_cost": "1.50" }
                ]
            })),
            Some(app.manager_token()),
        )
        .await;
    let purchase = expect_status(response, StatusCode::CREATED).await;

    assert_eq!(purchase["kind"], "purchase");
    assert_eq!(
        purchase["document_number"],
        format!("PO-{}-{:06}", year, 1)
    );
    // 24 * 11.20 + 10 * 1.50
    assert_eq!(purchase["total_amount"], "283.80");
    assert_eq!(purchase["lines"].as_array().unwrap().len(), 2);
    // 64-bit ids come back as strings
    assert!(purchase["id"].is_string());

    // Stock moved
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/items/{}", beans.id),
            None,
            Some(app.manager_token()),
        )
        .await;
    let beans_after = expect_status(response, StatusCode::OK).await;
    assert_eq!(beans_after["quantity_on_hand"], 34);

    // A second purchase gets the next number in sequence
    let response = app
        .request(
            Method::POST,
            "/api/v1/purchases",
            Some(json!({
                "supplier_name": "Blue Harbor Roasters",
                "lines": [{ "item_id": filters.id, "quantity": 5, "unit_cost": "1.40" }]
            })),
            Some(app.manager_token()),
        )
        .await;
    let second = expect_status(response, StatusCode::CREATED).await;
    assert_eq!(second["document_number"], format!("PO-{}-{:06}", year, 2));

    // Both purchases reference the same supplier row
    assert_eq!(purchase["partner_id"], second["partner_id"]);
}

#[tokio::test]
async fn purchase_with_existing_supplier_id() {
    let app = TestApp::new().await;
    let supplier = app
        .seed_partner(
            "Harbor Freight Co",
            tillpoint_api::entities::partner::PartnerKind::Supplier,
        )
        .await;
    let item = app.seed_item("SKU-1", dec!(3.00), None, 0).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/purchases",
            Some(json!({
                "supplier_id": supplier.id,
                "lines": [{ "item_id": item.id, "quantity": 7, "unit_cost": "2.10" }]
            })),
            Some(app.manager_token()),
        )
        .await;
    let purchase = expect_status(response, StatusCode::CREATED).await;
    assert_eq!(purchase["partner_id"], supplier.id.to_string());
    assert_eq!(purchase["total_amount"], "14.70");
}

#[tokio::test]
async fn purchase_from_a_customer_is_rejected() {
    let app = TestApp::new().await;
    let customer = app
        .seed_partner(
            "Walk-in Customer",
            tillpoint_api::entities::partner::PartnerKind::Customer,
        )
        .await;
    let item = app.seed_item("SKU-2", dec!(3.00), None, 0).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/purchases",
            Some(json!({
                "supplier_id": customer.id,
                "lines": [{ "item_id": item.id, "quantity": 1, "unit_cost": "1.00" }]
            })),
            Some(app.manager_token()),
        )
        .await;
    expect_status(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn failed_purchase_rolls_back_stock_and_numbering() {
    let app = TestApp::new().await;
    let item = app.seed_item("ROLL-1", dec!(2.00), None, 5).await;
    let year = Utc::now().year();

    // Second line references an unknown item, the whole request must fail
    let response = app
        .request(
            Method::POST,
            "/api/v1/purchases",
            Some(json!({
                "supplier_name": "Rollback Supply",
                "lines": [
                    { "item_id": item.id, "quantity": 100, "unit_cost": "1.00" },
                    { "item_id": Uuid::new_v4(), "quantity": 1, "unit_cost": "1.00" }
                ]
            })),
            Some(app.manager_token()),
        )
        .await;
    expect_status(response, StatusCode::NOT_FOUND).await;

    // First line's stock increment did not survive
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/items/{}", item.id),
            None,
            Some(app.manager_token()),
        )
        .await;
    let unchanged = expect_status(response, StatusCode::OK).await;
    assert_eq!(unchanged["quantity_on_hand"], 5);

    // The failed attempt consumed no document number
    let response = app
        .request(
            Method::POST,
            "/api/v1/purchases",
            Some(json!({
                "supplier_name": "Rollback Supply",
                "lines": [{ "item_id": item.id, "quantity": 1, "unit_cost": "1.00" }]
            })),
            Some(app.manager_token()),
        )
        .await;
    let purchase = expect_status(response, StatusCode::CREATED).await;
    assert_eq!(purchase["document_number"], format!("PO-{}-{:06}", year, 1));
}

#[tokio::test]
async fn purchase_validation_rejects_bad_lines() {
    let app = TestApp::new().await;
    let item = app.seed_item("VAL-1", dec!(2.00), None, 0).await;

    // No lines
    let response = app
        .request(
            Method::POST,
            "/api/v1/purchases",
            Some(json!({ "supplier_name": "S", "lines": [] })),
            Some(app.manager_token()),
        )
        .await;
    expect_status(response, StatusCode::BAD_REQUEST).await;

    // Zero quantity
    let response = app
        .request(
            Method::POST,
            "/api/v1/purchases",
            Some(json!({
                "supplier_name": "S",
                "lines": [{ "item_id": item.id, "quantity": 0, "unit_cost": "1.00" }]
            })),
            Some(app.manager_token()),
        )
        .await;
    expect_status(response, StatusCode::BAD_REQUEST).await;

    // Neither supplier_id nor supplier_name
    let response = app
        .request(
            Method::POST,
            "/api/v1/purchases",
            Some(json!({
                "lines": [{ "item_id": item.id, "quantity": 1, "unit_cost": "1.00" }]
            })),
            Some(app.manager_token()),
        )
        .await;
    expect_status(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn clerks_cannot_reach_purchases() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/purchases", None, Some(app.clerk_token()))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
