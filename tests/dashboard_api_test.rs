mod common;

use axum::http::{Method, StatusCode};
use common::{expect_status, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use tillpoint_api::entities::partner::PartnerKind;

#[tokio::test]
async fn metrics_reflect_recorded_activity() {
    let app = TestApp::new().await;
    let customer = app.seed_partner("Metrics Cafe", PartnerKind::Customer).await;
    let item = app
        .seed_item("DASH-1", dec!(10.00), Some(dec!(4.00)), 0)
        .await;

    // Buy 20 at 4.00, sell 3 at catalog price
    let response = app
        .request(
            Method::POST,
            "/api/v1/purchases",
            Some(json!({
                "supplier_name": "Metrics Supply",
                "lines": [{ "item_id": item.id, "quantity": 20, "unit_cost": "4.00" }]
            })),
            Some(app.manager_token()),
        )
        .await;
    expect_status(response, StatusCode::CREATED).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "customer_id": customer.id,
                "lines": [{ "item_id": item.id, "quantity": 3 }]
            })),
            Some(app.clerk_token()),
        )
        .await;
    expect_status(response, StatusCode::CREATED).await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/dashboard/metrics",
            None,
            Some(app.manager_token()),
        )
        .await;
    let body = expect_status(response, StatusCode::OK).await;
    assert_eq!(body["success"], true);

    let metrics = &body["data"];
    assert_eq!(metrics["sales"]["total_sales"], 1);
    assert_eq!(metrics["sales"]["total_revenue"], "30.00");
    assert_eq!(metrics["sales"]["sales_today"], 1);
    assert_eq!(metrics["purchases"]["total_purchases"], 1);
    assert_eq!(metrics["purchases"]["total_spend"], "80.00");
    assert_eq!(metrics["inventory"]["total_items"], 1);
    // 17 left on hand at 4.00 cost
    assert_eq!(metrics["inventory"]["stock_valuation"], "68.00");
}

#[tokio::test]
async fn trends_group_sales_by_day() {
    let app = TestApp::new().await;
    let customer = app.seed_partner("Trend Cafe", PartnerKind::Customer).await;
    let item = app.seed_item("TREND-1", dec!(5.00), None, 10).await;

    for _ in 0..2 {
        let response = app
            .request(
                Method::POST,
                "/api/v1/sales",
                Some(json!({
                    "customer_id": customer.id,
                    "lines": [{ "item_id": item.id, "quantity": 1 }]
                })),
                Some(app.clerk_token()),
            )
            .await;
        expect_status(response, StatusCode::CREATED).await;
    }

    let response = app
        .request(
            Method::GET,
            "/api/v1/dashboard/sales/trends?days=7",
            None,
            Some(app.manager_token()),
        )
        .await;
    let body = expect_status(response, StatusCode::OK).await;
    let points = body["data"].as_array().expect("trend points");

    // Both sales happened today, so they collapse into one point
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["count"], 2);
    assert_eq!(points[0]["revenue"], "10.00");
}

#[tokio::test]
async fn trend_window_is_validated() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/dashboard/sales/trends?days=0",
            None,
            Some(app.manager_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::GET,
            "/api/v1/dashboard/sales/trends?days=500",
            None,
            Some(app.manager_token()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
