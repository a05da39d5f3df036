mod common;

use axum::http::{Method, StatusCode};
use common::{expect_status, TestApp};
use rust_decimal_macros::dec;

#[tokio::test]
async fn item_create_list_and_get_round_trip() {
    let app = TestApp::new().await;

    let response = app
        .request_multipart(
            Method::POST,
            "/api/v1/items",
            &[
                ("name", "Espresso Beans 1kg"),
                ("sku", "BEAN-1KG"),
                ("description", "Single-origin arabica"),
                ("unit_price", "18.50"),
                ("cost_price", "11.20"),
                ("quantity_on_hand", "24"),
                ("reorder_point", "10"),
            ],
            None,
            app.admin_token(),
        )
        .await;
    let created = expect_status(response, StatusCode::CREATED).await;

    assert_eq!(created["name"], "Espresso Beans 1kg");
    assert_eq!(created["sku"], "BEAN-1KG");
    assert_eq!(created["unit_price"], "18.50");
    assert_eq!(created["cost_price"], "11.20");
    assert_eq!(created["quantity_on_hand"], 24);
    let item_id = created["id"].as_str().expect("item id").to_string();

    // Listing finds it by SKU substring
    let response = app
        .request(
            Method::GET,
            "/api/v1/items?search=BEAN",
            None,
            Some(app.admin_token()),
        )
        .await;
    let listed = expect_status(response, StatusCode::OK).await;
    assert_eq!(listed["pagination"]["total"], 1);
    assert_eq!(listed["data"][0]["id"], item_id.as_str());

    // Direct fetch
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/items/{item_id}"),
            None,
            Some(app.admin_token()),
        )
        .await;
    let fetched = expect_status(response, StatusCode::OK).await;
    assert_eq!(fetched["sku"], "BEAN-1KG");

    // Partial update: only the price changes
    let response = app
        .request_multipart(
            Method::PUT,
            &format!("/api/v1/items/{item_id}"),
            &[("unit_price", "19.25")],
            None,
            app.admin_token(),
        )
        .await;
    let updated = expect_status(response, StatusCode::OK).await;
    assert_eq!(updated["unit_price"], "19.25");
    assert_eq!(updated["name"], "Espresso Beans 1kg");
    assert_eq!(updated["quantity_on_hand"], 24);
}

#[tokio::test]
async fn duplicate_sku_is_rejected_with_conflict() {
    let app = TestApp::new().await;
    app.seed_item("DUP-1", dec!(5.00), None, 0).await;

    let response = app
        .request_multipart(
            Method::POST,
            "/api/v1/items",
            &[("name", "Other"), ("sku", "DUP-1"), ("unit_price", "9.00")],
            None,
            app.admin_token(),
        )
        .await;
    expect_status(response, StatusCode::CONFLICT).await;
}

#[tokio::test]
async fn clerk_responses_omit_cost_price() {
    let app = TestApp::new().await;
    let item = app.seed_item("COST-1", dec!(10.00), Some(dec!(6.00)), 3).await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/items/{}", item.id),
            None,
            Some(app.clerk_token()),
        )
        .await;
    let clerk_view = expect_status(response, StatusCode::OK).await;
    assert!(clerk_view.get("cost_price").is_none());

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/items/{}", item.id),
            None,
            Some(app.manager_token()),
        )
        .await;
    let manager_view = expect_status(response, StatusCode::OK).await;
    assert_eq!(manager_view["cost_price"], "6.00");
}

#[tokio::test]
async fn soft_delete_hides_item_and_archive_restores_it() {
    let app = TestApp::new().await;
    let item = app.seed_item("ARCH-1", dec!(4.00), None, 1).await;

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/items/{}", item.id),
            None,
            Some(app.manager_token()),
        )
        .await;
    expect_status(response, StatusCode::NO_CONTENT).await;

    // Gone from the live catalog
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/items/{}", item.id),
            None,
            Some(app.manager_token()),
        )
        .await;
    expect_status(response, StatusCode::NOT_FOUND).await;

    // Present in the archive
    let response = app
        .request(
            Method::GET,
            "/api/v1/archive/items",
            None,
            Some(app.manager_token()),
        )
        .await;
    let archived = expect_status(response, StatusCode::OK).await;
    assert_eq!(archived["pagination"]["total"], 1);
    assert_eq!(archived["data"][0]["sku"], "ARCH-1");

    // Restore brings it back
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/archive/items/restore/{}", item.id),
            None,
            Some(app.manager_token()),
        )
        .await;
    expect_status(response, StatusCode::OK).await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/items/{}", item.id),
            None,
            Some(app.manager_token()),
        )
        .await;
    expect_status(response, StatusCode::OK).await;

    // Restoring a live item is a conflict
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/archive/items/restore/{}", item.id),
            None,
            Some(app.manager_token()),
        )
        .await;
    expect_status(response, StatusCode::CONFLICT).await;
}

#[tokio::test]
async fn low_stock_lists_items_at_or_below_reorder_point() {
    let app = TestApp::new().await;

    // Below the reorder point
    let response = app
        .request_multipart(
            Method::POST,
            "/api/v1/items",
            &[
                ("name", "Running Low"),
                ("sku", "LOW-1"),
                ("unit_price", "2.00"),
                ("quantity_on_hand", "3"),
                ("reorder_point", "5"),
            ],
            None,
            app.admin_token(),
        )
        .await;
    expect_status(response, StatusCode::CREATED).await;

    // Healthy stock
    let response = app
        .request_multipart(
            Method::POST,
            "/api/v1/items",
            &[
                ("name", "Well Stocked"),
                ("sku", "OK-1"),
                ("unit_price", "2.00"),
                ("quantity_on_hand", "50"),
                ("reorder_point", "5"),
            ],
            None,
            app.admin_token(),
        )
        .await;
    expect_status(response, StatusCode::CREATED).await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/items/low-stock",
            None,
            Some(app.clerk_token()),
        )
        .await;
    let low = expect_status(response, StatusCode::OK).await;
    let skus: Vec<&str> = low
        .as_array()
        .expect("array body")
        .iter()
        .map(|item| item["sku"].as_str().unwrap())
        .collect();
    assert_eq!(skus, vec!["LOW-1"]);
}

#[tokio::test]
async fn image_upload_stores_file_and_metadata() {
    let app = TestApp::new().await;
    let item = app.seed_item("IMG-1", dec!(7.50), None, 1).await;

    let png_bytes: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    let response = app
        .request_multipart(
            Method::POST,
            &format!("/api/v1/items/{}/images", item.id),
            &[],
            Some(("photo.png", "image/png", png_bytes)),
            app.manager_token(),
        )
        .await;
    let uploaded = expect_status(response, StatusCode::CREATED).await;
    assert_eq!(uploaded["original_name"], "photo.png");
    assert_eq!(uploaded["content_type"], "image/png");
    assert_eq!(uploaded["size_bytes"], png_bytes.len() as i64);
    let url = uploaded["url"].as_str().expect("image url");
    assert!(url.starts_with("/media/"));

    // The file landed in the media directory
    let file_name = url.trim_start_matches("/media/");
    let stored = std::path::Path::new(&app.state.config.media_dir).join(file_name);
    assert!(stored.exists());

    // Metadata listing returns it
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/items/{}/images", item.id),
            None,
            Some(app.clerk_token()),
        )
        .await;
    let images = expect_status(response, StatusCode::OK).await;
    assert_eq!(images.as_array().unwrap().len(), 1);

    // Non-image uploads are rejected
    let response = app
        .request_multipart(
            Method::POST,
            &format!("/api/v1/items/{}/images", item.id),
            &[],
            Some(("evil.html", "text/html", b"<script></script>")),
            app.manager_token(),
        )
        .await;
    expect_status(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn requests_without_token_are_unauthorized() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/items", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn clerks_cannot_modify_the_catalog() {
    let app = TestApp::new().await;

    let response = app
        .request_multipart(
            Method::POST,
            "/api/v1/items",
            &[("name", "Nope"), ("sku", "NOPE-1"), ("unit_price", "1.00")],
            None,
            app.clerk_token(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
