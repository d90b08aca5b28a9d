//! Admin router tests that stop before the database.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};

use shop_integration_tests::{ADMIN_TOKEN, admin_app, send};

fn admin_request(method: Method, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let response = send(admin_app(), request).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_requires_token() {
    let request = Request::get("/admin/api/orders").body(Body::empty()).unwrap();
    let response = send(admin_app(), request).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.detail(),
        "Authentication credentials were not provided."
    );
}

#[tokio::test]
async fn test_rejects_wrong_token() {
    let request = Request::get("/admin/api/carts")
        .header("authorization", "Bearer guess")
        .body(Body::empty())
        .unwrap();
    let response = send(admin_app(), request).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.detail(), "Invalid token.");
}

#[tokio::test]
async fn test_category_create_rejects_blank_name() {
    let response = send(
        admin_app(),
        admin_request(Method::POST, "/admin/api/categories", r#"{"name": "   "}"#),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.detail(), "name: This field may not be blank.");
}

#[tokio::test]
async fn test_category_update_rejects_malformed_json() {
    let response = send(
        admin_app(),
        admin_request(Method::PATCH, "/admin/api/categories/3", "{name:"),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.detail().starts_with("JSON parse error - "));
}

#[tokio::test]
async fn test_product_update_rejects_negative_stock() {
    let response = send(
        admin_app(),
        admin_request(Method::PATCH, "/admin/api/products/9", r#"{"stock": -1}"#),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.detail(),
        "stock: Ensure this value is greater than or equal to 0."
    );
}

#[tokio::test]
async fn test_order_update_needs_a_status() {
    let response = send(
        admin_app(),
        admin_request(Method::PATCH, "/admin/api/orders/12", "{}"),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.detail(),
        "Provide order_status and/or payment_status."
    );
}

#[tokio::test]
async fn test_order_update_rejects_read_only_fields() {
    let response = send(
        admin_app(),
        admin_request(
            Method::PATCH,
            "/admin/api/orders/12",
            r#"{"order_status": "Shipped", "total_price": "0.01"}"#,
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.detail().contains("total_price"));
}

#[tokio::test]
async fn test_import_rejects_bad_dry_run_flag() {
    let request = Request::post("/admin/api/categories/import?dry_run=perhaps")
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
        .header("content-type", "text/csv")
        .body(Body::from("name,description\nPhones,\n"))
        .unwrap();

    let response = send(admin_app(), request).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_import_rejects_csv_without_name_column() {
    let request = Request::post("/admin/api/products/import?dry_run=1")
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
        .header("content-type", "text/csv")
        .body(Body::from("title,price\nPixel 8,59999\n"))
        .unwrap();

    let response = send(admin_app(), request).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.detail(), "missing required column: name");
}
