//! Storefront router tests that stop before the database.
//!
//! Rate-limited routes key on the client IP, so every request carries an
//! `x-forwarded-for` header.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode};

use shop_integration_tests::{send, storefront_app};

fn get(uri: &str) -> Request<Body> {
    Request::get(uri)
        .header("x-forwarded-for", "203.0.113.10")
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header("x-forwarded-for", "203.0.113.20")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = send(storefront_app(), get("/health")).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_product_list_rejects_non_numeric_category() {
    let response = send(storefront_app(), get("/api/shop/products/?category=abc")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.detail(), "category must be an integer");
}

#[tokio::test]
async fn test_cart_requires_credentials() {
    let response = send(storefront_app(), get("/api/shop/cart/")).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.detail(),
        "Authentication credentials were not provided."
    );
}

#[tokio::test]
async fn test_cart_rejects_garbage_token() {
    let request = Request::get("/api/shop/cart/")
        .header("x-forwarded-for", "203.0.113.30")
        .header("authorization", "Bearer not.a.jwt")
        .body(Body::empty())
        .unwrap();

    let response = send(storefront_app(), request).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.detail(), "Given token not valid");
}

#[tokio::test]
async fn test_login_requires_both_fields() {
    let response = send(storefront_app(), post_json("/api/shop/login/", "")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.detail(), "Username & password required");

    let response = send(
        storefront_app(),
        post_json("/api/shop/login/", r#"{"username": "alice"}"#),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_rejects_malformed_json() {
    let response = send(storefront_app(), post_json("/api/shop/login/", "{username")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.detail().starts_with("JSON parse error - "));
}

#[tokio::test]
async fn test_refresh_requires_token() {
    let response = send(storefront_app(), post_json("/api/shop/token/refresh/", "")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.detail(), "refresh: This field is required.");
}

#[tokio::test]
async fn test_webhook_without_stripe_config() {
    let response = send(
        storefront_app(),
        post_json("/api/shop/stripe/webhook/", r#"{"type": "payment_intent.succeeded"}"#),
    )
    .await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.detail(), "Payments are not configured");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let request = Request::get("/health")
        .header("x-request-id", "req-4711")
        .body(Body::empty())
        .unwrap();

    let response = send(storefront_app(), request).await;
    assert_eq!(response.headers["x-request-id"], "req-4711");
}

#[tokio::test]
async fn test_request_id_is_generated() {
    let response = send(storefront_app(), get("/health")).await;
    let id = response.headers["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn test_security_headers() {
    let response = send(storefront_app(), get("/health")).await;
    assert_eq!(response.headers["x-frame-options"], "DENY");
    assert_eq!(response.headers["x-content-type-options"], "nosniff");
    assert_eq!(response.headers["referrer-policy"], "no-referrer");
}

#[tokio::test]
async fn test_unknown_route() {
    let response = send(storefront_app(), get("/api/shop/nope/")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
