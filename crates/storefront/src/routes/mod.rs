//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                              - Liveness check
//! GET    /health/ready                        - Readiness check (database)
//! GET    /media/*                             - Product images
//!
//! # Catalog
//! GET    /api/shop/products/                  - Active products (?category=&search=)
//! GET    /api/shop/products/{id}/             - Product detail
//! GET    /api/shop/categories/                - Categories
//!
//! # Cart (requires auth)
//! GET    /api/shop/cart/                      - Current cart
//! POST   /api/shop/cart/add/{product_id}/     - Add a product
//! DELETE /api/shop/cart/remove/{item_id}/     - Remove a line
//!
//! # Orders (requires auth)
//! GET    /api/shop/orders/                    - Order history
//! POST   /api/shop/orders/create/             - Checkout
//! GET    /api/shop/orders/{id}/               - Order detail
//! POST   /api/shop/orders/{id}/pay/           - Start a Stripe payment
//!
//! # Auth
//! POST   /api/shop/signup/                    - Register
//! POST   /api/shop/login/                     - Log in
//! POST   /api/shop/token/refresh/             - New access token
//! POST   /api/shop/logout/                    - Log out (requires auth)
//! GET    /api/shop/profile/                   - Current user (requires auth)
//!
//! # Stripe
//! POST   /api/shop/stripe/webhook/            - Payment events
//! ```

pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;
pub mod webhook;

use axum::{
    Router,
    body::Bytes,
    extract::{Request, State},
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    middleware,
    routing::{delete, get, post},
};
use serde::de::DeserializeOwned;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::{AppError, Result};
use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Prefix every API route is mounted under.
pub const API_PREFIX: &str = "/api/shop";

/// Build the complete storefront application.
///
/// Sentry layers are added by the binary so tests can use this router as is.
pub fn app(state: AppState) -> Router {
    let media = state.config().media.clone();
    let cors = cors_layer(&state.config().cors_origins);

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest(API_PREFIX, routes());

    // Absolute media URLs point at an external host that serves the files.
    if media.url.starts_with('/') && media.url.len() > 1 {
        router = router.nest_service(&media.url, ServeDir::new(&media.root));
    }

    router
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(cors)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

/// API routes, relative to [`API_PREFIX`].
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products/", get(products::index))
        .route("/products/{id}/", get(products::show))
        .route("/categories/", get(products::categories))
        .route("/stripe/webhook/", post(webhook::stripe))
        .merge(shopper_routes())
        .merge(auth_routes())
}

/// Credential endpoints, rate limited per client IP.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup/", post(auth::signup))
        .route("/login/", post(auth::login))
        .route("/token/refresh/", post(auth::refresh))
        .layer(auth_rate_limiter())
}

/// Endpoints that act on the authenticated shopper's data.
pub fn shopper_routes() -> Router<AppState> {
    Router::new()
        .route("/cart/", get(cart::show))
        .route("/cart/add/{product_id}/", post(cart::add))
        .route("/cart/remove/{item_id}/", delete(cart::remove))
        .route("/orders/", get(orders::index))
        .route("/orders/create/", post(orders::create))
        .route("/orders/{id}/", get(orders::show))
        .route("/orders/{id}/pay/", post(orders::pay))
        .route("/logout/", post(auth::logout))
        .route("/profile/", get(auth::profile))
        .layer(api_rate_limiter())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// CORS policy for the configured browser origins.
///
/// With no origins configured, cross-origin requests get no CORS headers.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

/// Decode an optional JSON body.
///
/// An empty body yields `T::default()`, so clients may omit it entirely when
/// every field has a default.
pub(crate) fn json_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("JSON parse error - {e}")))
}
