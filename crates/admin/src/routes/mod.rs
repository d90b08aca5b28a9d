//! HTTP route handlers for the admin API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                                - Liveness check
//! GET    /health/ready                          - Readiness check (database)
//!
//! # Categories (all routes below require the admin token)
//! GET    /admin/api/categories                  - List (?search=)
//! POST   /admin/api/categories                  - Create
//! PATCH  /admin/api/categories/{id}             - Rename / describe
//! DELETE /admin/api/categories/{id}             - Delete
//! POST   /admin/api/categories/import           - CSV import (?dry_run=)
//! GET    /admin/api/categories/export           - CSV export
//!
//! # Products
//! GET    /admin/api/products                    - List (?category=&brand=&is_active=&search=&page=&per_page=)
//! PATCH  /admin/api/products/{id}               - Edit price, stock, is_active
//! DELETE /admin/api/products/{id}               - Delete
//! POST   /admin/api/products/import             - CSV import (?dry_run=)
//! GET    /admin/api/products/export             - CSV export
//!
//! # Carts
//! GET    /admin/api/carts                       - List (?search=)
//! GET    /admin/api/carts/{id}                  - Cart with lines
//!
//! # Orders
//! GET    /admin/api/orders                      - List (?order_status=&payment_method=&payment_status=&search=)
//! GET    /admin/api/orders/{id}                 - Order with lines
//! PATCH  /admin/api/orders/{id}                 - Change order / payment status
//! ```

pub mod carts;
pub mod categories;
pub mod orders;
pub mod products;

use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tower_http::trace::TraceLayer;

use crate::error::{AppError, Result};
use crate::import_export::parse_bool;
use crate::state::AppState;

/// Prefix every admin API route is mounted under.
pub const API_PREFIX: &str = "/admin/api";

/// Largest CSV upload accepted by the import endpoints.
pub const MAX_IMPORT_BYTES: usize = 20 * 1024 * 1024;

/// Build the complete admin application.
///
/// Sentry layers are added by the binary so tests can use this router as is.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest(API_PREFIX, routes())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "admin_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .with_state(state)
}

/// API routes, relative to [`API_PREFIX`].
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(categories::index).post(categories::create))
        .route(
            "/categories/{id}",
            patch(categories::update).delete(categories::delete),
        )
        .route("/categories/export", get(categories::export))
        .route("/products", get(products::index))
        .route(
            "/products/{id}",
            patch(products::update).delete(products::delete),
        )
        .route("/products/export", get(products::export))
        .route("/carts", get(carts::index))
        .route("/carts/{id}", get(carts::show))
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show).patch(orders::update))
        .merge(import_routes())
}

/// CSV upload endpoints, with a larger body limit.
fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/categories/import", post(categories::import))
        .route("/products/import", post(products::import))
        .layer(DefaultBodyLimit::max(MAX_IMPORT_BYTES))
}

/// Liveness health check endpoint.
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

/// Query string of the import endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ImportQuery {
    pub dry_run: Option<String>,
}

impl ImportQuery {
    /// Whether to roll the import back after reporting.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for values other than true/false/1/0/yes/no.
    pub fn dry_run(&self) -> Result<bool> {
        match self.dry_run.as_deref().map(str::trim) {
            None | Some("") => Ok(false),
            Some(value) => parse_bool(value)
                .ok_or_else(|| AppError::BadRequest(format!("dry_run: \"{value}\" is not a valid boolean."))),
        }
    }
}

/// Parse a JSON request body.
pub(crate) fn json_body<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("JSON parse error - {e}")))
}

/// A CSV attachment download.
pub(crate) fn csv_attachment(filename: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_flag() {
        let query = |value: Option<&str>| ImportQuery {
            dry_run: value.map(String::from),
        };

        assert!(!query(None).dry_run().unwrap());
        assert!(!query(Some("")).dry_run().unwrap());
        assert!(query(Some("true")).dry_run().unwrap());
        assert!(query(Some("1")).dry_run().unwrap());
        assert!(!query(Some("no")).dry_run().unwrap());
        assert!(matches!(
            query(Some("perhaps")).dry_run(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_json_body() {
        #[derive(Deserialize)]
        struct Body {
            name: String,
        }

        let body: Body = json_body(&Bytes::from_static(br#"{"name":"Mobile"}"#)).unwrap();
        assert_eq!(body.name, "Mobile");
        assert!(matches!(
            json_body::<Body>(&Bytes::from_static(b"{")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_csv_attachment_headers() {
        let response = csv_attachment("products.csv", b"id,name\n".to_vec());
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"products.csv\""
        );
    }
}
