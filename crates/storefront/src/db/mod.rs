//! Database operations for the shop `PostgreSQL` schema.
//!
//! ## Tables (schema `shop`)
//!
//! - `user` - Shopper accounts (argon2 password hashes)
//! - `category`, `product` - Catalog
//! - `cart`, `cart_item` - One cart per user, one line per product
//! - `order`, `order_item` - Placed orders with price snapshots
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p shop-cli -- migrate
//! ```

pub mod carts;
pub mod categories;
pub mod orders;
pub mod products;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use carts::CartRepository;
pub use categories::CategoryRepository;
pub use orders::OrderRepository;
pub use products::{ProductFilter, ProductRepository};
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique username).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Build a case-insensitive `ILIKE` pattern matching `term` anywhere.
///
/// `%`, `_` and `\` in the term are matched literally.
#[must_use]
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Convert a stored quantity to its domain type.
pub(crate) fn quantity_from_db(quantity: i32) -> Result<u32, RepositoryError> {
    u32::try_from(quantity)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative quantity: {quantity}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_wraps_term() {
        assert_eq!(contains_pattern("phone"), "%phone%");
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn test_quantity_from_db() {
        assert_eq!(quantity_from_db(3).ok(), Some(3));
        assert!(matches!(
            quantity_from_db(-1),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
