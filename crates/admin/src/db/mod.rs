//! Database operations for the admin console.
//!
//! The admin reads and writes the same `shop` schema the storefront owns.
//! Migrations live in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p shop-cli -- migrate
//! ```

pub mod carts;
pub mod categories;
pub mod orders;
pub mod products;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use carts::CartRepository;
pub use categories::CategoryRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;

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

    /// Constraint violation (e.g., duplicate category name).
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
        .max_connections(5)
        .min_connections(1)
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

/// Trimmed search term, or `None` when blank.
pub(crate) fn search_term(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(contains_pattern)
}

/// Map unique and foreign-key violations to `RepositoryError::Conflict`.
pub(crate) fn map_constraint_error(err: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
    {
        return RepositoryError::Conflict(message.to_string());
    }
    RepositoryError::Database(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_term() {
        assert_eq!(search_term(Some("  iPhone ")).as_deref(), Some("%iPhone%"));
        assert_eq!(search_term(Some("   ")), None);
        assert_eq!(search_term(None), None);
    }

    #[test]
    fn test_map_constraint_error_passes_other_errors() {
        let err = map_constraint_error(sqlx::Error::RowNotFound, "taken");
        assert!(matches!(err, RepositoryError::Database(_)));
    }
}
