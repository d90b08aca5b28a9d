//! CLI command implementations.

pub mod migrate;
pub mod scrape;
pub mod transfer;

use secrecy::SecretString;
use thiserror::Error;

/// The database URL was not configured.
#[derive(Debug, Error)]
#[error("Missing environment variable: SHOP_DATABASE_URL (or DATABASE_URL)")]
pub struct MissingDatabaseUrl;

/// Read the shop database URL, loading `.env` first.
///
/// # Errors
///
/// Returns `MissingDatabaseUrl` if neither `SHOP_DATABASE_URL` nor
/// `DATABASE_URL` is set.
pub fn database_url() -> Result<SecretString, MissingDatabaseUrl> {
    dotenvy::dotenv().ok();

    std::env::var("SHOP_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MissingDatabaseUrl)
}
