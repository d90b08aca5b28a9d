//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! shop-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `SHOP_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! The storefront owns the schema: `crates/storefront/migrations/`. The
//! files are embedded into this binary at compile time.

use thiserror::Error;

use super::{MissingDatabaseUrl, database_url};

/// Errors from running migrations.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Config(#[from] MissingDatabaseUrl),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply every pending migration.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to shop database...");
    let pool = shop_admin::db::create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
