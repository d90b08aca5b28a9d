//! Catalog CSV import and export.
//!
//! Thin wrappers around `shop_admin::import_export`, so files loaded from the
//! command line go through exactly the same validation as admin uploads.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use thiserror::Error;

use shop_admin::import_export::{self, ImportError, ImportResult};

use super::{MissingDatabaseUrl, database_url};
use crate::Entity;

/// Errors from the import and export commands.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Config(#[from] MissingDatabaseUrl),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cannot open {path}: {source}")]
    File {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("Cannot render result: {0}")]
    Json(#[from] serde_json::Error),
}

/// Import `file`, print the result and return whether it was committed.
///
/// # Errors
///
/// Returns `TransferError` if the file can't be read or the import aborts.
pub async fn import(
    entity: Entity,
    file: &Path,
    media_root: &Path,
    dry_run: bool,
) -> Result<bool, TransferError> {
    let input = File::open(file).map(BufReader::new).map_err(|source| TransferError::File {
        path: file.display().to_string(),
        source,
    })?;

    let pool = shop_admin::db::create_pool(&database_url()?).await?;
    tracing::info!(file = %file.display(), ?entity, dry_run, "Importing");

    let result = match entity {
        Entity::Categories => import_export::import_categories(&pool, input, dry_run).await?,
        Entity::Products => {
            import_export::import_products(&pool, media_root, input, dry_run).await?
        }
    };

    report(&result)?;
    Ok(result.committed())
}

/// Export to `output`, or to stdout when no file is given.
///
/// # Errors
///
/// Returns `TransferError` if the query or the write fails.
pub async fn export(entity: Entity, output: Option<&Path>) -> Result<(), TransferError> {
    let pool = shop_admin::db::create_pool(&database_url()?).await?;

    let rows = match output {
        Some(path) => {
            let file = File::create(path).map_err(|source| TransferError::File {
                path: path.display().to_string(),
                source,
            })?;
            export_to(&pool, entity, file).await?
        }
        None => export_to(&pool, entity, std::io::stdout()).await?,
    };

    tracing::info!(?entity, rows, "Export complete");
    Ok(())
}

async fn export_to<W: std::io::Write>(
    pool: &sqlx::PgPool,
    entity: Entity,
    output: W,
) -> Result<usize, ImportError> {
    match entity {
        Entity::Categories => import_export::export_categories(pool, output).await,
        Entity::Products => import_export::export_products(pool, output).await,
    }
}

fn report(result: &ImportResult) -> Result<(), TransferError> {
    let rendered = serde_json::to_string_pretty(result)?;

    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }

    for error in &result.errors {
        tracing::warn!(line = error.line, "{}", error.message);
    }
    if result.dry_run {
        tracing::info!("Dry run: nothing was written");
    } else if !result.errors.is_empty() {
        tracing::warn!(errors = result.errors.len(), "Import rolled back");
    }

    Ok(())
}
