//! CSV import and export of the catalog.
//!
//! Both entities are keyed by `name` on import: a row whose name already
//! exists updates that record, anything else is inserted. Every import runs
//! in a single transaction which is rolled back when any row fails or when
//! the caller asked for a dry run, so the returned [`ImportResult`] always
//! describes what *would* happen.
//!
//! The same functions back the admin API and the `shop-cli import`/`export`
//! commands.

pub mod categories;
pub mod products;

use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;

pub use categories::{export_categories, import_categories};
pub use products::{export_products, import_products};

/// Errors that abort an import or export as a whole.
///
/// Problems with individual rows are not errors at this level; they are
/// collected into [`ImportResult::errors`].
#[derive(Debug, Error)]
pub enum ImportError {
    /// The input is not readable CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the header row.
    #[error("missing required column: {0}")]
    MissingColumn(&'static str),

    /// Writing the export failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A database operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for ImportError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// A row that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// 1-based line number in the file (the header is line 1).
    pub line: u64,
    pub message: String,
}

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    pub new: u32,
    pub updated: u32,
    pub skipped: u32,
    pub errors: Vec<RowError>,
    pub dry_run: bool,
}

impl ImportResult {
    /// Whether the import was written to the database.
    #[must_use]
    pub fn committed(&self) -> bool {
        !self.dry_run && self.errors.is_empty()
    }

    fn row_error(&mut self, line: u64, message: impl Into<String>) {
        self.errors.push(RowError {
            line,
            message: message.into(),
        });
    }
}

/// Column positions resolved from the header row.
#[derive(Debug)]
pub(crate) struct Columns {
    headers: csv::StringRecord,
}

impl Columns {
    /// Read the header row, requiring every column in `required`.
    pub(crate) fn read<R: std::io::Read>(
        reader: &mut csv::Reader<R>,
        required: &[&'static str],
    ) -> Result<Self, ImportError> {
        let headers = reader.headers()?.clone();
        for &column in required {
            if !headers.iter().any(|h| h == column) {
                return Err(ImportError::MissingColumn(column));
            }
        }
        Ok(Self { headers })
    }

    /// The trimmed cell for `column`, or `None` if the file has no such column.
    pub(crate) fn get<'r>(&self, record: &'r csv::StringRecord, column: &str) -> Option<&'r str> {
        let index = self.headers.iter().position(|h| h == column)?;
        Some(record.get(index).unwrap_or_default().trim())
    }

    /// The trimmed cell for `column`, empty when absent.
    pub(crate) fn cell<'r>(&self, record: &'r csv::StringRecord, column: &str) -> &'r str {
        self.get(record, column).unwrap_or_default()
    }
}

/// A CSV reader configured the way exports are written.
pub(crate) fn csv_reader<R: std::io::Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(input)
}

/// Line number a record starts on.
pub(crate) fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map_or(0, csv::Position::line)
}

/// Parse a boolean cell: `true/false`, `1/0` or `yes/no`, any case.
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// How exports render a boolean.
pub(crate) const fn format_bool(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}
