//! Category CSV: `id,name,description`.

use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use super::{Columns, ImportError, ImportResult, RowError, csv_reader, line_of};
use crate::db::{CategoryRepository, categories};
use crate::models::catalog::validate_category_name;

/// A parsed category row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CategoryRow {
    pub line: u64,
    pub name: String,
    /// `None` when the file has no description column.
    pub description: Option<String>,
}

#[derive(Serialize)]
struct CategoryRecord<'a> {
    id: i32,
    name: &'a str,
    description: &'a str,
}

/// Parse every row, collecting the ones that fail validation.
pub(crate) fn parse_rows<R: std::io::Read>(
    input: R,
) -> Result<(Vec<CategoryRow>, Vec<RowError>), ImportError> {
    let mut reader = csv_reader(input);
    let columns = Columns::read(&mut reader, &["name"])?;

    let mut rows = Vec::new();
    let mut errors = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = line_of(&record);

        match validate_category_name(columns.cell(&record, "name")) {
            Ok(name) => rows.push(CategoryRow {
                line,
                name: name.to_string(),
                description: columns.get(&record, "description").map(String::from),
            }),
            Err(message) => errors.push(RowError { line, message }),
        }
    }

    Ok((rows, errors))
}

/// Import categories from CSV, upserting by name.
///
/// # Errors
///
/// Returns `ImportError` if the file is unreadable, lacks a `name` column,
/// or a database operation fails.
#[instrument(skip_all, fields(dry_run = dry_run))]
pub async fn import_categories<R: std::io::Read>(
    pool: &PgPool,
    input: R,
    dry_run: bool,
) -> Result<ImportResult, ImportError> {
    let (rows, errors) = parse_rows(input)?;
    let mut result = ImportResult {
        errors,
        dry_run,
        ..ImportResult::default()
    };

    let mut tx = pool.begin().await?;
    for row in &rows {
        match categories::find_by_name(&mut *tx, &row.name).await? {
            Some(existing) => match &row.description {
                Some(description) if *description != existing.description => {
                    categories::set_description(&mut *tx, existing.id, description).await?;
                    result.updated += 1;
                }
                _ => result.skipped += 1,
            },
            None => {
                let description = row.description.as_deref().unwrap_or_default();
                categories::insert(&mut *tx, &row.name, description).await?;
                result.new += 1;
            }
        }
    }

    if result.committed() {
        tx.commit().await?;
    } else {
        tx.rollback().await?;
    }

    result.errors.sort_by_key(|e| e.line);
    tracing::info!(
        new = result.new,
        updated = result.updated,
        skipped = result.skipped,
        errors = result.errors.len(),
        committed = result.committed(),
        "Category import finished"
    );

    Ok(result)
}

/// Write every category as CSV, ordered by name.
///
/// # Errors
///
/// Returns `ImportError` if the query or the write fails.
#[instrument(skip_all)]
pub async fn export_categories<W: std::io::Write>(
    pool: &PgPool,
    output: W,
) -> Result<usize, ImportError> {
    let categories = CategoryRepository::new(pool).list(None).await?;

    let mut writer = csv::Writer::from_writer(output);
    for category in &categories {
        writer.serialize(CategoryRecord {
            id: category.id.as_i32(),
            name: &category.name,
            description: &category.description,
        })?;
    }
    if categories.is_empty() {
        writer.write_record(["id", "name", "description"])?;
    }
    writer.flush()?;

    Ok(categories.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows() {
        let csv = "id,name,description\n\
                   1,Mobile,Phones and accessories\n\
                   2,  ,blank name\n\
                   3,Laptops,\n";
        let (rows, errors) = parse_rows(csv.as_bytes()).unwrap();

        assert_eq!(
            rows,
            vec![
                CategoryRow {
                    line: 2,
                    name: "Mobile".to_string(),
                    description: Some("Phones and accessories".to_string()),
                },
                CategoryRow {
                    line: 4,
                    name: "Laptops".to_string(),
                    description: Some(String::new()),
                },
            ]
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 3);
        assert!(errors[0].message.starts_with("name:"));
    }

    #[test]
    fn test_parse_rows_without_description_column() {
        let (rows, errors) = parse_rows("name\nMobile\n".as_bytes()).unwrap();
        assert!(errors.is_empty());
        assert_eq!(rows[0].description, None);
    }

    #[test]
    fn test_parse_rows_requires_name() {
        let err = parse_rows("id,description\n1,x\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn("name")));
    }

    #[test]
    fn test_quoted_cells() {
        let csv = "name,description\n\"Home, Kitchen\",\"Pots \"\"and\"\" pans\"\n";
        let (rows, _) = parse_rows(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].name, "Home, Kitchen");
        assert_eq!(rows[0].description.as_deref(), Some("Pots \"and\" pans"));
    }
}
