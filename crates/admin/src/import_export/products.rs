//! Product CSV:
//! `id,name,brand,category__name,description,price,stock,image,rating,is_active`.

use std::collections::HashMap;
use std::path::{Component, Path};

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use shop_core::{CategoryId, Money};

use super::{
    Columns, ImportError, ImportResult, RowError, csv_reader, format_bool, line_of, parse_bool,
};
use crate::db::{ProductRepository, categories, products};
use crate::models::ProductFields;

/// Directory under the media root that holds product images.
pub const PRODUCT_IMAGE_DIR: &str = "products";

const MAX_NAME_LENGTH: usize = 255;
const MAX_BRAND_LENGTH: usize = 120;

/// Largest value a `NUMERIC(3, 2)` rating column holds.
const MAX_RATING: Decimal = Decimal::from_parts(999, 0, 0, false, 2);

/// A parsed product row, before its category is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProductRow {
    pub line: u64,
    pub category_name: Option<String>,
    pub fields: ProductFields,
}

#[derive(Serialize)]
struct ProductRecord<'a> {
    id: i32,
    name: &'a str,
    brand: &'a str,
    #[serde(rename = "category__name")]
    category_name: &'a str,
    description: &'a str,
    price: Money,
    stock: i32,
    image: &'a str,
    rating: Decimal,
    is_active: &'static str,
}

/// Normalise an image cell to a media-relative path.
///
/// Blank, `nan` and `none` mean no image. Anything else becomes
/// `products/<file name>`; the file must exist under `media_root` or the
/// image is dropped, as is any path that leaves the products directory.
pub(crate) fn normalize_image(cell: &str, media_root: &Path) -> Option<String> {
    let cell = cell.trim().trim_matches(['"', '\'']).trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") || cell.eq_ignore_ascii_case("none") {
        return None;
    }

    let path = if cell.starts_with("products/") {
        cell.to_string()
    } else {
        let file_name = cell.rsplit(['/', '\\']).next().unwrap_or_default();
        if file_name.is_empty() {
            return None;
        }
        format!("{PRODUCT_IMAGE_DIR}/{file_name}")
    };

    if !Path::new(&path)
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        tracing::warn!(image = %path, "Image path escapes the media root, dropping");
        return None;
    }

    if media_root.join(&path).is_file() {
        Some(path)
    } else {
        tracing::warn!(image = %path, media_root = %media_root.display(), "Image file not found, dropping");
        None
    }
}

fn parse_price(cell: &str) -> Result<Money, String> {
    if cell.is_empty() {
        return Ok(Money::ZERO);
    }
    let price = cell
        .parse::<Money>()
        .map_err(|_| "price: A valid number is required.".to_string())?;
    if price.is_negative() {
        return Err("price: Ensure this value is greater than or equal to 0.".to_string());
    }
    if price > Money::MAX {
        return Err(format!(
            "price: Ensure this value is less than or equal to {}.",
            Money::MAX
        ));
    }
    Ok(price)
}

fn parse_stock(cell: &str) -> Result<i32, String> {
    if cell.is_empty() {
        return Ok(0);
    }
    let stock = cell
        .parse::<i32>()
        .map_err(|_| "stock: A valid integer is required.".to_string())?;
    if stock < 0 {
        return Err("stock: Ensure this value is greater than or equal to 0.".to_string());
    }
    Ok(stock)
}

fn parse_rating(cell: &str) -> Result<Decimal, String> {
    if cell.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let rating = cell
        .parse::<Decimal>()
        .map_err(|_| "rating: A valid number is required.".to_string())?
        .round_dp(2);
    if rating < Decimal::ZERO || rating > MAX_RATING {
        return Err(format!("rating: Ensure this value is between 0 and {MAX_RATING}."));
    }
    Ok(rating)
}

fn parse_is_active(cell: &str) -> Result<bool, String> {
    if cell.is_empty() {
        return Ok(true);
    }
    parse_bool(cell).ok_or_else(|| format!("is_active: \"{cell}\" is not a valid boolean."))
}

fn parse_text(cell: &str, field: &str, max: usize) -> Result<String, String> {
    if cell.chars().count() > max {
        return Err(format!(
            "{field}: Ensure this field has no more than {max} characters."
        ));
    }
    Ok(cell.to_string())
}

fn parse_record(
    columns: &Columns,
    record: &csv::StringRecord,
    media_root: &Path,
) -> Result<(Option<String>, ProductFields), String> {
    let name = columns.cell(record, "name");
    if name.is_empty() {
        return Err("name: This field may not be blank.".to_string());
    }

    let category_name = Some(columns.cell(record, "category__name"))
        .filter(|c| !c.is_empty())
        .map(String::from);

    let fields = ProductFields {
        name: parse_text(name, "name", MAX_NAME_LENGTH)?,
        brand: parse_text(columns.cell(record, "brand"), "brand", MAX_BRAND_LENGTH)?,
        category_id: None,
        description: columns.cell(record, "description").to_string(),
        price: parse_price(columns.cell(record, "price"))?,
        stock: parse_stock(columns.cell(record, "stock"))?,
        image: normalize_image(columns.cell(record, "image"), media_root),
        rating: parse_rating(columns.cell(record, "rating"))?,
        is_active: parse_is_active(columns.cell(record, "is_active"))?,
    };

    Ok((category_name, fields))
}

/// Parse every row, collecting the ones that fail validation.
pub(crate) fn parse_rows<R: std::io::Read>(
    input: R,
    media_root: &Path,
) -> Result<(Vec<ProductRow>, Vec<RowError>), ImportError> {
    let mut reader = csv_reader(input);
    let columns = Columns::read(&mut reader, &["name"])?;

    let mut rows = Vec::new();
    let mut errors = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = line_of(&record);

        match parse_record(&columns, &record, media_root) {
            Ok((category_name, fields)) => rows.push(ProductRow {
                line,
                category_name,
                fields,
            }),
            Err(message) => errors.push(RowError { line, message }),
        }
    }

    Ok((rows, errors))
}

/// Import products from CSV, upserting by name.
///
/// Categories are resolved by name and must already exist (import the
/// category file first). Image paths are checked against `media_root`.
///
/// # Errors
///
/// Returns `ImportError` if the file is unreadable, lacks a `name` column,
/// or a database operation fails.
#[instrument(skip_all, fields(dry_run = dry_run))]
pub async fn import_products<R: std::io::Read>(
    pool: &PgPool,
    media_root: &Path,
    input: R,
    dry_run: bool,
) -> Result<ImportResult, ImportError> {
    let (rows, errors) = parse_rows(input, media_root)?;
    let mut result = ImportResult {
        errors,
        dry_run,
        ..ImportResult::default()
    };

    let mut tx = pool.begin().await?;
    let mut category_ids: HashMap<String, Option<CategoryId>> = HashMap::new();

    for row in rows {
        let ProductRow {
            line,
            category_name,
            mut fields,
        } = row;

        if let Some(category_name) = category_name {
            let category_id = match category_ids.get(&category_name) {
                Some(id) => *id,
                None => {
                    let id = categories::find_by_name(&mut *tx, &category_name)
                        .await?
                        .map(|c| c.id);
                    category_ids.insert(category_name.clone(), id);
                    id
                }
            };
            let Some(category_id) = category_id else {
                result.row_error(
                    line,
                    format!("category__name: Category \"{category_name}\" does not exist."),
                );
                continue;
            };
            fields.category_id = Some(category_id);
        }

        match products::find_by_name(&mut *tx, &fields.name).await? {
            Some(existing) if fields.matches(&existing) => result.skipped += 1,
            Some(existing) => {
                products::replace(&mut *tx, existing.id, &fields).await?;
                result.updated += 1;
            }
            None => {
                products::insert(&mut *tx, &fields).await?;
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
        "Product import finished"
    );

    Ok(result)
}

/// Write every product as CSV, ordered by ID.
///
/// # Errors
///
/// Returns `ImportError` if the query or the write fails.
#[instrument(skip_all)]
pub async fn export_products<W: std::io::Write>(
    pool: &PgPool,
    output: W,
) -> Result<usize, ImportError> {
    let products = ProductRepository::new(pool).all().await?;

    let mut writer = csv::Writer::from_writer(output);
    for product in &products {
        writer.serialize(ProductRecord {
            id: product.id.as_i32(),
            name: &product.name,
            brand: &product.brand,
            category_name: product.category.as_deref().unwrap_or_default(),
            description: &product.description,
            price: product.price,
            stock: product.stock,
            image: product.image.as_deref().unwrap_or_default(),
            rating: product.rating,
            is_active: format_bool(product.is_active),
        })?;
    }
    if products.is_empty() {
        writer.write_record([
            "id",
            "name",
            "brand",
            "category__name",
            "description",
            "price",
            "stock",
            "image",
            "rating",
            "is_active",
        ])?;
    }
    writer.flush()?;

    Ok(products.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    struct MediaDir(PathBuf);

    impl MediaDir {
        fn with_images(names: &[&str]) -> Self {
            let root = std::env::temp_dir().join(format!("shop-media-{}", uuid::Uuid::new_v4()));
            std::fs::create_dir_all(root.join(PRODUCT_IMAGE_DIR)).unwrap();
            for name in names {
                std::fs::write(root.join(PRODUCT_IMAGE_DIR).join(name), b"img").unwrap();
            }
            Self(root)
        }
    }

    impl Drop for MediaDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    const HEADER: &str = "id,name,brand,category__name,description,price,stock,image,rating,is_active\n";

    #[test]
    fn test_normalize_image() {
        let media = MediaDir::with_images(&["mobile_1.jpg"]);

        assert_eq!(
            normalize_image("products/mobile_1.jpg", &media.0).as_deref(),
            Some("products/mobile_1.jpg")
        );
        assert_eq!(
            normalize_image(" \"media/products/mobile_1.jpg\" ", &media.0).as_deref(),
            Some("products/mobile_1.jpg")
        );
        assert_eq!(
            normalize_image(r"C:\scrape\mobile_1.jpg", &media.0).as_deref(),
            Some("products/mobile_1.jpg")
        );
        assert_eq!(normalize_image("mobile_2.jpg", &media.0), None);
        assert_eq!(normalize_image("nan", &media.0), None);
        assert_eq!(normalize_image("None", &media.0), None);
        assert_eq!(normalize_image("''", &media.0), None);
    }

    #[test]
    fn test_normalize_image_rejects_parent_components() {
        let media = MediaDir::with_images(&["mobile_1.jpg"]);

        assert_eq!(
            normalize_image("products/../products/mobile_1.jpg", &media.0),
            None
        );
        assert_eq!(normalize_image("products/../../secret.jpg", &media.0), None);
        assert_eq!(normalize_image("..", &media.0), None);
    }

    #[test]
    fn test_parse_rows_full_record() {
        let media = MediaDir::with_images(&["mobile_1.jpg"]);
        let csv = format!(
            "{HEADER}7,Galaxy A15,Samsung,Mobile,A phone,12999.00,14,mobile_1.jpg,4.3,yes\n"
        );

        let (rows, errors) = parse_rows(csv.as_bytes(), &media.0).unwrap();
        assert!(errors.is_empty());

        let row = &rows[0];
        assert_eq!(row.line, 2);
        assert_eq!(row.category_name.as_deref(), Some("Mobile"));
        assert_eq!(row.fields.name, "Galaxy A15");
        assert_eq!(row.fields.brand, "Samsung");
        assert_eq!(row.fields.price.to_string(), "12999.00");
        assert_eq!(row.fields.stock, 14);
        assert_eq!(row.fields.image.as_deref(), Some("products/mobile_1.jpg"));
        assert_eq!(row.fields.rating, Decimal::new(43, 1));
        assert!(row.fields.is_active);
    }

    #[test]
    fn test_blank_cells_take_defaults() {
        let media = MediaDir::with_images(&[]);
        let csv = format!("{HEADER},Plain,,,,,,,,\n");

        let (rows, errors) = parse_rows(csv.as_bytes(), &media.0).unwrap();
        assert!(errors.is_empty());

        let fields = &rows[0].fields;
        assert_eq!(rows[0].category_name, None);
        assert_eq!(fields.price, Money::ZERO);
        assert_eq!(fields.stock, 0);
        assert_eq!(fields.rating, Decimal::ZERO);
        assert_eq!(fields.image, None);
        assert!(fields.is_active);
    }

    #[test]
    fn test_row_errors_carry_line_numbers() {
        let media = MediaDir::with_images(&[]);
        let csv = format!(
            "{HEADER}\
             ,,,,,1,1,,,\n\
             ,Bad price,,,,abc,1,,,\n\
             ,Negative stock,,,,1,-4,,,\n\
             ,Bad flag,,,,1,1,,,maybe\n\
             ,Too good,,,,1,1,,12,\n\
             ,Fine,,,,1,1,,,0\n"
        );

        let (rows, errors) = parse_rows(csv.as_bytes(), &media.0).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].fields.is_active);

        let lines: Vec<u64> = errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![2, 3, 4, 5, 6]);
        assert!(errors[0].message.starts_with("name:"));
        assert!(errors[1].message.starts_with("price:"));
        assert!(errors[2].message.starts_with("stock:"));
        assert!(errors[3].message.starts_with("is_active:"));
        assert!(errors[4].message.starts_with("rating:"));
    }

    #[test]
    fn test_missing_image_is_dropped_not_an_error() {
        let media = MediaDir::with_images(&[]);
        let csv = format!("{HEADER},Phone,,,,1,1,products/missing.jpg,,\n");

        let (rows, errors) = parse_rows(csv.as_bytes(), &media.0).unwrap();
        assert!(errors.is_empty());
        assert_eq!(rows[0].fields.image, None);
    }

    #[test]
    fn test_parse_price_rounds_to_cents() {
        assert_eq!(parse_price("10.005").unwrap().to_string(), "10.00");
        assert_eq!(parse_price("99").unwrap().to_string(), "99.00");
    }

    #[test]
    fn test_parse_price_column_limit() {
        assert_eq!(parse_price("9999999999.99").unwrap(), Money::MAX);
        assert_eq!(
            parse_price("100000000000").unwrap_err(),
            "price: Ensure this value is less than or equal to 9999999999.99."
        );
    }

    #[test]
    fn test_oversized_price_is_a_row_error() {
        let media = MediaDir::with_images(&[]);
        let csv = format!("{HEADER},Pixel 9,,,,100000000000,,,,\n,Pixel 8,,,,59999,,,,\n");

        let (rows, errors) = parse_rows(csv.as_bytes(), &media.0).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 2);
        assert!(errors[0].message.starts_with("price: "));
    }
}
