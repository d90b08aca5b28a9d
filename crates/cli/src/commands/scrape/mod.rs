//! Catalog scraper.
//!
//! Fetches a retail search results page, extracts product listings,
//! downloads their images into the media directory and writes a CSV in
//! the product import format. When nothing can be scraped (blocked request,
//! changed markup) it writes placeholder images and sample products instead,
//! so the catalog can always be seeded.
//!
//! # Usage
//!
//! ```bash
//! shop-cli scrape --limit 10 --output products_scraped_fixed.csv
//! shop-cli import products products_scraped_fixed.csv
//! ```

pub mod extract;
pub mod samples;

use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONTENT_TYPE};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use shop_core::Money;

use extract::{Listing, Selectors};

/// Search page scraped when no `--url` is given.
pub const DEFAULT_URL: &str = "https://www.amazon.in/s?k=mobile+phone&ref=nb_sb_noss";

/// Browser-like user agent; listing pages refuse obvious bots.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const PAGE_TIMEOUT: Duration = Duration::from_secs(30);
const IMAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Category every scraped product is filed under.
pub const CATEGORY: &str = "Mobile";
const BRAND: &str = "Unknown";
const DEFAULT_EXTENSION: &str = ".jpg";

/// Errors from the scrape command.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid selector {0}")]
    Selector(String),

    #[error("Not an image: {0}")]
    NotAnImage(String),

    #[error("Empty image body")]
    EmptyImage,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Options of the scrape command.
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub url: String,
    pub limit: usize,
    pub output: PathBuf,
    pub media_dir: PathBuf,
}

/// One output row, in the product import format plus the source image URL.
#[derive(Debug, Clone, Serialize)]
pub struct ProductRow {
    pub name: String,
    pub brand: String,
    #[serde(rename = "category__name")]
    pub category: String,
    pub description: String,
    pub price: Money,
    pub stock: i32,
    pub image: String,
    pub image_url: String,
    pub rating: Decimal,
    pub is_active: bool,
}

/// Random stock level for a generated product.
pub(crate) fn random_stock(rng: &mut impl Rng) -> i32 {
    rng.random_range(5..=50)
}

/// Scrape, fall back to samples if nothing was found, and write the CSV.
///
/// # Errors
///
/// Returns `ScrapeError` if the output or placeholder files can't be
/// written. Network failures only trigger the sample fallback.
pub async fn run(options: &ScrapeOptions) -> Result<(), ScrapeError> {
    let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

    let mut rows = match scrape(&client, options).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(error = %e, url = %options.url, "Scraping failed");
            Vec::new()
        }
    };

    if rows.is_empty() {
        tracing::warn!("No products were scraped; writing sample data instead");
        samples::write_placeholders(&options.media_dir).await?;
        rows = samples::sample_rows();
    }

    let file = std::fs::File::create(&options.output)?;
    write_csv(file, &rows)?;

    tracing::info!(
        products = rows.len(),
        output = %options.output.display(),
        "Wrote product CSV"
    );
    Ok(())
}

async fn scrape(
    client: &reqwest::Client,
    options: &ScrapeOptions,
) -> Result<Vec<ProductRow>, ScrapeError> {
    tracing::info!(url = %options.url, "Loading results page");
    let html = client
        .get(&options.url)
        .header(ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
        .timeout(PAGE_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let listings = Selectors::new()?.extract(&html, options.limit);

    let mut rows = Vec::with_capacity(listings.len());
    for listing in listings {
        let image = store_image(client, &listing, &options.media_dir).await;
        tracing::info!(name = %listing.name, price = %listing.price, "Scraped product");
        rows.push(product_row(listing, image));

        let pause = rand::rng().random_range(1000..=2000);
        tokio::time::sleep(Duration::from_millis(pause)).await;
    }

    Ok(rows)
}

/// Download a listing's image, returning the media-relative path.
///
/// The expected path is returned even when the download fails, matching
/// the file name a later manual download would use.
async fn store_image(client: &reqwest::Client, listing: &Listing, media_dir: &Path) -> String {
    let Some(url) = listing.image_url.as_deref() else {
        return format!("products/mobile_{}{DEFAULT_EXTENSION}", listing.position);
    };

    let file_name = format!("mobile_{}{}", listing.position, image_extension(url));
    let relative = format!("products/{file_name}");

    if let Err(e) = download_image(client, url, &media_dir.join("products").join(&file_name)).await
    {
        tracing::warn!(error = %e, url, file = %file_name, "Image download failed");
    }

    relative
}

async fn download_image(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
) -> Result<(), ScrapeError> {
    let response = client
        .get(url)
        .header(ACCEPT, "image/webp,image/apng,image/*,*/*;q=0.8")
        .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
        .header(CACHE_CONTROL, "no-cache")
        .timeout(IMAGE_TIMEOUT)
        .send()
        .await?
        .error_for_status()?;

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if !content_type.contains("image") {
        return Err(ScrapeError::NotAnImage(content_type));
    }

    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Err(ScrapeError::EmptyImage);
    }

    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(path, &bytes).await?;
    Ok(())
}

/// File extension from an image URL's path, at most 4 chars with the dot.
fn image_extension(url: &str) -> String {
    let path = reqwest::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.split(['?', '#']).next().unwrap_or_default().to_string());

    let file_name = path.rsplit('/').next().unwrap_or_default();
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => format!(".{ext}").chars().take(4).collect(),
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

fn product_row(listing: Listing, image: String) -> ProductRow {
    ProductRow {
        description: format!("{} - Mobile phone", listing.name),
        name: listing.name,
        brand: BRAND.to_string(),
        category: CATEGORY.to_string(),
        price: listing.price,
        stock: random_stock(&mut rand::rng()),
        image,
        image_url: listing.image_url.unwrap_or_default(),
        rating: listing.rating,
        is_active: true,
    }
}

/// Write rows as CSV with a header.
fn write_csv<W: std::io::Write>(output: W, rows: &[ProductRow]) -> Result<(), ScrapeError> {
    let mut writer = csv::Writer::from_writer(output);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extension() {
        assert_eq!(
            image_extension("https://m.media-amazon.com/images/I/81abc._AC_UY218_.jpg"),
            ".jpg"
        );
        assert_eq!(image_extension("https://cdn.example.com/a/b.webp?x=1"), ".web");
        assert_eq!(image_extension("https://cdn.example.com/a/image"), ".jpg");
        assert_eq!(image_extension("not a url/pic.png"), ".png");
    }

    #[test]
    fn test_product_row_fixed_fields() {
        let listing = Listing {
            position: 4,
            name: "Galaxy M14 5G".to_string(),
            price: "13490".parse().unwrap(),
            rating: Decimal::new(41, 1),
            image_url: Some("https://img.example.com/x.jpg".to_string()),
        };

        let row = product_row(listing, "products/mobile_4.jpg".to_string());
        assert_eq!(row.brand, "Unknown");
        assert_eq!(row.category, "Mobile");
        assert_eq!(row.description, "Galaxy M14 5G - Mobile phone");
        assert_eq!(row.image_url, "https://img.example.com/x.jpg");
        assert!((5..=50).contains(&row.stock));
        assert!(row.is_active);
    }

    #[test]
    fn test_csv_matches_product_import_columns() {
        let mut out = Vec::new();
        write_csv(&mut out, &samples::sample_rows()[..1]).unwrap();
        let text = String::from_utf8(out).unwrap();

        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "name,brand,category__name,description,price,stock,image,image_url,rating,is_active"
        );
        assert!(text.lines().nth(1).unwrap().starts_with("Sample Mobile Phone 1,SampleBrand,Mobile,"));
    }

    #[tokio::test]
    async fn test_store_image_without_url_uses_expected_path() {
        let client = reqwest::Client::new();
        let listing = Listing {
            position: 7,
            name: "Nokia 105 Classic".to_string(),
            price: Money::ZERO,
            rating: extract::DEFAULT_RATING,
            image_url: None,
        };

        let image = store_image(&client, &listing, Path::new("unused")).await;
        assert_eq!(image, "products/mobile_7.jpg");
    }
}
