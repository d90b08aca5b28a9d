//! Generated sample catalog, used when scraping yields nothing.

use std::path::Path;

use rand::Rng;
use rust_decimal::Decimal;

use shop_core::Money;

use super::{CATEGORY, ProductRow, ScrapeError, random_stock};

/// Number of sample products generated.
pub const SAMPLE_COUNT: usize = 10;

const PLACEHOLDER_SIZE: u32 = 300;
const PLACEHOLDER_BACKGROUND: &str = "#4682b4";

/// A square steel-blue SVG with `label` centred in white.
#[must_use]
pub fn placeholder_svg(label: &str) -> String {
    let size = PLACEHOLDER_SIZE;
    let half = size / 2;
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}" viewBox="0 0 {size} {size}">
  <rect width="{size}" height="{size}" fill="{PLACEHOLDER_BACKGROUND}"/>
  <text x="{half}" y="{half}" fill="#ffffff" font-family="Arial, sans-serif" font-size="36" text-anchor="middle" dominant-baseline="middle">{label}</text>
</svg>
"##
    )
}

/// Write `mobile_1.svg` … `mobile_10.svg` under `<media_dir>/products/`.
///
/// # Errors
///
/// Returns `ScrapeError::Io` if a file can't be written.
pub async fn write_placeholders(media_dir: &Path) -> Result<(), ScrapeError> {
    let dir = media_dir.join("products");
    tokio::fs::create_dir_all(&dir).await?;

    for i in 1..=SAMPLE_COUNT {
        let path = dir.join(format!("mobile_{i}.svg"));
        tokio::fs::write(&path, placeholder_svg(&format!("Mobile {i}"))).await?;
    }

    tracing::info!(count = SAMPLE_COUNT, dir = %dir.display(), "Created placeholder images");
    Ok(())
}

/// Sample products pointing at the placeholder images.
#[must_use]
pub fn sample_rows() -> Vec<ProductRow> {
    let mut rng = rand::rng();

    (1..=SAMPLE_COUNT)
        .map(|i| ProductRow {
            name: format!("Sample Mobile Phone {i}"),
            brand: "SampleBrand".to_string(),
            category: CATEGORY.to_string(),
            description: format!("Sample mobile phone {i} description"),
            price: Money::from_minor_units(rng.random_range(1_000_000..=5_000_000)),
            stock: random_stock(&mut rng),
            image: format!("products/mobile_{i}.svg"),
            image_url: String::new(),
            rating: Decimal::new(rng.random_range(35..=50), 1),
            is_active: true,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_svg() {
        let svg = placeholder_svg("Mobile 3");
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"width="300""#));
        assert!(svg.contains(r##"fill="#4682b4""##));
        assert!(svg.contains(">Mobile 3</text>"));
    }

    #[test]
    fn test_sample_rows_ranges() {
        let rows = sample_rows();
        assert_eq!(rows.len(), SAMPLE_COUNT);

        let min_price: Money = "10000".parse().unwrap();
        let max_price: Money = "50000".parse().unwrap();
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.name, format!("Sample Mobile Phone {}", i + 1));
            assert_eq!(row.image, format!("products/mobile_{}.svg", i + 1));
            assert!(row.price >= min_price && row.price <= max_price);
            assert!(row.rating >= Decimal::new(35, 1) && row.rating <= Decimal::new(50, 1));
            assert!((5..=50).contains(&row.stock));
            assert!(row.is_active);
        }
    }

    #[tokio::test]
    async fn test_write_placeholders() {
        let dir = std::env::temp_dir().join(format!("shop-scrape-{}", uuid::Uuid::new_v4()));
        write_placeholders(&dir).await.unwrap();

        let svg = std::fs::read_to_string(dir.join("products/mobile_10.svg")).unwrap();
        assert!(svg.contains("Mobile 10"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
