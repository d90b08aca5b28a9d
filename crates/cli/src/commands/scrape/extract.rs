//! Listing extraction from a search results page.
//!
//! Retail markup changes often, so every field is looked up through a chain
//! of selectors and the first one that yields a usable value wins.

use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};

use shop_core::Money;

use super::ScrapeError;

/// Product containers, most specific first. The first selector that
/// matches anything is used for the whole page.
const CONTAINER_SELECTORS: &[&str] = &[
    "[data-component-type='s-search-result']",
    ".s-result-item",
    "[data-asin]:not([data-asin=''])",
];

const NAME_SELECTORS: &[&str] = &[
    "h2 a span",
    "[data-cy='title-recipe-title']",
    "h2 span",
    ".a-size-mini span",
    ".a-size-base-plus",
    ".s-size-mini",
];

const PRICE_SELECTORS: &[&str] = &[
    ".a-price-whole",
    ".a-price .a-offscreen",
    ".a-price-range .a-price .a-offscreen",
    "[data-a-color='price'] .a-offscreen",
];

const RATING_SELECTORS: &[&str] = &[
    ".a-icon-alt",
    "[data-cy='reviews-ratings-slot'] .a-icon-alt",
    ".a-icon-row .a-icon-alt",
];

const IMAGE_SELECTORS: &[&str] = &[
    "img",
    ".s-image",
    "[data-component-type='s-product-image'] img",
];

/// Names this short are badges or labels, not product titles.
const MIN_NAME_LENGTH: usize = 6;

/// Longest name kept.
pub const MAX_NAME_LENGTH: usize = 200;

/// Rating used when a listing shows none.
pub const DEFAULT_RATING: Decimal = Decimal::from_parts(40, 0, 0, false, 1);

/// One product listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// 1-based position of the container on the page.
    pub position: usize,
    pub name: String,
    pub price: Money,
    pub rating: Decimal,
    /// Absolute image URL, if the listing has a real (non-inline) image.
    pub image_url: Option<String>,
}

/// Compiled selector chains.
pub struct Selectors {
    containers: Vec<Selector>,
    name: Vec<Selector>,
    price: Vec<Selector>,
    rating: Vec<Selector>,
    image: Vec<Selector>,
}

fn compile(chain: &[&str]) -> Result<Vec<Selector>, ScrapeError> {
    chain
        .iter()
        .map(|css| {
            Selector::parse(css).map_err(|e| ScrapeError::Selector(format!("{css}: {e}")))
        })
        .collect()
}

impl Selectors {
    /// Compile every selector chain.
    ///
    /// # Errors
    ///
    /// Returns `ScrapeError::Selector` if a selector fails to parse.
    pub fn new() -> Result<Self, ScrapeError> {
        Ok(Self {
            containers: compile(CONTAINER_SELECTORS)?,
            name: compile(NAME_SELECTORS)?,
            price: compile(PRICE_SELECTORS)?,
            rating: compile(RATING_SELECTORS)?,
            image: compile(IMAGE_SELECTORS)?,
        })
    }

    /// Extract up to `limit` listings from a results page.
    ///
    /// Containers without a usable name are skipped but still count
    /// towards `limit` and keep their position.
    #[must_use]
    pub fn extract(&self, html: &str, limit: usize) -> Vec<Listing> {
        let document = Html::parse_document(html);

        let containers: Vec<ElementRef<'_>> = self
            .containers
            .iter()
            .map(|selector| document.select(selector).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
            .unwrap_or_default();

        tracing::info!(containers = containers.len(), "Found product containers");

        containers
            .into_iter()
            .take(limit)
            .enumerate()
            .filter_map(|(index, container)| {
                let listing = self.listing(container, index + 1);
                if listing.is_none() {
                    tracing::debug!(position = index + 1, "No usable name, skipping");
                }
                listing
            })
            .collect()
    }

    fn listing(&self, container: ElementRef<'_>, position: usize) -> Option<Listing> {
        let name = first_value(container, &self.name, |text| {
            (text.chars().count() >= MIN_NAME_LENGTH)
                .then(|| text.chars().take(MAX_NAME_LENGTH).collect::<String>())
        })?;

        let price = first_value(container, &self.price, parse_price).unwrap_or(Money::ZERO);
        let rating = first_value(container, &self.rating, parse_rating).unwrap_or(DEFAULT_RATING);

        let image_url = self.image.iter().find_map(|selector| {
            container
                .select(selector)
                .next()
                .and_then(|img| img.value().attr("src"))
                .filter(|src| !src.is_empty() && !src.contains("data:image"))
                .map(String::from)
        });

        Some(Listing {
            position,
            name,
            price,
            rating,
            image_url,
        })
    }
}

/// Text of the first element matched by each selector in turn, until
/// `parse` accepts one.
fn first_value<T>(
    container: ElementRef<'_>,
    chain: &[Selector],
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    chain.iter().find_map(|selector| {
        let element = container.select(selector).next()?;
        let text = element.text().collect::<String>();
        parse(text.trim())
    })
}

/// Keep digits and dots (`"₹12,999."` → `12999`); only positive prices count.
pub fn parse_price(text: &str) -> Option<Money> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let price = digits.trim_end_matches('.').parse::<Money>().ok()?;
    (price > Money::ZERO).then_some(price)
}

/// `"4.3 out of 5 stars"` → `4.3`.
pub fn parse_rating(text: &str) -> Option<Decimal> {
    if !text.contains("out of") {
        return None;
    }
    text.split_whitespace().next()?.parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"
        <html><body>
          <div data-component-type="s-search-result" data-asin="B0C1">
            <span class="a-badge">Deal</span>
            <h2><a href="/p/1"><span>Galaxy M14 5G (Icy Silver, 6GB, 128GB)</span></a></h2>
            <span class="a-price"><span class="a-offscreen">₹13,490</span>
              <span class="a-price-whole">13,490.</span></span>
            <i class="a-icon"><span class="a-icon-alt">4.1 out of 5 stars</span></i>
            <img class="s-image" src="https://m.media-amazon.com/images/I/81abc._AC_UY218_.jpg">
          </div>
          <div data-component-type="s-search-result" data-asin="B0C2">
            <h2><span>Ad</span></h2>
          </div>
          <div data-component-type="s-search-result" data-asin="B0C3">
            <h2><span>Redmi 13C (Starfrost Black)</span></h2>
            <img src="data:image/gif;base64,R0lGOD">
          </div>
        </body></html>
    "#;

    #[test]
    fn test_extracts_listings() {
        let listings = Selectors::new().unwrap().extract(RESULTS_PAGE, 10);
        assert_eq!(listings.len(), 2);

        let first = &listings[0];
        assert_eq!(first.position, 1);
        assert_eq!(first.name, "Galaxy M14 5G (Icy Silver, 6GB, 128GB)");
        assert_eq!(first.price.to_string(), "13490.00");
        assert_eq!(first.rating, Decimal::new(41, 1));
        assert_eq!(
            first.image_url.as_deref(),
            Some("https://m.media-amazon.com/images/I/81abc._AC_UY218_.jpg")
        );

        let third = &listings[1];
        assert_eq!(third.position, 3);
        assert_eq!(third.price, Money::ZERO);
        assert_eq!(third.rating, DEFAULT_RATING);
        assert_eq!(third.image_url, None);
    }

    #[test]
    fn test_limit_counts_skipped_containers() {
        let listings = Selectors::new().unwrap().extract(RESULTS_PAGE, 2);
        assert_eq!(listings.len(), 1);
    }

    #[test]
    fn test_falls_back_to_later_container_selectors() {
        let html = r#"<div data-asin="X1"><span class="a-size-base-plus">Nokia 105 Classic</span></div>
                      <div data-asin=""><span class="a-size-base-plus">Not a product</span></div>"#;
        let listings = Selectors::new().unwrap().extract(html, 10);
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].name, "Nokia 105 Classic");
    }

    #[test]
    fn test_name_is_truncated() {
        let long = "x".repeat(300);
        let html = format!(r#"<div class="s-result-item"><h2><span>{long}</span></h2></div>"#);
        let listings = Selectors::new().unwrap().extract(&html, 10);
        assert_eq!(listings[0].name.len(), MAX_NAME_LENGTH);
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("₹12,999").unwrap().to_string(), "12999.00");
        assert_eq!(parse_price("1,299.50").unwrap().to_string(), "1299.50");
        assert_eq!(parse_price("0"), None);
        assert_eq!(parse_price("Currently unavailable"), None);
    }

    #[test]
    fn test_parse_rating() {
        assert_eq!(parse_rating("3.9 out of 5 stars"), Some(Decimal::new(39, 1)));
        assert_eq!(parse_rating("4.5 stars"), None);
    }
}
