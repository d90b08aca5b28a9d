//! Catalog models for the admin console.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shop_core::{CategoryId, Money, ProductId};

/// Longest category name the schema accepts.
pub const MAX_CATEGORY_NAME_LENGTH: usize = 120;

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
}

/// Input for creating a category.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Partial update of a category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Validate a category name, returning it trimmed.
///
/// # Errors
///
/// Returns a message if the name is blank or too long.
pub fn validate_category_name(name: &str) -> Result<&str, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("name: This field may not be blank.".to_string());
    }
    if name.chars().count() > MAX_CATEGORY_NAME_LENGTH {
        return Err(format!(
            "name: Ensure this field has no more than {MAX_CATEGORY_NAME_LENGTH} characters."
        ));
    }
    Ok(name)
}

/// A product as the admin list shows it.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub category_id: Option<CategoryId>,
    /// Category name, if any.
    pub category: Option<String>,
    pub description: String,
    pub price: Money,
    pub stock: i32,
    /// Media-relative image path.
    pub image: Option<String>,
    pub has_image: bool,
    pub rating: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Every stored product field except identity and timestamps.
///
/// This is what a CSV import writes, and what it compares to decide whether
/// a row changes anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFields {
    pub name: String,
    pub brand: String,
    pub category_id: Option<CategoryId>,
    pub description: String,
    pub price: Money,
    pub stock: i32,
    pub image: Option<String>,
    pub rating: Decimal,
    pub is_active: bool,
}

impl ProductFields {
    /// Whether `product` already holds exactly these values.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.name == product.name
            && self.brand == product.brand
            && self.category_id == product.category_id
            && self.description == product.description
            && self.price == product.price
            && self.stock == product.stock
            && self.image == product.image
            && self.rating == product.rating
            && self.is_active == product.is_active
    }
}

/// Filters for the admin product list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub category: Option<CategoryId>,
    pub brand: Option<String>,
    pub is_active: Option<bool>,
    /// Matches name, brand or description.
    pub search: Option<String>,
}

/// The inline-editable product fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub price: Option<Money>,
    pub stock: Option<i32>,
    pub is_active: Option<bool>,
}

impl ProductUpdate {
    /// Check the values against the schema constraints.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.price.is_some_and(|price| price.is_negative()) {
            return Err("price: Ensure this value is greater than or equal to 0.".to_string());
        }
        if self.price.is_some_and(|price| price > Money::MAX) {
            return Err(format!(
                "price: Ensure this value is less than or equal to {}.",
                Money::MAX
            ));
        }
        if self.stock.is_some_and(|stock| stock < 0) {
            return Err("stock: Ensure this value is greater than or equal to 0.".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_category_name() {
        assert_eq!(validate_category_name("  Mobile ").unwrap(), "Mobile");
        assert!(validate_category_name("   ").is_err());
        assert!(validate_category_name(&"x".repeat(121)).is_err());
    }

    #[test]
    fn test_product_update_validation() {
        let update: ProductUpdate =
            serde_json::from_str(r#"{"price":"12.50","stock":4,"is_active":false}"#).unwrap();
        assert!(update.validate().is_ok());
        assert_eq!(update.price.unwrap().to_string(), "12.50");

        let update: ProductUpdate = serde_json::from_str(r#"{"stock":-1}"#).unwrap();
        assert!(update.validate().unwrap_err().starts_with("stock"));

        let update: ProductUpdate = serde_json::from_str(r#"{"price":"-3"}"#).unwrap();
        assert!(update.validate().unwrap_err().starts_with("price"));

        let update: ProductUpdate =
            serde_json::from_str(r#"{"price":"10000000000.00"}"#).unwrap();
        assert!(update.validate().unwrap_err().starts_with("price"));
    }
}
