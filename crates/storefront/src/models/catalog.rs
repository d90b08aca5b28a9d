//! Catalog domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use shop_core::{CategoryId, Money, ProductId};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
}

/// A sellable product.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub category: Option<Category>,
    pub name: String,
    pub brand: String,
    pub description: String,
    pub price: Money,
    pub stock: i32,
    /// Media-relative image path, e.g. `products/mobile_1.jpg`.
    pub image: Option<String>,
    pub rating: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
