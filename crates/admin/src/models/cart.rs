//! Cart models for the admin console.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shop_core::{CartId, CartItemId, Money, ProductId, UserId};

/// A cart row in the admin list.
#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
    pub id: CartId,
    pub user_id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub item_count: i64,
    /// Lines at current product prices.
    pub total_price: Money,
}

/// One line of a cart.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Money,
    pub total_price: Money,
}

/// Filters for the admin cart list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartFilter {
    /// Matches the owner's username.
    pub search: Option<String>,
}
