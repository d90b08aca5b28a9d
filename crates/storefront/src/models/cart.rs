//! Cart domain types.

use chrono::{DateTime, Utc};

use shop_core::{CartId, CartItemId, Money, UserId};

use super::Product;

/// A shopper's in-progress collection of line items.
#[derive(Debug, Clone)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Sum of the line totals at current product prices.
    #[must_use]
    pub fn total_price(&self) -> Money {
        self.items.iter().map(CartItem::total_price).sum()
    }

    /// Whether the cart has no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One product line in a cart.
#[derive(Debug, Clone)]
pub struct CartItem {
    pub id: CartItemId,
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    /// Current product price times quantity.
    #[must_use]
    pub fn total_price(&self) -> Money {
        self.product.price.times(self.quantity)
    }
}
