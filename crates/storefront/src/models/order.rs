//! Order domain types.
//!
//! Order items are a snapshot of the cart taken at checkout: `unit_price` is
//! the product price at that instant and never changes afterwards.

use chrono::{DateTime, Utc};

use shop_core::{Money, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus};

use super::{Product, User};

/// A placed order.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub user: User,
    pub ordered_at: DateTime<Utc>,
    pub shipping_address: String,
    pub order_status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub total_amount: Money,
    pub stripe_payment_intent: Option<String>,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Whether a Stripe payment can still be started for this order.
    #[must_use]
    pub const fn accepts_card_payment(&self) -> bool {
        matches!(self.payment_method, PaymentMethod::Stripe) && self.payment_status.is_payable()
    }
}

/// One line of a placed order.
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product: Product,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderItem {
    /// Snapshot price times quantity.
    #[must_use]
    pub fn total_price(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}
