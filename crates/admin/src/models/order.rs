//! Order models for the admin console.
//!
//! Staff may move an order through its fulfilment and payment states. The
//! order date, line items and Stripe reference are read-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shop_core::{
    Money, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId,
};

/// An order row in the admin list.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub user_id: UserId,
    pub username: String,
    pub ordered_at: DateTime<Utc>,
    pub shipping_address: String,
    pub order_status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub total_amount: Money,
    pub stripe_payment_intent: Option<String>,
}

/// One line of an order, priced at checkout time.
#[derive(Debug, Clone, Serialize)]
pub struct OrderLine {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Money,
    pub total_price: Money,
}

/// Filters for the admin order list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub order_status: Option<OrderStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: Option<PaymentStatus>,
    /// Matches username or shipping address.
    pub search: Option<String>,
}

/// Status changes staff may make.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderUpdate {
    pub order_status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

impl OrderUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.order_status.is_none() && self.payment_status.is_none()
    }
}
