//! Stripe API types (only the fields the shop reads).

use std::collections::HashMap;

use serde::Deserialize;

use shop_core::OrderId;

/// Metadata key linking a payment intent back to its order.
pub const ORDER_ID_METADATA_KEY: &str = "order_id";

/// A Stripe `PaymentIntent`.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Amount in minor units.
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntent {
    /// The order this intent was created for, from its metadata.
    #[must_use]
    pub fn order_id(&self) -> Option<OrderId> {
        self.metadata
            .get(ORDER_ID_METADATA_KEY)
            .and_then(|id| id.trim().parse::<i32>().ok())
            .map(OrderId::new)
    }

    /// Whether Stripe will no longer accept a confirmation for this intent.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.status.as_deref() == Some("canceled")
    }
}

/// Error envelope returned by the API on non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
}

/// Raw webhook event envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct RawEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: RawEventData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawEventData {
    pub object: serde_json::Value,
}

/// A decoded webhook event.
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    /// `payment_intent.succeeded`
    PaymentSucceeded(PaymentIntent),
    /// `payment_intent.payment_failed`
    PaymentFailed(PaymentIntent),
    /// Any other event type, acknowledged and ignored.
    Other(String),
}
