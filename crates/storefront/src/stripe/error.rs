//! Stripe-related errors.

use thiserror::Error;

/// Errors that can occur when interacting with Stripe.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("Stripe request failed: {0}")]
    Request(String),

    /// Failed to parse response.
    #[error("Stripe response error: {0}")]
    Response(String),

    /// Stripe API returned an error.
    #[error("Stripe API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Amount cannot be expressed in minor units.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Invalid webhook signature.
    #[error("Invalid Stripe signature: {0}")]
    InvalidSignature(String),

    /// Webhook payload could not be decoded.
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
}
