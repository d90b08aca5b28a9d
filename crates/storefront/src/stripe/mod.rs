//! Stripe integration.
//!
//! - [`StripeClient`] creates payment intents over the REST API
//! - [`webhook`] verifies and decodes webhook deliveries

mod client;
mod error;
pub mod types;
pub mod webhook;

pub use client::StripeClient;
pub use error::StripeError;
pub use types::{PaymentIntent, WebhookEvent};
