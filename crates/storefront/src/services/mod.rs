//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Signup, login and bearer tokens
//! - `checkout` - Cart to order conversion
//! - `payments` - Stripe payment intents and webhook reconciliation

pub mod auth;
pub mod checkout;
pub mod payments;
