//! Shop storefront library.
//!
//! The public REST API (catalog, cart, checkout, Stripe payments) as a
//! library, so the binary and the router tests share one application.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod stripe;

pub use routes::app;
