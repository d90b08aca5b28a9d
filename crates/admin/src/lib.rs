//! Shop admin console library.
//!
//! Catalog maintenance, CSV import/export and cart/order inspection. The
//! import/export functions are also used directly by `shop-cli`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod import_export;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;

pub use routes::app;
