//! Shop Core - Shared types library.
//!
//! This crate provides common types used across all shop components:
//! - `storefront` - Public REST API (catalog, cart, checkout, payments)
//! - `admin` - Import/export console
//! - `cli` - Migrations, bulk import/export and the catalog scraper
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, usernames, emails and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
