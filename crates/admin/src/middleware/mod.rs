//! HTTP middleware for the admin console.
//!
//! The admin is an internal tool: no CORS, no rate limiting. Authentication
//! is an extractor ([`RequireAdmin`]) rather than a layer so that `/health`
//! stays open.

pub mod auth;

pub use auth::RequireAdmin;
