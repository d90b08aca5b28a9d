//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`] and from the JSON views in [`crate::routes`].

pub mod cart;
pub mod catalog;
pub mod order;
pub mod user;

pub use cart::{Cart, CartItem};
pub use catalog::{Category, Product};
pub use order::{Order, OrderItem};
pub use user::User;
