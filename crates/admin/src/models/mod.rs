//! Domain models for the admin console.
//!
//! Admin views are flatter than the storefront's: related rows are shown by
//! name, the way a back-office list renders them.

pub mod cart;
pub mod catalog;
pub mod order;

pub use cart::{CartFilter, CartLine, CartSummary};
pub use catalog::{
    Category, CategoryInput, CategoryUpdate, Product, ProductFields, ProductFilter, ProductUpdate,
};
pub use order::{OrderFilter, OrderLine, OrderSummary, OrderUpdate};

use serde::{Deserialize, Serialize};

/// Default page size for paginated listings.
pub const DEFAULT_PER_PAGE: u32 = 50;

/// Largest page size a client may request.
pub const MAX_PER_PAGE: u32 = 200;

/// Page selection for list endpoints (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Page {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

const fn first_page() -> u32 {
    1
}

const fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: first_page(),
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl Page {
    /// Rows to return, clamped to `1..=MAX_PER_PAGE`.
    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page.clamp(1, MAX_PER_PAGE))
    }

    /// Rows to skip.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * self.limit()
    }
}

/// One page of a listing plus the total row count.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        let page = Page::default();
        assert_eq!(page.limit(), 50);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_page_offset() {
        let page = Page {
            page: 3,
            per_page: 20,
        };
        assert_eq!(page.offset(), 40);
    }

    #[test]
    fn test_page_clamps() {
        let page = Page {
            page: 0,
            per_page: 10_000,
        };
        assert_eq!(page.limit(), 200);
        assert_eq!(page.offset(), 0);

        let page = Page {
            page: 2,
            per_page: 0,
        };
        assert_eq!(page.limit(), 1);
        assert_eq!(page.offset(), 1);
    }
}
