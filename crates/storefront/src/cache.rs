//! In-process catalog cache.
//!
//! Category listings and product details change rarely and are read on
//! every page, so they are cached with `moka` for a short TTL. Cart and order
//! data is never cached.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use shop_core::ProductId;

use crate::models::{Category, Product};

/// How long catalog entries stay fresh.
pub const CATALOG_TTL: Duration = Duration::from_secs(60);

/// Cache key for catalog entries.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Categories,
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Categories(Arc<Vec<Category>>),
    Product(Arc<Product>),
}

/// Catalog cache shared across handlers.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogCache {
    /// Create a cache whose entries expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Cached category listing.
    pub async fn categories(&self) -> Option<Arc<Vec<Category>>> {
        match self.cache.get(&CacheKey::Categories).await {
            Some(CacheValue::Categories(categories)) => {
                debug!("Cache hit for categories");
                Some(categories)
            }
            _ => None,
        }
    }

    /// Store the category listing.
    pub async fn insert_categories(&self, categories: Arc<Vec<Category>>) {
        self.cache
            .insert(CacheKey::Categories, CacheValue::Categories(categories))
            .await;
    }

    /// Cached product detail.
    pub async fn product(&self, id: ProductId) -> Option<Arc<Product>> {
        match self.cache.get(&CacheKey::Product(id)).await {
            Some(CacheValue::Product(product)) => {
                debug!(product_id = %id, "Cache hit for product");
                Some(product)
            }
            _ => None,
        }
    }

    /// Store a product detail.
    pub async fn insert_product(&self, product: Arc<Product>) {
        self.cache
            .insert(CacheKey::Product(product.id), CacheValue::Product(product))
            .await;
    }
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new(CATALOG_TTL)
    }
}

#[cfg(test)]
mod tests {
    use shop_core::CategoryId;

    use super::*;
    use crate::models::cart::tests::product;

    #[tokio::test]
    async fn test_categories_round_trip() {
        let cache = CatalogCache::default();
        assert!(cache.categories().await.is_none());

        let categories = Arc::new(vec![Category {
            id: CategoryId::new(1),
            name: "Mobile".to_string(),
            description: String::new(),
        }]);
        cache.insert_categories(Arc::clone(&categories)).await;

        assert_eq!(cache.categories().await, Some(categories));
    }

    #[tokio::test]
    async fn test_products_keyed_by_id() {
        let cache = CatalogCache::default();
        cache.insert_product(Arc::new(product(5, "10.00"))).await;

        assert!(cache.product(ProductId::new(5)).await.is_some());
        assert!(cache.product(ProductId::new(6)).await.is_none());
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = CatalogCache::new(Duration::from_millis(20));
        cache.insert_categories(Arc::new(Vec::new())).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cache.categories().await.is_none());
    }
}
