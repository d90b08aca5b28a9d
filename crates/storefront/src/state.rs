//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::cache::CatalogCache;
use crate::config::StorefrontConfig;
use crate::services::auth::TokenIssuer;
use crate::stripe::StripeClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    tokens: TokenIssuer,
    stripe: Option<StripeClient>,
    catalog: CatalogCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Payments are enabled only when the configuration carries Stripe keys.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let tokens = TokenIssuer::new(&config.jwt);
        let stripe = config.stripe.as_ref().map(StripeClient::new);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                stripe,
                catalog: CatalogCache::default(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the token issuer.
    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.inner.tokens
    }

    /// Get the Stripe client, if payments are configured.
    #[must_use]
    pub fn stripe(&self) -> Option<&StripeClient> {
        self.inner.stripe.as_ref()
    }

    /// Get a reference to the catalog cache.
    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }
}
