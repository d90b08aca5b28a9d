//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use crate::config::AdminConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    token_digest: Vec<u8>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: AdminConfig, pool: PgPool) -> Self {
        let token_digest = Sha256::digest(config.api_token.expose_secret().as_bytes()).to_vec();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                token_digest,
            }),
        }
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// SHA-256 of the configured admin token.
    #[must_use]
    pub fn token_digest(&self) -> &[u8] {
        &self.inner.token_digest
    }
}
