//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOP_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `SHOP_JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `SHOP_HOST` - Bind address (default: 127.0.0.1)
//! - `SHOP_PORT` - Listen port (default: 8000)
//! - `SHOP_MEDIA_ROOT` - Directory holding uploaded product images (default: media)
//! - `SHOP_MEDIA_URL` - Public prefix for media files (default: /media)
//! - `SHOP_CORS_ORIGINS` - Comma-separated list of allowed browser origins
//! - `SHOP_ACCESS_TOKEN_MINUTES` - Access token lifetime (default: 5)
//! - `SHOP_REFRESH_TOKEN_DAYS` - Refresh token lifetime (default: 1)
//! - `STRIPE_SECRET_KEY` - Stripe API key; payments are disabled without it
//! - `STRIPE_WEBHOOK_SECRET` - Webhook endpoint secret (required with `STRIPE_SECRET_KEY`)
//! - `STRIPE_CURRENCY` - ISO currency code for payment intents (default: inr)
//! - `STRIPE_API_BASE` - Stripe API base URL (default: <https://api.stripe.com>)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SIGNING_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Media file locations
    pub media: MediaConfig,
    /// Origins allowed to call the API from a browser
    pub cors_origins: Vec<String>,
    /// Token signing and lifetimes
    pub jwt: JwtConfig,
    /// Stripe configuration, `None` when payments are disabled
    pub stripe: Option<StripeConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Where product images live on disk and how they are addressed publicly.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Directory on disk
    pub root: PathBuf,
    /// URL prefix the directory is served under (no trailing slash)
    pub url: String,
}

impl MediaConfig {
    /// Public URL of a media-relative path such as `products/mobile_1.jpg`.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.url, path.trim_start_matches('/'))
    }
}

/// JSON Web Token configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HS256 signing secret
    pub secret: SecretString,
    /// Lifetime of access tokens
    pub access_token_ttl: Duration,
    /// Lifetime of refresh tokens
    pub refresh_token_ttl: Duration,
}

/// Stripe API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (`sk_...`)
    pub secret_key: SecretString,
    /// Webhook endpoint signing secret (`whsec_...`)
    pub webhook_secret: SecretString,
    /// Lowercase ISO currency code
    pub currency: String,
    /// API base URL
    pub api_base: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("currency", &self.currency)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SHOP_DATABASE_URL")?;
        let host = get_env_or_default("SHOP_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SHOP_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("SHOP_PORT", "8000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SHOP_PORT".to_string(), e.to_string()))?;

        let media = MediaConfig {
            root: PathBuf::from(get_env_or_default("SHOP_MEDIA_ROOT", "media")),
            url: get_env_or_default("SHOP_MEDIA_URL", "/media")
                .trim_end_matches('/')
                .to_string(),
        };
        let cors_origins = parse_list(&get_env_or_default("SHOP_CORS_ORIGINS", ""));

        let jwt = JwtConfig::from_env()?;
        let stripe = StripeConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            media,
            cors_origins,
            jwt,
            stripe,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret = get_validated_secret("SHOP_JWT_SECRET")?;
        validate_secret_length(&secret, "SHOP_JWT_SECRET")?;

        let access_minutes = get_parsed_or_default("SHOP_ACCESS_TOKEN_MINUTES", 5)?;
        let refresh_days = get_parsed_or_default("SHOP_REFRESH_TOKEN_DAYS", 1)?;

        Ok(Self {
            secret,
            access_token_ttl: Duration::from_secs(access_minutes * 60),
            refresh_token_ttl: Duration::from_secs(refresh_days * 24 * 60 * 60),
        })
    }
}

impl StripeConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        if get_optional_env("STRIPE_SECRET_KEY").is_none() {
            return Ok(None);
        }

        Ok(Some(Self {
            secret_key: get_validated_secret("STRIPE_SECRET_KEY")?,
            webhook_secret: get_validated_secret("STRIPE_WEBHOOK_SECRET")?,
            currency: get_env_or_default("STRIPE_CURRENCY", "inr").to_lowercase(),
            api_base: get_env_or_default("STRIPE_API_BASE", "https://api.stripe.com")
                .trim_end_matches('/')
                .to_string(),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a positive integer environment variable with a default value.
fn get_parsed_or_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        )),
        Ok(value) => Ok(value),
        Err(e) => Err(ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}

/// Split a comma-separated list, dropping blanks.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SIGNING_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SIGNING_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-jwt-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_secret_length() {
        assert!(validate_secret_length(&SecretString::from("short"), "TEST").is_err());
        assert!(validate_secret_length(&SecretString::from("a".repeat(32)), "TEST").is_ok());
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list(" http://localhost:5173, ,https://shop.test "),
            vec!["http://localhost:5173", "https://shop.test"]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_media_url_for() {
        let media = MediaConfig {
            root: PathBuf::from("media"),
            url: "/media".to_string(),
        };
        assert_eq!(
            media.url_for("products/mobile_1.jpg"),
            "/media/products/mobile_1.jpg"
        );
        assert_eq!(media.url_for("/products/a.png"), "/media/products/a.png");
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 8000,
            media: MediaConfig {
                root: PathBuf::from("media"),
                url: "/media".to_string(),
            },
            cors_origins: Vec::new(),
            jwt: JwtConfig {
                secret: SecretString::from("x".repeat(32)),
                access_token_ttl: Duration::from_secs(300),
                refresh_token_ttl: Duration::from_secs(86_400),
            },
            stripe: None,
            sentry_dsn: None,
            sentry_environment: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8000);
    }

    #[test]
    fn test_stripe_config_debug_redacts_secrets() {
        let config = StripeConfig {
            secret_key: SecretString::from("sk_test_super_private_value"),
            webhook_secret: SecretString::from("whsec_super_private_value"),
            currency: "inr".to_string(),
            api_base: "https://api.stripe.com".to_string(),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("inr"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk_test_super_private_value"));
        assert!(!debug_output.contains("whsec_super_private_value"));
    }
}
