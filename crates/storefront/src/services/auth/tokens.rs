//! Signed bearer tokens.
//!
//! Two kinds of HS256 JWT are issued: short-lived access tokens sent on
//! every request, and longer-lived refresh tokens exchanged for new access
//! tokens. Tokens are stateless; logging out means the client drops them.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use shop_core::UserId;

use super::AuthError;
use crate::config::JwtConfig;

/// Which kind of token a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID, as a string.
    pub sub: String,
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
}

/// An access/refresh token pair issued at login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Issues and verifies tokens with the configured secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    /// Create an issuer from configuration.
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
        }
    }

    /// Issue a token of the given type for a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if encoding fails.
    pub fn issue(&self, user_id: UserId, token_type: TokenType) -> Result<String, AuthError> {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let iat = Utc::now().timestamp();
        let exp = iat.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX));

        let claims = Claims {
            sub: user_id.to_string(),
            token_type,
            iat,
            exp,
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Issue an access/refresh pair for a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if encoding fails.
    pub fn issue_pair(&self, user_id: UserId) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access: self.issue(user_id, TokenType::Access)?,
            refresh: self.issue(user_id, TokenType::Refresh)?,
        })
    }

    /// Verify a token's signature, expiry and type, returning its user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` on any verification failure.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<UserId, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?;

        if data.claims.token_type != expected {
            return Err(AuthError::InvalidToken);
        }

        data.claims
            .sub
            .parse::<i32>()
            .map(UserId::new)
            .map_err(|_| AuthError::InvalidToken)
    }
}
