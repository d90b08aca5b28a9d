//! Authentication service.
//!
//! Username/password accounts with argon2id hashes, authenticated with
//! bearer tokens from [`tokens`].

mod error;
pub mod tokens;

pub use error::AuthError;
pub use tokens::{Claims, TokenIssuer, TokenPair, TokenType};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use shop_core::Username;

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication service.
///
/// Handles signup, login and token refresh.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: &'a TokenIssuer,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tokens: &'a TokenIssuer) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens,
        }
    }

    /// Register a new user and issue their first token pair.
    ///
    /// `email` may be blank.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials` if username or password is blank.
    /// Returns `AuthError::InvalidUsername` / `AuthError::InvalidEmail` on bad input.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UsernameTaken` if the username is already registered.
    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(User, TokenPair), AuthError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let username = Username::parse(username.trim())?;
        let email = shop_core::Email::parse_optional(email)?;
        validate_password(password)?;

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(&username, email.as_ref(), &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UsernameTaken,
                other => AuthError::Repository(other),
            })?;

        let tokens = self.tokens.issue_pair(user.id)?;
        Ok((user, tokens))
    }

    /// Log in with username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials` if either field is blank.
    /// Returns `AuthError::InvalidCredentials` if the username/password is wrong.
    pub async fn login(&self, username: &str, password: &str) -> Result<(User, TokenPair), AuthError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let (user, password_hash) = self
            .users
            .get_with_password_hash(username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let tokens = self.tokens.issue_pair(user.id)?;
        Ok((user, tokens))
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is invalid or its user
    /// no longer exists.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let user_id = self.tokens.verify(refresh_token, TokenType::Refresh)?;

        if self.users.get_by_id(user_id).await?.is_none() {
            return Err(AuthError::InvalidToken);
        }

        self.tokens.issue(user_id, TokenType::Access)
    }
}

/// Validate password strength.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_against_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("longenough").is_ok());
    }
}
