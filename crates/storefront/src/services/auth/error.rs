//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password was not supplied.
    #[error("username and password are required")]
    MissingCredentials,

    /// Username failed validation.
    #[error("invalid username: {0}")]
    InvalidUsername(#[from] shop_core::UsernameError),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] shop_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Username already registered.
    #[error("username already taken")]
    UsernameTaken,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Token is malformed, expired, of the wrong type, or for an unknown user.
    #[error("invalid token")]
    InvalidToken,

    /// Token could not be signed.
    #[error("token signing failed: {0}")]
    TokenSigning(#[from] jsonwebtoken::errors::Error),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
