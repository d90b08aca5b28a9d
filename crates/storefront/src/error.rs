//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//! Error bodies are always `{"detail": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::checkout::CheckoutError;
use crate::services::payments::PaymentError;
use crate::stripe::StripeError;

/// Detail message for missing resources.
pub const NOT_FOUND_DETAIL: &str = "Not found.";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Payment operation failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// A 404 with the standard detail message.
    #[must_use]
    pub fn not_found() -> Self {
        Self::NotFound(NOT_FOUND_DETAIL.to_string())
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::MissingCredentials
                | AuthError::InvalidUsername(_)
                | AuthError::InvalidEmail(_)
                | AuthError::UsernameTaken
                | AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                AuthError::TokenSigning(_) | AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Checkout(err) => match err {
                CheckoutError::NoCart => StatusCode::NOT_FOUND,
                CheckoutError::EmptyCart
                | CheckoutError::AddressTooLong
                | CheckoutError::TotalTooLarge => StatusCode::BAD_REQUEST,
                CheckoutError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Payment(err) => match err {
                PaymentError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                PaymentError::OrderNotFound => StatusCode::NOT_FOUND,
                PaymentError::NotPayable(_)
                | PaymentError::Stripe(
                    StripeError::InvalidSignature(_) | StripeError::InvalidPayload(_),
                ) => StatusCode::BAD_REQUEST,
                PaymentError::Stripe(_) => StatusCode::BAD_GATEWAY,
                PaymentError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Client-facing message. Internal details are never exposed.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => NOT_FOUND_DETAIL.to_string(),
            Self::Database(RepositoryError::Conflict(msg)) => msg.clone(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Auth(err) => match err {
                AuthError::MissingCredentials => "Username & password required".to_string(),
                AuthError::UsernameTaken => "Username already taken".to_string(),
                AuthError::InvalidUsername(e) => capitalize(&e.to_string()),
                AuthError::InvalidEmail(_) => "Enter a valid email address.".to_string(),
                AuthError::WeakPassword(msg) => capitalize(msg),
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::InvalidToken => "Given token not valid".to_string(),
                AuthError::TokenSigning(_) | AuthError::Repository(_) | AuthError::PasswordHash => {
                    "Internal server error".to_string()
                }
            },
            Self::Checkout(err) => match err {
                CheckoutError::NoCart => "Cart not found".to_string(),
                CheckoutError::EmptyCart => "Cart empty".to_string(),
                CheckoutError::AddressTooLong | CheckoutError::TotalTooLarge => {
                    capitalize(&err.to_string())
                }
                CheckoutError::Repository(_) => "Internal server error".to_string(),
            },
            Self::Payment(err) => match err {
                PaymentError::NotConfigured => "Payments are not configured".to_string(),
                PaymentError::OrderNotFound => NOT_FOUND_DETAIL.to_string(),
                PaymentError::NotPayable(msg) => (*msg).to_string(),
                PaymentError::Stripe(StripeError::InvalidSignature(_)) => {
                    "Invalid signature".to_string()
                }
                PaymentError::Stripe(StripeError::InvalidPayload(_)) => {
                    "Invalid payload".to_string()
                }
                PaymentError::Stripe(_) => "Payment provider error".to_string(),
                PaymentError::Repository(_) => "Internal server error".to_string(),
            },
            Self::NotFound(msg) | Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::RateLimited => "Request was throttled.".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, username: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: username.map(String::from),
            ..Default::default()
        }));
    });
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
