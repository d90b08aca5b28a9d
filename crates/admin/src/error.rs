//! Unified error handling for admin.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::import_export::ImportError;

/// Application-level error type for the admin console.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// CSV import or export failed as a whole.
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or wrong admin token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// A 404 with the standard detail message.
    #[must_use]
    pub fn not_found() -> Self {
        Self::NotFound("Not found.".to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Import(ImportError::Csv(_) | ImportError::MissingColumn(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Database(_) | Self::Import(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found.".to_string(),
            Self::Database(RepositoryError::Conflict(msg))
            | Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::BadRequest(msg) => msg.clone(),
            Self::Import(err @ (ImportError::Csv(_) | ImportError::MissingColumn(_))) => {
                err.to_string()
            }
            Self::Database(_) | Self::Import(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
