//! Bearer token authentication extractor.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::db::UserRepository;
use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::services::auth::TokenType;
use crate::state::AppState;

/// Detail returned when no credentials were sent.
pub const MISSING_CREDENTIALS_DETAIL: &str = "Authentication credentials were not provided.";

/// Detail returned when the token does not verify.
pub const INVALID_TOKEN_DETAIL: &str = "Given token not valid";

/// Extractor that requires a valid access token.
///
/// Reads `Authorization: Bearer <access token>`, verifies it, and loads the
/// user. Rejects with 401 otherwise.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub User);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized(MISSING_CREDENTIALS_DETAIL.to_string()))?;

        let user_id = state
            .tokens()
            .verify(token, TokenType::Access)
            .map_err(|_| AppError::Unauthorized(INVALID_TOKEN_DETAIL.to_string()))?;

        let user = UserRepository::new(state.pool())
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

        set_sentry_user(&user.id, Some(user.username.as_str()));

        Ok(Self(user))
    }
}

/// Extract the token from an `Authorization: Bearer` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/shop/cart/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts_with(Some("bearer  xyz "))), Some("xyz"));
    }

    #[test]
    fn test_bearer_token_missing_or_wrong_scheme() {
        assert_eq!(bearer_token(&parts_with(None)), None);
        assert_eq!(bearer_token(&parts_with(Some("Basic dXNlcjpwYXNz"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer   "))), None);
    }
}
