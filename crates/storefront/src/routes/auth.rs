//! Authentication route handlers.
//!
//! Tokens are stateless JWTs, so logging out only tells the client to drop
//! them.

use axum::{Json, body::Bytes, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use shop_core::UserId;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::User;
use crate::services::auth::AuthService;
use crate::state::AppState;

use super::json_body;

/// Public view of a user.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.to_string(),
            email: user.email_str().to_string(),
        }
    }
}

/// Response for signup and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserView,
    pub access: String,
    pub refresh: String,
}

/// Signup request body.
#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login request body.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Token refresh request body.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: String,
}

/// Register a new account.
#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let form: SignupRequest = json_body(&body)?;

    let (user, tokens) = AuthService::new(state.pool(), state.tokens())
        .signup(&form.username, &form.email, &form.password)
        .await?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: UserView::from(&user),
            access: tokens.access,
            refresh: tokens.refresh,
        }),
    ))
}

/// Log in with username and password.
#[instrument(skip_all)]
pub async fn login(State(state): State<AppState>, body: Bytes) -> Result<Json<AuthResponse>> {
    let form: LoginRequest = json_body(&body)?;

    let (user, tokens) = AuthService::new(state.pool(), state.tokens())
        .login(&form.username, &form.password)
        .await?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        user: UserView::from(&user),
        access: tokens.access,
        refresh: tokens.refresh,
    }))
}

/// Exchange a refresh token for a new access token.
#[instrument(skip_all)]
pub async fn refresh(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>> {
    let form: RefreshRequest = json_body(&body)?;

    if form.refresh.trim().is_empty() {
        return Err(AppError::BadRequest("refresh: This field is required.".to_string()));
    }

    let access = AuthService::new(state.pool(), state.tokens())
        .refresh(form.refresh.trim())
        .await?;

    Ok(Json(json!({ "access": access })))
}

/// Log out. The client discards its tokens.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn logout(RequireAuth(user): RequireAuth) -> Json<Value> {
    tracing::info!("User logged out");
    Json(json!({ "detail": "logged out" }))
}

/// The authenticated user's profile.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn profile(RequireAuth(user): RequireAuth) -> Json<UserView> {
    Json(UserView::from(&user))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use shop_core::{Email, Username};

    use super::*;

    #[test]
    fn test_user_view_blank_email() {
        let user = User {
            id: UserId::new(1),
            username: Username::parse("bob").unwrap(),
            email: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(UserView::from(&user)).unwrap();
        assert_eq!(json, json!({ "id": 1, "username": "bob", "email": "" }));
    }

    #[test]
    fn test_user_view_with_email() {
        let user = User {
            id: UserId::new(2),
            username: Username::parse("carol").unwrap(),
            email: Some(Email::parse("carol@example.com").unwrap()),
            created_at: Utc::now(),
        };
        assert_eq!(UserView::from(&user).email, "carol@example.com");
    }

    #[test]
    fn test_signup_request_missing_fields_default_to_blank() {
        let form: SignupRequest = serde_json::from_str(r#"{"username":"dave"}"#).unwrap();
        assert_eq!(form.username, "dave");
        assert!(form.email.is_empty());
        assert!(form.password.is_empty());
    }
}
