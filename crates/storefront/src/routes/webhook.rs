//! Stripe webhook endpoint.
//!
//! Only signature and payload problems are reported back to Stripe. Once an
//! event is verified it is acknowledged with 200 even if applying it fails,
//! so Stripe does not retry deliveries the shop cannot act on.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::Result;
use crate::services::payments;
use crate::state::AppState;
use crate::stripe::webhook::SIGNATURE_HEADER;

/// Receive a Stripe event.
#[instrument(skip_all)]
pub async fn stripe(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let event = payments::verify_webhook(
        state.stripe(),
        &body,
        signature,
        Utc::now().timestamp(),
    )?;

    match payments::apply_webhook_event(state.pool(), &event).await {
        Ok(update) => {
            tracing::debug!(?update, "Stripe event processed");
        }
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            tracing::error!(error = %e, sentry_event_id = %event_id, "Failed to apply Stripe event");
        }
    }

    Ok(Json(json!({ "received": true })))
}
