//! Card payments through Stripe.
//!
//! Starting a payment creates a payment intent and stores its id on the
//! order; starting again hands back the stored intent while Stripe still
//! accepts it. Stripe later reports the outcome through the webhook, which
//! moves the order's payment status to `Paid` or `Failed`.

use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use shop_core::{Money, OrderId, UserId};

use crate::db::orders::PaymentUpdate;
use crate::db::{OrderRepository, RepositoryError};
use crate::models::Order;
use crate::stripe::{PaymentIntent, StripeClient, StripeError, WebhookEvent, webhook};

/// Errors that can occur while handling payments.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Stripe keys are not configured.
    #[error("payments are not configured")]
    NotConfigured,

    /// No such order for this user.
    #[error("order not found")]
    OrderNotFound,

    /// The order cannot be paid by card.
    #[error("{0}")]
    NotPayable(&'static str),

    /// Stripe call or webhook verification failed.
    #[error(transparent)]
    Stripe(#[from] StripeError),

    /// Repository/database error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// What the client needs to confirm a card payment.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentSession {
    pub client_secret: String,
    pub payment_intent_id: String,
}

/// Create a payment intent for one of the user's Stripe orders.
///
/// # Errors
///
/// Returns `PaymentError::NotConfigured` without a Stripe client,
/// `PaymentError::OrderNotFound` for unknown or foreign orders,
/// `PaymentError::NotPayable` for COD or already-paid orders, and
/// `PaymentError::Stripe` if the intent cannot be created.
#[instrument(skip(pool, stripe))]
pub async fn start_card_payment(
    pool: &PgPool,
    stripe: Option<&StripeClient>,
    user_id: UserId,
    order_id: OrderId,
) -> Result<PaymentSession, PaymentError> {
    let stripe = stripe.ok_or(PaymentError::NotConfigured)?;
    let orders = OrderRepository::new(pool);

    let order = orders
        .get_for_user(user_id, order_id)
        .await?
        .ok_or(PaymentError::OrderNotFound)?;

    if !order.payment_status.is_payable() {
        return Err(PaymentError::NotPayable("Order already paid"));
    }
    if !order.accepts_card_payment() {
        return Err(PaymentError::NotPayable("Order is not a Stripe order"));
    }

    if let Some(session) = stored_session(stripe, &order).await? {
        tracing::info!(order_id = %order.id, payment_intent = %session.payment_intent_id, "Reusing payment intent");
        return Ok(session);
    }

    let intent = stripe
        .create_payment_intent(order.id, order.total_amount)
        .await?;
    let session = session_for(&intent, order.total_amount).ok_or_else(|| {
        StripeError::Response("payment intent has no client_secret".to_string())
    })?;

    orders.set_payment_intent(order.id, &intent.id).await?;

    tracing::info!(order_id = %order.id, payment_intent = %intent.id, "Payment intent attached");

    Ok(session)
}

/// The session of the intent already stored on the order, if it can still be paid.
async fn stored_session(
    stripe: &StripeClient,
    order: &Order,
) -> Result<Option<PaymentSession>, StripeError> {
    let Some(intent_id) = order.stripe_payment_intent.as_deref() else {
        return Ok(None);
    };

    match stripe.retrieve_payment_intent(intent_id).await {
        Ok(intent) => Ok(session_for(&intent, order.total_amount)),
        Err(StripeError::Api { status: 404, .. }) => {
            tracing::warn!(order_id = %order.id, payment_intent = intent_id, "Stored payment intent is unknown to Stripe");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Client session for an intent that charges `total` and is still open.
fn session_for(intent: &PaymentIntent, total: Money) -> Option<PaymentSession> {
    if intent.is_canceled() {
        return None;
    }
    if intent.amount.is_some() && intent.amount != total.to_minor_units() {
        return None;
    }

    Some(PaymentSession {
        client_secret: intent.client_secret.clone()?,
        payment_intent_id: intent.id.clone(),
    })
}

/// Verify and decode a webhook delivery.
///
/// # Errors
///
/// Returns `PaymentError::NotConfigured` without a Stripe client and
/// `PaymentError::Stripe` if the signature or payload is invalid.
pub fn verify_webhook(
    stripe: Option<&StripeClient>,
    payload: &[u8],
    signature: Option<&str>,
    now: i64,
) -> Result<WebhookEvent, PaymentError> {
    let stripe = stripe.ok_or(PaymentError::NotConfigured)?;
    let signature = signature
        .ok_or_else(|| StripeError::InvalidSignature("Missing Stripe-Signature header".to_string()))?;

    webhook::verify_signature(payload, signature, stripe.webhook_secret(), now)?;
    Ok(webhook::parse_event(payload)?)
}

/// Apply a verified event to the referenced order.
///
/// Events that reference no known order, and event types the shop does not
/// track, leave the database untouched.
///
/// # Errors
///
/// Returns `PaymentError::Repository` if the update fails.
#[instrument(skip(pool, event))]
pub async fn apply_webhook_event(
    pool: &PgPool,
    event: &WebhookEvent,
) -> Result<Option<PaymentUpdate>, PaymentError> {
    let orders = OrderRepository::new(pool);

    let (intent, succeeded) = match event {
        WebhookEvent::PaymentSucceeded(intent) => (intent, true),
        WebhookEvent::PaymentFailed(intent) => (intent, false),
        WebhookEvent::Other(kind) => {
            tracing::debug!(event_type = %kind, "Ignoring Stripe event");
            return Ok(None);
        }
    };

    let Some(order_id) = intent_order(intent) else {
        return Ok(None);
    };

    let update = if succeeded {
        let amount = intent.amount.map(Money::from_minor_units);
        orders.mark_paid(order_id, &intent.id, amount).await?
    } else {
        orders.mark_failed(order_id, &intent.id).await?
    };

    tracing::info!(
        order_id = %order_id,
        payment_intent = %intent.id,
        succeeded,
        update = ?update,
        "Stripe event applied"
    );

    Ok(Some(update))
}

fn intent_order(intent: &PaymentIntent) -> Option<OrderId> {
    let order_id = intent.order_id();
    if order_id.is_none() {
        tracing::warn!(payment_intent = %intent.id, "Payment intent without order metadata");
    }
    order_id
}
