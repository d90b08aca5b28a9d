//! Stripe REST API client.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, instrument};

use shop_core::{Money, OrderId};

use super::error::StripeError;
use super::types::{ApiErrorBody, ORDER_ID_METADATA_KEY, PaymentIntent};
use crate::config::StripeConfig;

/// Stripe API client for creating payment intents.
#[derive(Clone)]
pub struct StripeClient {
    /// HTTP client.
    client: Client,
    /// Secret API key.
    secret_key: SecretString,
    /// Webhook endpoint signing secret.
    webhook_secret: SecretString,
    /// Currency for new intents.
    currency: String,
    /// API base URL.
    api_base: String,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("secret_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("currency", &self.currency)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// Create a new Stripe client.
    #[must_use]
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: Client::new(),
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
            currency: config.currency.clone(),
            api_base: config.api_base.clone(),
        }
    }

    /// The webhook endpoint signing secret.
    #[must_use]
    pub const fn webhook_secret(&self) -> &SecretString {
        &self.webhook_secret
    }

    /// Create a payment intent for an order total.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::InvalidAmount` if the amount cannot be charged,
    /// `StripeError::Api` if Stripe rejects the request, and
    /// `StripeError::Request`/`StripeError::Response` on transport failures.
    #[instrument(skip(self), fields(currency = %self.currency))]
    pub async fn create_payment_intent(
        &self,
        order_id: OrderId,
        amount: Money,
    ) -> Result<PaymentIntent, StripeError> {
        let form = payment_intent_form(order_id, amount, &self.currency)?;

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(self.secret_key.expose_secret())
            .form(&form)
            .send()
            .await
            .map_err(|e| StripeError::Request(e.to_string()))?;

        read_intent(response, "creating").await
    }

    /// Fetch an existing payment intent.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Api` if Stripe rejects the request (404 for an
    /// unknown id), `StripeError::Request`/`StripeError::Response` on
    /// transport failures.
    #[instrument(skip(self))]
    pub async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, StripeError> {
        let response = self
            .client
            .get(format!("{}/v1/payment_intents/{id}", self.api_base))
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await
            .map_err(|e| StripeError::Request(e.to_string()))?;

        read_intent(response, "retrieving").await
    }
}

/// Decode a payment intent response, turning non-2xx replies into `StripeError::Api`.
async fn read_intent(
    response: reqwest::Response,
    action: &str,
) -> Result<PaymentIntent, StripeError> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .json::<ApiErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error.message)
            .unwrap_or_else(|| "Unknown error".to_string());
        error!(status = status.as_u16(), %message, action, "Stripe API error on payment intent");
        return Err(StripeError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let intent: PaymentIntent = response
        .json()
        .await
        .map_err(|e| StripeError::Response(e.to_string()))?;

    debug!(payment_intent = %intent.id, status = ?intent.status, action, "Payment intent response");

    Ok(intent)
}

/// Form fields for `POST /v1/payment_intents`.
fn payment_intent_form(
    order_id: OrderId,
    amount: Money,
    currency: &str,
) -> Result<Vec<(String, String)>, StripeError> {
    let minor_units = amount
        .to_minor_units()
        .filter(|units| *units > 0)
        .ok_or_else(|| StripeError::InvalidAmount(amount.to_string()))?;

    Ok(vec![
        ("amount".to_string(), minor_units.to_string()),
        ("currency".to_string(), currency.to_string()),
        (
            format!("metadata[{ORDER_ID_METADATA_KEY}]"),
            order_id.to_string(),
        ),
        (
            "automatic_payment_methods[enabled]".to_string(),
            "true".to_string(),
        ),
    ])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_intent_form_uses_minor_units() {
        let form = payment_intent_form(OrderId::new(12), "2499.50".parse().unwrap(), "inr").unwrap();
        assert!(form.contains(&("amount".to_string(), "249950".to_string())));
        assert!(form.contains(&("currency".to_string(), "inr".to_string())));
        assert!(form.contains(&("metadata[order_id]".to_string(), "12".to_string())));
        assert!(form.contains(&(
            "automatic_payment_methods[enabled]".to_string(),
            "true".to_string()
        )));
    }

    #[test]
    fn test_payment_intent_form_rejects_zero() {
        assert!(matches!(
            payment_intent_form(OrderId::new(1), Money::ZERO, "inr"),
            Err(StripeError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let client = StripeClient::new(&StripeConfig {
            secret_key: SecretString::from("sk_test_hidden_value"),
            webhook_secret: SecretString::from("whsec_hidden_value"),
            currency: "inr".to_string(),
            api_base: "https://api.stripe.com".to_string(),
        });
        let debug_output = format!("{client:?}");
        assert!(!debug_output.contains("sk_test_hidden_value"));
        assert!(!debug_output.contains("whsec_hidden_value"));
    }
}
