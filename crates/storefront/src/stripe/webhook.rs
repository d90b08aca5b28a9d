//! Webhook signature verification and event decoding.
//!
//! The `Stripe-Signature` header has the form `t=<unix ts>,v1=<hex>[,v1=<hex>...]`.
//! Each `v1` is an HMAC-SHA256 over `"{t}.{raw body}"` keyed with the
//! endpoint secret; any one of them matching is sufficient.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::debug;

use super::error::StripeError;
use super::types::{PaymentIntent, RawEvent, WebhookEvent};

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Maximum age of a signed delivery, in seconds.
pub const TOLERANCE_SECS: i64 = 300;

/// Verify a delivery's signature against the endpoint secret.
///
/// `now` is the current unix time in seconds.
///
/// # Errors
///
/// Returns `StripeError::InvalidSignature` if the header is malformed, the
/// timestamp is outside the tolerance, or no signature matches.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &SecretString,
    now: i64,
) -> Result<(), StripeError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| StripeError::InvalidSignature("Missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(StripeError::InvalidSignature(
            "No v1 signature".to_string(),
        ));
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| StripeError::InvalidSignature("Invalid timestamp".to_string()))?;

    if now.abs_diff(ts) > TOLERANCE_SECS.unsigned_abs() {
        return Err(StripeError::InvalidSignature(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    let expected = sign(payload, timestamp, secret)?;

    if !signatures
        .iter()
        .any(|candidate| constant_time_compare(&expected, candidate))
    {
        return Err(StripeError::InvalidSignature(
            "Signature mismatch".to_string(),
        ));
    }

    debug!("Stripe signature verified");

    Ok(())
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`.
fn sign(payload: &[u8], timestamp: &str, secret: &SecretString) -> Result<String, StripeError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|e| StripeError::InvalidSignature(e.to_string()))?;

    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Decode a verified payload into an event.
///
/// # Errors
///
/// Returns `StripeError::InvalidPayload` if the body is not a Stripe event,
/// or if a payment intent event does not carry a payment intent.
pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent, StripeError> {
    let event: RawEvent =
        serde_json::from_slice(payload).map_err(|e| StripeError::InvalidPayload(e.to_string()))?;

    debug!(event_id = %event.id, event_type = %event.event_type, "Stripe event received");

    let intent = |object: serde_json::Value| {
        serde_json::from_value::<PaymentIntent>(object)
            .map_err(|e| StripeError::InvalidPayload(e.to_string()))
    };

    match event.event_type.as_str() {
        "payment_intent.succeeded" => Ok(WebhookEvent::PaymentSucceeded(intent(event.data.object)?)),
        "payment_intent.payment_failed" => Ok(WebhookEvent::PaymentFailed(intent(event.data.object)?)),
        _ => Ok(WebhookEvent::Other(event.event_type.clone())),
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shop_core::OrderId;

    use super::*;

    const NOW: i64 = 1_760_000_000;

    fn secret() -> SecretString {
        SecretString::from("whsec_test_endpoint_key")
    }

    fn header_for(payload: &[u8], ts: i64) -> String {
        format!("t={ts},v1={}", sign(payload, &ts.to_string(), &secret()).unwrap())
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "ab"));
    }

    #[test]
    fn test_signature_verification_valid() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = header_for(payload, NOW);
        assert!(verify_signature(payload, &header, &secret(), NOW).is_ok());
    }

    #[test]
    fn test_signature_verification_any_v1_matches() {
        let payload = br#"{"id":"evt_1"}"#;
        let good = sign(payload, &NOW.to_string(), &secret()).unwrap();
        let header = format!("t={NOW},v1={},v0=legacy,v1={good}", "0".repeat(64));
        assert!(verify_signature(payload, &header, &secret(), NOW).is_ok());
    }

    #[test]
    fn test_signature_verification_tampered_body() {
        let header = header_for(br#"{"id":"evt_1"}"#, NOW);
        let result = verify_signature(br#"{"id":"evt_2"}"#, &header, &secret(), NOW);
        assert!(matches!(result, Err(StripeError::InvalidSignature(_))));
    }

    #[test]
    fn test_signature_verification_wrong_secret() {
        let payload = b"{}";
        let header = header_for(payload, NOW);
        let other = SecretString::from("whsec_someone_else");
        assert!(verify_signature(payload, &header, &other, NOW).is_err());
    }

    #[test]
    fn test_signature_verification_old_timestamp() {
        let payload = b"{}";
        let header = header_for(payload, NOW - TOLERANCE_SECS - 1);
        assert!(verify_signature(payload, &header, &secret(), NOW).is_err());

        let header = header_for(payload, NOW - TOLERANCE_SECS);
        assert!(verify_signature(payload, &header, &secret(), NOW).is_ok());
    }

    #[test]
    fn test_signature_verification_malformed_header() {
        for header in [
            "",
            "v1=abc",
            "t=123",
            "t=abc,v1=00",
            "garbage",
            "t=-9223372036854775808,v1=00",
            "t=9223372036854775807,v1=00",
        ] {
            assert!(
                verify_signature(b"{}", header, &secret(), NOW).is_err(),
                "{header} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_succeeded_event() {
        let payload = br#"{
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": {"object": {"id": "pi_123", "object": "payment_intent", "metadata": {"order_id": "42"}}}
        }"#;

        match parse_event(payload).unwrap() {
            WebhookEvent::PaymentSucceeded(intent) => {
                assert_eq!(intent.id, "pi_123");
                assert_eq!(intent.order_id(), Some(OrderId::new(42)));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_parse_failed_event_without_metadata() {
        let payload = br#"{
            "id": "evt_2",
            "type": "payment_intent.payment_failed",
            "data": {"object": {"id": "pi_9"}}
        }"#;

        match parse_event(payload).unwrap() {
            WebhookEvent::PaymentFailed(intent) => assert_eq!(intent.order_id(), None),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_parse_other_event() {
        let payload = br#"{"id": "evt_3", "type": "charge.refunded", "data": {"object": {}}}"#;
        assert!(matches!(
            parse_event(payload).unwrap(),
            WebhookEvent::Other(kind) if kind == "charge.refunded"
        ));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_event(b"not json"),
            Err(StripeError::InvalidPayload(_))
        ));
    }
}
