//! Webhook signature verification and typed event parsing.
//!
//! Stripe signs the raw body with the endpoint secret using the
//! `t=<ts>,v1=<hex hmac>` scheme; the signed payload is `"{t}.{body}"`.
//! Events this service acts on are parsed into [`WebhookEvent`] with every
//! identifier required up front -- a fix payment without a fix id in its
//! metadata is a parse error, never a silent mismatch.

use hmac::{Hmac, Mac};
use patchdock_core::types::DbId;
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Errors from signature verification or event parsing.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Missing or malformed Stripe-Signature header")]
    MalformedSignatureHeader,

    #[error("Webhook signature mismatch")]
    SignatureMismatch,

    #[error("Unparseable webhook payload: {0}")]
    UnparseablePayload(String),

    /// A fix payment event arrived without the fix reference it must carry.
    #[error("Fix payment event without a fix_request_id in metadata")]
    MissingFixReference,
}

/// Verify the `Stripe-Signature` header against the raw request body.
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    endpoint_secret: &str,
) -> Result<(), EventError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(EventError::MalformedSignatureHeader)?;
    if signatures.is_empty() {
        return Err(EventError::MalformedSignatureHeader);
    }

    for signature in signatures {
        let Ok(expected) = hex::decode(signature) else {
            continue;
        };
        let mut mac = HmacSha256::new_from_slice(endpoint_secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }

    Err(EventError::SignatureMismatch)
}

/// Events this service acts on, with required identifiers resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    /// A fix charge completed. Drives the fix to `in_progress` and
    /// enqueues generation.
    FixPaymentSucceeded {
        fix_request_id: DbId,
        payment_intent_id: String,
        amount_cents: i64,
    },
    /// A hosting invoice settled. Recorded idempotently.
    InvoicePaid {
        invoice_id: String,
        customer_id: Option<String>,
        amount_cents: i64,
        description: Option<String>,
    },
    /// A hosting subscription ended; the project gets suspended.
    SubscriptionDeleted { customer_id: Option<String> },
    /// Anything else: acknowledged and ignored.
    Ignored { event_type: String },
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

/// Parse a verified webhook body into a typed event.
pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent, EventError> {
    let raw: RawEvent = serde_json::from_slice(payload)
        .map_err(|e| EventError::UnparseablePayload(e.to_string()))?;
    let object = &raw.data.object;

    match raw.event_type.as_str() {
        "payment_intent.succeeded" => {
            let metadata = &object["metadata"];
            if metadata["type"].as_str() != Some("fix") {
                return Ok(WebhookEvent::Ignored {
                    event_type: raw.event_type,
                });
            }

            let fix_request_id = metadata["fix_request_id"]
                .as_str()
                .and_then(|v| v.parse::<DbId>().ok())
                .ok_or(EventError::MissingFixReference)?;

            let payment_intent_id = object["id"]
                .as_str()
                .ok_or_else(|| {
                    EventError::UnparseablePayload("payment_intent without id".to_string())
                })?
                .to_string();

            Ok(WebhookEvent::FixPaymentSucceeded {
                fix_request_id,
                payment_intent_id,
                amount_cents: object["amount"].as_i64().unwrap_or(0),
            })
        }

        "invoice.paid" => {
            let invoice_id = object["id"]
                .as_str()
                .ok_or_else(|| EventError::UnparseablePayload("invoice without id".to_string()))?
                .to_string();

            Ok(WebhookEvent::InvoicePaid {
                invoice_id,
                customer_id: object["customer"].as_str().map(str::to_string),
                amount_cents: object["amount_paid"].as_i64().unwrap_or(0),
                description: object["description"].as_str().map(str::to_string),
            })
        }

        "customer.subscription.deleted" => Ok(WebhookEvent::SubscriptionDeleted {
            customer_id: object["customer"].as_str().map(str::to_string),
        }),

        _ => Ok(WebhookEvent::Ignored {
            event_type: raw.event_type,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    /// Build a valid `Stripe-Signature` header for a payload.
    fn sign(payload: &[u8], timestamp: &str, secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_correctly_signed_payload() {
        let payload = br#"{"type":"invoice.paid","data":{"object":{"id":"in_1"}}}"#;
        let header = sign(payload, "1712000000", SECRET);
        assert!(verify_signature(payload, &header, SECRET).is_ok());
    }

    #[test]
    fn rejects_tampered_payload() {
        let payload = br#"{"amount":300}"#;
        let header = sign(payload, "1712000000", SECRET);
        let tampered = br#"{"amount":9999}"#;
        assert!(matches!(
            verify_signature(tampered, &header, SECRET),
            Err(EventError::SignatureMismatch)
        ));
    }

    #[test]
    fn rejects_wrong_secret() {
        let payload = br#"{"amount":300}"#;
        let header = sign(payload, "1712000000", "whsec_other");
        assert!(matches!(
            verify_signature(payload, &header, SECRET),
            Err(EventError::SignatureMismatch)
        ));
    }

    #[test]
    fn rejects_header_without_timestamp() {
        assert!(matches!(
            verify_signature(b"{}", "v1=deadbeef", SECRET),
            Err(EventError::MalformedSignatureHeader)
        ));
    }

    #[test]
    fn parses_fix_payment_with_required_reference() {
        let payload = serde_json::json!({
            "type": "payment_intent.succeeded",
            "data": { "object": {
                "id": "pi_42",
                "amount": 300,
                "metadata": { "type": "fix", "fix_request_id": "17" },
            }},
        });
        let event = parse_event(payload.to_string().as_bytes()).unwrap();
        assert_eq!(
            event,
            WebhookEvent::FixPaymentSucceeded {
                fix_request_id: 17,
                payment_intent_id: "pi_42".to_string(),
                amount_cents: 300,
            }
        );
    }

    #[test]
    fn fix_payment_without_fix_id_is_an_error() {
        let payload = serde_json::json!({
            "type": "payment_intent.succeeded",
            "data": { "object": {
                "id": "pi_42",
                "amount": 300,
                "metadata": { "type": "fix" },
            }},
        });
        assert!(matches!(
            parse_event(payload.to_string().as_bytes()),
            Err(EventError::MissingFixReference)
        ));
    }

    #[test]
    fn non_fix_payment_intent_is_ignored() {
        let payload = serde_json::json!({
            "type": "payment_intent.succeeded",
            "data": { "object": {
                "id": "pi_42",
                "amount": 300,
                "metadata": { "type": "hosting" },
            }},
        });
        assert!(matches!(
            parse_event(payload.to_string().as_bytes()).unwrap(),
            WebhookEvent::Ignored { .. }
        ));
    }

    #[test]
    fn unknown_event_types_are_ignored() {
        let payload = serde_json::json!({
            "type": "charge.refunded",
            "data": { "object": {} },
        });
        assert!(matches!(
            parse_event(payload.to_string().as_bytes()).unwrap(),
            WebhookEvent::Ignored { .. }
        ));
    }
}
