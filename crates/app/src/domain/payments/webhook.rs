//! Gateway webhook verification and parsing.
//!
//! Signatures follow the `Stripe-Signature` scheme: `t=<unix seconds>,v1=<hex hmac>`
//! where the HMAC-SHA256 covers `"{t}.{body}"`.

use std::collections::HashMap;

use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use jiff::{SignedDuration, Timestamp};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use crate::domain::{
    payments::records::PaymentUuid,
    providers::records::{ProviderUuid, SubscriptionStatus},
};

type HmacSha256 = Hmac<Sha256>;

/// How far a signature timestamp may drift from the local clock.
pub const DEFAULT_TOLERANCE: SignedDuration = SignedDuration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature header is malformed")]
    Malformed,

    #[error("signature timestamp is outside the tolerance window")]
    Expired,

    #[error("signature does not match")]
    Mismatch,

    #[error("webhook secret is not a usable HMAC key")]
    InvalidSecret,
}

/// Check `header` against `payload` signed with `secret`.
///
/// # Errors
///
/// Returns an error when the header is malformed, too old, or matches no signature.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: Timestamp,
    tolerance: SignedDuration,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;

    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }

    let signed_at = Timestamp::from_second(timestamp).map_err(|_err| SignatureError::Malformed)?;

    if now.duration_since(signed_at).abs() > tolerance {
        return Err(SignatureError::Expired);
    }

    let expected = signature(payload, secret, timestamp)?;

    if signatures
        .iter()
        .any(|candidate| constant_time_eq(expected.as_bytes(), candidate.as_bytes()))
    {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`.
///
/// # Errors
///
/// Returns an error if `secret` cannot key the HMAC.
pub fn signature(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, SignatureError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .map_err(|_err| SignatureError::InvalidSecret)?;

    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    Ok(format!("{:x}", mac.finalize().into_bytes()))
}

/// A full `Stripe-Signature` header value for `payload`.
///
/// # Errors
///
/// Returns an error if `secret` cannot key the HMAC.
pub fn signature_header(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, SignatureError> {
    Ok(format!("t={timestamp},v1={}", signature(payload, secret, timestamp)?))
}

/// A verified gateway event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayEvent {
    pub id: String,
    pub kind: String,
    pub payload: GatewayEventPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEventPayload {
    /// `payment_intent.succeeded`
    PaymentSucceeded {
        intent_id: String,
        payment_uuid: Option<PaymentUuid>,
    },
    /// `checkout.session.completed` for a platform subscription.
    SubscriptionStarted {
        provider_uuid: Option<ProviderUuid>,
        customer_id: Option<String>,
        subscription_id: Option<String>,
    },
    /// `customer.subscription.updated` and `customer.subscription.deleted`
    SubscriptionChanged {
        subscription_id: String,
        customer_id: Option<String>,
        status: SubscriptionStatus,
    },
    /// Anything this service does not act on.
    Unhandled,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawPaymentIntent {
    id: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawCheckoutSession {
    mode: String,
    customer: Option<String>,
    subscription: Option<String>,
    client_reference_id: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawSubscription {
    id: String,
    customer: Option<String>,
    status: String,
}

/// Parse a verified webhook body.
///
/// # Errors
///
/// Returns an error when the body is not a well-formed event of a handled kind.
pub fn parse_event(payload: &[u8]) -> Result<GatewayEvent, serde_json::Error> {
    let raw: RawEvent = serde_json::from_slice(payload)?;

    let payload = match raw.kind.as_str() {
        "payment_intent.succeeded" => {
            let intent: RawPaymentIntent = serde_json::from_value(raw.data.object)?;

            GatewayEventPayload::PaymentSucceeded {
                payment_uuid: intent
                    .metadata
                    .get("payment_uuid")
                    .and_then(|value| value.parse().ok()),
                intent_id: intent.id,
            }
        }
        "checkout.session.completed" => {
            let session: RawCheckoutSession = serde_json::from_value(raw.data.object)?;

            if session.mode == "subscription" {
                GatewayEventPayload::SubscriptionStarted {
                    provider_uuid: session
                        .metadata
                        .get("provider_uuid")
                        .or(session.client_reference_id.as_ref())
                        .and_then(|value| value.parse().ok()),
                    customer_id: session.customer,
                    subscription_id: session.subscription,
                }
            } else {
                GatewayEventPayload::Unhandled
            }
        }
        "customer.subscription.updated" | "customer.subscription.deleted" => {
            let subscription: RawSubscription = serde_json::from_value(raw.data.object)?;

            let status = if raw.kind == "customer.subscription.deleted" {
                SubscriptionStatus::Canceled
            } else {
                SubscriptionStatus::from_gateway(&subscription.status)
            };

            GatewayEventPayload::SubscriptionChanged {
                subscription_id: subscription.id,
                customer_id: subscription.customer,
                status,
            }
        }
        _ => GatewayEventPayload::Unhandled,
    };

    Ok(GatewayEvent {
        id: raw.id,
        kind: raw.kind,
        payload,
    })
}
