//! Payment gateway client.
//!
//! Speaks the Stripe Checkout API: one hosted checkout session per payment, with the
//! platform fee taken as an application fee and the rest transferred to the
//! provider's connected account.

use async_trait::async_trait;
use mockall::automock;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::{
    bookings::records::BookingUuid,
    payments::records::{PaymentKind, PaymentUuid},
};

/// Default Stripe API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Basis points in one whole.
const BASIS_POINTS: u64 = 10_000;

/// Configuration for connecting to the payment gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// API base URL, e.g. `"https://api.stripe.com"`.
    pub api_base: String,

    /// Secret API key.
    pub secret_key: String,

    /// Where the gateway sends the client after paying.
    pub success_url: String,

    /// Where the gateway sends the client after abandoning checkout.
    pub cancel_url: String,
}

/// Everything the gateway needs to open a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub payment_uuid: PaymentUuid,
    pub booking_uuid: BookingUuid,
    pub kind: PaymentKind,
    pub amount: u64,
    pub currency: String,
    pub description: String,
    pub customer_email: String,
    pub destination_account: String,
    pub application_fee: u64,
}

impl CheckoutRequest {
    fn form(&self) -> Vec<(&'static str, String)> {
        vec![
            ("mode", "payment".to_string()),
            ("client_reference_id", self.booking_uuid.to_string()),
            ("customer_email", self.customer_email.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", self.currency.clone()),
            ("line_items[0][price_data][unit_amount]", self.amount.to_string()),
            (
                "line_items[0][price_data][product_data][name]",
                self.description.clone(),
            ),
            ("metadata[payment_uuid]", self.payment_uuid.to_string()),
            ("metadata[booking_uuid]", self.booking_uuid.to_string()),
            ("metadata[kind]", self.kind.to_string()),
            (
                "payment_intent_data[application_fee_amount]",
                self.application_fee.to_string(),
            ),
            (
                "payment_intent_data[transfer_data][destination]",
                self.destination_account.clone(),
            ),
            (
                "payment_intent_data[metadata][payment_uuid]",
                self.payment_uuid.to_string(),
            ),
            (
                "payment_intent_data[metadata][booking_uuid]",
                self.booking_uuid.to_string(),
            ),
        ]
    }
}

/// A created checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Errors that can occur when communicating with the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// An HTTP transport or serialization error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway returned a non-2xx response or unexpected body.
    #[error("unexpected response from gateway: {0}")]
    UnexpectedResponse(String),
}

/// The platform's share of `amount` at `fee_basis_points`, rounded down.
pub fn application_fee(amount: u64, fee_basis_points: u32) -> u64 {
    amount.saturating_mul(u64::from(fee_basis_points)) / BASIS_POINTS
}

#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a hosted checkout for a single payment.
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError>;
}

/// HTTP client for the Stripe Checkout API.
#[derive(Debug, Clone)]
pub struct StripeGateway {
    config: GatewayConfig,
    http: Client,
}

impl StripeGateway {
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let url = format!(
            "{}/v1/checkout/sessions",
            self.config.api_base.trim_end_matches('/')
        );

        let mut form = request.form();
        form.push(("success_url", self.config.success_url.clone()));
        form.push(("cancel_url", self.config.cancel_url.clone()));

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.secret_key)
            .header("Idempotency-Key", request.payment_uuid.to_string())
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(GatewayError::UnexpectedResponse(format!(
                "checkout session request failed with status {status}: {text}"
            )));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_fee_rounds_down() {
        assert_eq!(application_fee(6_000, 500), 300);
        assert_eq!(application_fee(999, 250), 24);
        assert_eq!(application_fee(6_000, 0), 0);
    }

    #[test]
    fn form_routes_funds_to_the_connected_account() {
        let request = CheckoutRequest {
            payment_uuid: PaymentUuid::new(),
            booking_uuid: BookingUuid::new(),
            kind: PaymentKind::Deposit,
            amount: 6_000,
            currency: "eur".to_string(),
            description: "Deposit".to_string(),
            customer_email: "robin@example.com".to_string(),
            destination_account: "acct_123".to_string(),
            application_fee: 300,
        };

        let form = request.form();
        let value = |key: &str| {
            form.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.as_str())
        };

        assert_eq!(
            value("payment_intent_data[transfer_data][destination]"),
            Some("acct_123")
        );
        assert_eq!(value("payment_intent_data[application_fee_amount]"), Some("300"));
        assert_eq!(
            value("payment_intent_data[metadata][payment_uuid]"),
            Some(request.payment_uuid.to_string().as_str())
        );
    }
}
