//! Gateway Webhook Handler

use std::sync::Arc;

use jiff::Timestamp;
use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use atelier_app::domain::payments::{
    PaymentsServiceError,
    data::ReconcileOutcome,
    webhook::{DEFAULT_TOLERANCE, parse_event, verify_signature},
};

use crate::{extensions::*, observability::record_gateway_webhook, state::State};

pub(crate) const SIGNATURE_HEADER: &str = "stripe-signature";

/// Acknowledgement sent back to the gateway.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct WebhookAck {
    /// `processed`, `already_processed`, `ignored` or `rejected`
    pub status: String,
}

impl WebhookAck {
    fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
        }
    }
}

/// Gateway Webhook Handler
///
/// Verifies the signature over the raw body, then applies the event once. Redelivered
/// events are acknowledged without side effects.
#[endpoint(
    tags("webhooks"),
    summary = "Receive gateway events",
    responses(
        (status_code = StatusCode::OK, description = "Event acknowledged"),
        (status_code = StatusCode::BAD_REQUEST, description = "Bad signature or payload"),
    ),
)]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<WebhookAck>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let header = req
        .header::<String>(SIGNATURE_HEADER)
        .ok_or_else(|| StatusError::bad_request().brief("Missing signature header"))?;

    let payload = req
        .payload()
        .await
        .map_err(|_err| StatusError::bad_request().brief("Unreadable body"))?
        .clone();

    let verified = verify_signature(
        &payload,
        &header,
        &state.secrets.webhook,
        Timestamp::now(),
        DEFAULT_TOLERANCE,
    );

    if let Err(error) = verified {
        warn!("rejected gateway webhook: {error}");
        record_gateway_webhook("invalid_signature");

        return Err(StatusError::bad_request().brief("Invalid signature"));
    }

    let event = parse_event(&payload).map_err(|error| {
        warn!("unparseable gateway webhook: {error}");
        record_gateway_webhook("invalid_payload");

        StatusError::bad_request().brief("Invalid event payload")
    })?;

    let event_id = event.id.clone();
    let kind = event.kind.clone();

    let ack = match state.app.payments.apply_gateway_event(event).await {
        Ok(ReconcileOutcome::Settled(_) | ReconcileOutcome::SubscriptionUpdated) => {
            info!(%event_id, %kind, "applied gateway event");

            WebhookAck::new("processed")
        }
        Ok(ReconcileOutcome::AlreadyProcessed) => WebhookAck::new("already_processed"),
        Ok(ReconcileOutcome::Ignored) => WebhookAck::new("ignored"),
        Err(PaymentsServiceError::AmountExceedsBalance { remaining }) => {
            error!(
                %event_id,
                remaining, "gateway settlement exceeds the booking balance, needs manual review"
            );

            WebhookAck::new("rejected")
        }
        Err(error) => {
            error!(%event_id, %kind, "failed to apply gateway event: {error}");
            record_gateway_webhook("failed");

            return Err(StatusError::internal_server_error());
        }
    };

    record_gateway_webhook(&ack.status);

    Ok(Json(ack))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::json;
    use testresult::TestResult;

    use atelier_app::domain::{
        payments::webhook::{GatewayEventPayload, signature_header},
        providers::records::SubscriptionStatus,
    };

    use crate::test_helpers::{Mocks, TEST_WEBHOOK_SECRET, make_service};

    use super::*;

    fn service(mocks: Mocks) -> Service {
        make_service(mocks, Router::with_path("webhooks/gateway").post(handler))
    }

    fn succeeded_event() -> String {
        json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": { "object": { "id": "pi_1", "metadata": {} } }
        })
        .to_string()
    }

    fn subscription_event() -> String {
        json!({
            "id": "evt_sub",
            "type": "customer.subscription.updated",
            "data": { "object": { "id": "sub_1", "customer": "cus_1", "status": "past_due" } }
        })
        .to_string()
    }

    fn signed(body: &str) -> TestResult<String> {
        Ok(signature_header(
            body.as_bytes(),
            TEST_WEBHOOK_SECRET,
            Timestamp::now().as_second(),
        )?)
    }

    async fn post(mocks: Mocks, body: String, header: String) -> Response {
        TestClient::post("http://example.com/webhooks/gateway")
            .add_header(SIGNATURE_HEADER, header, true)
            .add_header("content-type", "application/json", true)
            .body(body)
            .send(&service(mocks))
            .await
    }

    #[tokio::test]
    async fn test_valid_event_is_applied() -> TestResult {
        let body = subscription_event();
        let header = signed(&body)?;

        let mut mocks = Mocks::default();

        mocks
            .payments
            .expect_apply_gateway_event()
            .once()
            .withf(|event| {
                event.id == "evt_sub"
                    && matches!(
                        &event.payload,
                        GatewayEventPayload::SubscriptionChanged {
                            status: SubscriptionStatus::PastDue,
                            ..
                        }
                    )
            })
            .return_once(|_| Ok(ReconcileOutcome::SubscriptionUpdated));

        let mut res = post(mocks, body, header).await;
        let ack: WebhookAck = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(ack.status, "processed");

        Ok(())
    }

    #[tokio::test]
    async fn test_redelivered_event_is_acknowledged() -> TestResult {
        let body = succeeded_event();
        let header = signed(&body)?;

        let mut mocks = Mocks::default();

        mocks
            .payments
            .expect_apply_gateway_event()
            .once()
            .withf(|event| {
                matches!(
                    &event.payload,
                    GatewayEventPayload::PaymentSucceeded { intent_id, payment_uuid: None }
                        if intent_id == "pi_1"
                )
            })
            .return_once(|_| Ok(ReconcileOutcome::AlreadyProcessed));

        let mut res = post(mocks, body, header).await;
        let ack: WebhookAck = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(ack.status, "already_processed");

        Ok(())
    }

    #[tokio::test]
    async fn test_tampered_body_returns_400() -> TestResult {
        let header = signed(&succeeded_event())?;
        let tampered = succeeded_event().replace("pi_1", "pi_2");

        let mut mocks = Mocks::default();

        mocks.payments.expect_apply_gateway_event().never();

        let res = post(mocks, tampered, header).await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }

    #[tokio::test]
    async fn test_stale_signature_returns_400() -> TestResult {
        let body = succeeded_event();
        let stale = Timestamp::now().as_second() - 3_600;
        let header = signature_header(body.as_bytes(), TEST_WEBHOOK_SECRET, stale)?;

        let mut mocks = Mocks::default();

        mocks.payments.expect_apply_gateway_event().never();

        let res = post(mocks, body, header).await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_signature_returns_400() {
        let mut mocks = Mocks::default();

        mocks.payments.expect_apply_gateway_event().never();

        let res = TestClient::post("http://example.com/webhooks/gateway")
            .body(succeeded_event())
            .send(&service(mocks))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn test_overpaying_settlement_is_acknowledged_as_rejected() -> TestResult {
        let body = succeeded_event();
        let header = signed(&body)?;

        let mut mocks = Mocks::default();

        mocks
            .payments
            .expect_apply_gateway_event()
            .once()
            .return_once(|_| Err(PaymentsServiceError::AmountExceedsBalance { remaining: 0 }));

        let mut res = post(mocks, body, header).await;
        let ack: WebhookAck = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(ack.status, "rejected");

        Ok(())
    }

    #[tokio::test]
    async fn test_unexpected_failure_returns_500() -> TestResult {
        let body = succeeded_event();
        let header = signed(&body)?;

        let mut mocks = Mocks::default();

        mocks
            .payments
            .expect_apply_gateway_event()
            .once()
            .return_once(|_| Err(PaymentsServiceError::InvalidData));

        let res = post(mocks, body, header).await;

        assert_eq!(res.status_code, Some(StatusCode::INTERNAL_SERVER_ERROR));

        Ok(())
    }
}
