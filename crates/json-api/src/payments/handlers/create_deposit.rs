//! Create Deposit Request Handler

use std::sync::Arc;

use salvo::{
    oapi::{
        ToSchema,
        extract::{JsonBody, PathParam},
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    extensions::*,
    payments::{errors::into_status_error, handlers::PaymentRequestResponse},
    state::State,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub(crate) struct CreateDepositRequest {
    /// Amount in minor units; the booking's deposit when omitted
    pub amount: Option<u64>,
}

/// Create Deposit Request Handler
///
/// Opens a gateway checkout for the deposit of a booking awaiting payment.
#[endpoint(
    tags("payments"),
    summary = "Request the deposit",
    responses(
        (status_code = StatusCode::OK, description = "Checkout opened"),
        (status_code = StatusCode::NOT_FOUND, description = "Booking not found"),
        (status_code = StatusCode::CONFLICT, description = "Booking not awaiting payment or provider not onboarded"),
        (status_code = StatusCode::BAD_GATEWAY, description = "Gateway unavailable"),
    ),
)]
pub(crate) async fn handler(
    booking: PathParam<Uuid>,
    json: JsonBody<CreateDepositRequest>,
    depot: &mut Depot,
) -> Result<Json<PaymentRequestResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let request = state
        .app
        .payments
        .create_deposit_request(booking.into_inner().into(), json.into_inner().amount)
        .await
        .map_err(into_status_error)?;

    Ok(Json(request.into()))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::json;
    use testresult::TestResult;

    use atelier_app::domain::{
        bookings::{records::BookingUuid, status::TransitionError},
        payments::{
            PaymentsServiceError, data::PaymentRequest, gateway::GatewayError,
            records::PaymentUuid,
        },
    };

    use crate::test_helpers::{Mocks, make_service};

    use super::*;

    fn service(mocks: Mocks) -> Service {
        make_service(
            mocks,
            Router::with_path("bookings/{booking}/deposit").post(handler),
        )
    }

    #[tokio::test]
    async fn test_deposit_request_returns_checkout() -> TestResult {
        let booking = BookingUuid::new();
        let payment_uuid = PaymentUuid::new();

        let mut mocks = Mocks::default();

        mocks
            .payments
            .expect_create_deposit_request()
            .once()
            .withf(move |b, amount| *b == booking && *amount == Some(5_000))
            .return_once(move |_, _| {
                Ok(PaymentRequest {
                    payment_uuid,
                    url: "https://checkout.example/cs_1".to_string(),
                    amount: 5_000,
                })
            });

        let mut res = TestClient::post(format!("http://example.com/bookings/{booking}/deposit"))
            .json(&json!({ "amount": 5000 }))
            .send(&service(mocks))
            .await;

        let body: PaymentRequestResponse = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(body.payment_uuid, payment_uuid.into_uuid());
        assert_eq!(body.url, "https://checkout.example/cs_1");

        Ok(())
    }

    #[tokio::test]
    async fn test_empty_body_uses_booking_deposit() -> TestResult {
        let booking = BookingUuid::new();

        let mut mocks = Mocks::default();

        mocks
            .payments
            .expect_create_deposit_request()
            .once()
            .withf(|_, amount| amount.is_none())
            .return_once(|_, _| {
                Ok(PaymentRequest {
                    payment_uuid: PaymentUuid::new(),
                    url: "https://checkout.example/cs_2".to_string(),
                    amount: 6_000,
                })
            });

        let res = TestClient::post(format!("http://example.com/bookings/{booking}/deposit"))
            .json(&json!({}))
            .send(&service(mocks))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        Ok(())
    }

    #[tokio::test]
    async fn test_not_onboarded_provider_returns_409() -> TestResult {
        let mut mocks = Mocks::default();

        mocks
            .payments
            .expect_create_deposit_request()
            .once()
            .return_once(|_, _| Err(PaymentsServiceError::GatewayConfig));

        let res = TestClient::post(format!(
            "http://example.com/bookings/{}/deposit",
            BookingUuid::new()
        ))
        .json(&json!({}))
        .send(&service(mocks))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::CONFLICT));

        Ok(())
    }

    #[tokio::test]
    async fn test_confirmed_booking_returns_409() -> TestResult {
        let mut mocks = Mocks::default();

        mocks
            .payments
            .expect_create_deposit_request()
            .once()
            .return_once(|_, _| {
                Err(PaymentsServiceError::InvalidTransition(
                    TransitionError::AlreadyConfirmed,
                ))
            });

        let res = TestClient::post(format!(
            "http://example.com/bookings/{}/deposit",
            BookingUuid::new()
        ))
        .json(&json!({}))
        .send(&service(mocks))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::CONFLICT));

        Ok(())
    }

    #[tokio::test]
    async fn test_gateway_failure_returns_502() -> TestResult {
        let mut mocks = Mocks::default();

        mocks
            .payments
            .expect_create_deposit_request()
            .once()
            .return_once(|_, _| {
                Err(PaymentsServiceError::GatewayCall(
                    GatewayError::UnexpectedResponse("upstream timeout".to_string()),
                ))
            });

        let res = TestClient::post(format!(
            "http://example.com/bookings/{}/deposit",
            BookingUuid::new()
        ))
        .json(&json!({}))
        .send(&service(mocks))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_GATEWAY));

        Ok(())
    }
}
