//! Record Manual Payment Handler

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

use atelier_app::domain::payments::{
    data::{ManualMethod, ManualPayment, SettledPayment},
    records::PaymentKind,
};

use crate::{extensions::*, payments::errors::into_status_error, state::State};

/// What part of the price the money covers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub(crate) enum PaymentKindRequest {
    Deposit,
    Balance,
    Total,
}

impl From<PaymentKindRequest> for PaymentKind {
    fn from(kind: PaymentKindRequest) -> Self {
        match kind {
            PaymentKindRequest::Deposit => PaymentKind::Deposit,
            PaymentKindRequest::Balance => PaymentKind::Balance,
            PaymentKindRequest::Total => PaymentKind::Total,
        }
    }
}

/// How the money was received.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ManualMethodRequest {
    Cash,
    Transfer,
}

impl From<ManualMethodRequest> for ManualMethod {
    fn from(method: ManualMethodRequest) -> Self {
        match method {
            ManualMethodRequest::Cash => ManualMethod::Cash,
            ManualMethodRequest::Transfer => ManualMethod::Transfer,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub(crate) struct RecordPaymentRequest {
    /// Amount received in minor units
    pub amount: u64,
    pub kind: PaymentKindRequest,
    pub method: ManualMethodRequest,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct RecordedPaymentResponse {
    pub payment_uuid: Uuid,
    pub amount: u64,

    /// `deposit`, `balance` or `total`
    pub kind: String,

    /// Whether this payment confirmed the booking
    pub booking_confirmed: bool,
}

impl From<SettledPayment> for RecordedPaymentResponse {
    fn from(settled: SettledPayment) -> Self {
        RecordedPaymentResponse {
            payment_uuid: settled.payment.uuid.into(),
            amount: settled.payment.amount,
            kind: settled.payment.kind.to_string(),
            booking_confirmed: settled.confirmed.is_some(),
        }
    }
}

/// Record Manual Payment Handler
///
/// Records cash or a bank transfer taken by the studio. A deposit confirms a booking
/// that is still awaiting payment.
#[endpoint(
    tags("internal"),
    summary = "Record a manual payment",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::CREATED, description = "Payment recorded"),
        (status_code = StatusCode::NOT_FOUND, description = "Booking not found"),
        (status_code = StatusCode::CONFLICT, description = "Booking cancelled"),
        (status_code = StatusCode::UNPROCESSABLE_ENTITY, description = "Amount rejected"),
    ),
)]
pub(crate) async fn handler(
    booking: PathParam<Uuid>,
    json: JsonBody<RecordPaymentRequest>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<RecordedPaymentResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;
    let request = json.into_inner();

    let settled = state
        .app
        .payments
        .record_manual_payment(
            booking.into_inner().into(),
            ManualPayment {
                amount: request.amount,
                kind: request.kind.into(),
                method: request.method.into(),
            },
        )
        .await
        .map_err(into_status_error)?;

    res.status_code(StatusCode::CREATED);

    Ok(Json(settled.into()))
}
