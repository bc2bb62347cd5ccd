//! Payment Handlers

pub(crate) mod balance;
pub(crate) mod create_balance;
pub(crate) mod create_deposit;

use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atelier_app::domain::payments::data::PaymentRequest;

/// A hosted checkout to send the client to.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct PaymentRequestResponse {
    pub payment_uuid: Uuid,

    /// Gateway checkout URL
    pub url: String,

    /// Amount requested in minor units
    pub amount: u64,
}

impl From<PaymentRequest> for PaymentRequestResponse {
    fn from(request: PaymentRequest) -> Self {
        PaymentRequestResponse {
            payment_uuid: request.payment_uuid.into(),
            url: request.url,
            amount: request.amount,
        }
    }
}
