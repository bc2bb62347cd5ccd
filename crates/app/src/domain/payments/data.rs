//! Payments Data

use jiff::Timestamp;

use crate::domain::{
    bookings::records::{BookingRecord, BookingUuid},
    payments::records::{PaymentKind, PaymentMethod, PaymentRecord, PaymentStatus, PaymentUuid},
    providers::records::ProviderUuid,
};

/// A hosted checkout the client can be sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub payment_uuid: PaymentUuid,
    pub url: String,
    pub amount: u64,
}

/// Methods a provider can record by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualMethod {
    Cash,
    Transfer,
}

impl From<ManualMethod> for PaymentMethod {
    fn from(method: ManualMethod) -> Self {
        match method {
            ManualMethod::Cash => Self::Cash,
            ManualMethod::Transfer => Self::Transfer,
        }
    }
}

/// Money received outside the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualPayment {
    pub amount: u64,
    pub kind: PaymentKind,
    pub method: ManualMethod,
}

/// A gateway notification that a payment went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementEvent {
    pub event_id: String,
    pub intent_id: String,
    /// Our payment id, when the gateway echoed it back in metadata.
    pub payment_uuid: Option<PaymentUuid>,
}

/// A payment that just became settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledPayment {
    pub payment: PaymentRecord,
    /// The booking that moved to `Confirmed` as a result, if any.
    pub confirmed: Option<BookingRecord>,
}

/// What reconciling a gateway event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Settled(SettledPayment),
    SubscriptionUpdated,
    AlreadyProcessed,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NewPayment {
    pub uuid: PaymentUuid,
    pub booking_uuid: BookingUuid,
    pub provider_uuid: ProviderUuid,
    pub amount: u64,
    pub kind: PaymentKind,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub gateway_session_id: Option<String>,
    pub checkout_url: Option<String>,
    pub settled_at: Option<Timestamp>,
}
