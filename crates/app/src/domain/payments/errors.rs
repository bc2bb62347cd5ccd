//! Payments service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::domain::{
    Entity, bookings::BookingsServiceError, bookings::status::TransitionError,
    payments::gateway::GatewayError,
};

#[derive(Debug, Error)]
pub enum PaymentsServiceError {
    #[error("{0} not found")]
    NotFound(Entity),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("provider cannot take online payments yet")]
    GatewayConfig,

    #[error("payment gateway request failed")]
    GatewayCall(#[source] GatewayError),

    #[error("no balance due")]
    NoBalanceDue,

    #[error("a deposit checkout is still open for this booking")]
    DepositCheckoutOpen,

    #[error("amount exceeds the remaining balance of {remaining}")]
    AmountExceedsBalance { remaining: u64 },

    #[error("invalid data")]
    InvalidData,

    #[error("time calculation failed")]
    Time(#[from] jiff::Error),

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for PaymentsServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound(Entity::Booking);
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::NotNullViolation | ErrorKind::CheckViolation) => Self::InvalidData,
            Some(ErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}

impl From<BookingsServiceError> for PaymentsServiceError {
    fn from(error: BookingsServiceError) -> Self {
        match error {
            BookingsServiceError::NotFound(entity) => Self::NotFound(entity),
            BookingsServiceError::InvalidTransition(error) => Self::InvalidTransition(error),
            BookingsServiceError::Sql(error) => error.into(),
            BookingsServiceError::Time(error) => Self::Time(error),
            BookingsServiceError::Validation(_)
            | BookingsServiceError::SlotUnavailable(_)
            | BookingsServiceError::InvalidData => Self::InvalidData,
        }
    }
}
