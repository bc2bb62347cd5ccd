//! Bookings service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::{
    database,
    domain::{
        Entity,
        availability::{
            schedule::ScheduleError,
            slots::{RangeCheckError, SlotConflict, UnavailableReason},
        },
        bookings::{status::TransitionError, validation::ValidationError},
    },
};

#[derive(Debug, Error)]
pub enum BookingsServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} not found")]
    NotFound(Entity),

    #[error("slot unavailable: {0}")]
    SlotUnavailable(SlotConflict),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("invalid data")]
    InvalidData,

    #[error("time calculation failed")]
    Time(#[from] jiff::Error),

    #[error("storage error")]
    Sql(#[source] Error),
}

impl BookingsServiceError {
    /// Whether the failed transaction lost a serialization race and may be retried.
    pub(crate) fn is_retryable(&self) -> bool {
        matches!(self, Self::Sql(error) if database::is_retryable(error))
    }
}

impl From<Error> for BookingsServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound(Entity::Booking);
        }

        if database::is_exclusion_violation(&error) {
            return Self::SlotUnavailable(SlotConflict {
                reason: UnavailableReason::Overlap,
                conflict: None,
            });
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::NotNullViolation | ErrorKind::CheckViolation) => Self::InvalidData,
            Some(ErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}

impl From<RangeCheckError> for BookingsServiceError {
    fn from(error: RangeCheckError) -> Self {
        match error {
            RangeCheckError::Unavailable(conflict) => Self::SlotUnavailable(conflict),
            RangeCheckError::Time(error) => Self::Time(error),
        }
    }
}

impl From<ScheduleError> for BookingsServiceError {
    fn from(error: ScheduleError) -> Self {
        match error {
            ScheduleError::Sql(error) => error.into(),
            ScheduleError::Time(error) => Self::Time(error),
        }
    }
}
