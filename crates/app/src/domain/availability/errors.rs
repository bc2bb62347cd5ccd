//! Availability service errors.

use thiserror::Error;

use crate::domain::availability::schedule::ScheduleError;

#[derive(Debug, Error)]
pub enum AvailabilityServiceError {
    #[error("provider not found")]
    ProviderNotFound,

    #[error("invalid slot query: {0}")]
    InvalidQuery(String),

    #[error("time calculation failed")]
    Time(#[from] jiff::Error),

    #[error("storage error")]
    Sql(#[source] sqlx::Error),
}

impl From<sqlx::Error> for AvailabilityServiceError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::ProviderNotFound,
            error => Self::Sql(error),
        }
    }
}

impl From<ScheduleError> for AvailabilityServiceError {
    fn from(error: ScheduleError) -> Self {
        match error {
            ScheduleError::Sql(error) => error.into(),
            ScheduleError::Time(error) => Self::Time(error),
        }
    }
}
