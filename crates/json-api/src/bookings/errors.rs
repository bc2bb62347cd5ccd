//! Booking Errors

use salvo::http::StatusError;
use tracing::error;

use atelier_app::domain::bookings::BookingsServiceError;

use crate::errors::ApiError;

pub(crate) fn into_status_error(error: BookingsServiceError) -> ApiError {
    match error {
        BookingsServiceError::Validation(error) => error.into(),
        BookingsServiceError::NotFound(entity) => {
            StatusError::not_found().brief(format!("{entity} not found")).into()
        }
        BookingsServiceError::SlotUnavailable(conflict) => {
            StatusError::conflict().brief(conflict.to_string()).into()
        }
        BookingsServiceError::InvalidTransition(transition) => {
            StatusError::conflict().brief(transition.to_string()).into()
        }
        BookingsServiceError::InvalidData => {
            StatusError::bad_request().brief("Invalid booking payload").into()
        }
        BookingsServiceError::Time(source) => {
            error!("booking time calculation failed: {source}");

            StatusError::internal_server_error().into()
        }
        BookingsServiceError::Sql(source) => {
            error!("booking storage error: {source}");

            StatusError::internal_server_error().into()
        }
    }
}
