//! Slot Errors

use salvo::http::StatusError;
use tracing::error;

use atelier_app::domain::availability::AvailabilityServiceError;

pub(crate) fn into_status_error(error: AvailabilityServiceError) -> StatusError {
    match error {
        AvailabilityServiceError::ProviderNotFound => {
            StatusError::not_found().brief("Provider not found")
        }
        AvailabilityServiceError::InvalidQuery(reason) => {
            StatusError::unprocessable_entity().brief(reason)
        }
        AvailabilityServiceError::Time(source) => {
            error!("failed to compute slots: {source}");

            StatusError::internal_server_error()
        }
        AvailabilityServiceError::Sql(source) => {
            error!("failed to load availability: {source}");

            StatusError::internal_server_error()
        }
    }
}
