//! Payment Errors

use salvo::http::StatusError;
use tracing::error;

use atelier_app::domain::payments::PaymentsServiceError;

pub(crate) fn into_status_error(error: PaymentsServiceError) -> StatusError {
    match error {
        PaymentsServiceError::NotFound(entity) => {
            StatusError::not_found().brief(format!("{entity} not found"))
        }
        PaymentsServiceError::InvalidTransition(transition) => {
            StatusError::conflict().brief(transition.to_string())
        }
        PaymentsServiceError::InvalidAmount(reason) => {
            StatusError::unprocessable_entity().brief(reason)
        }
        error @ PaymentsServiceError::AmountExceedsBalance { .. } => {
            StatusError::unprocessable_entity().brief(error.to_string())
        }
        PaymentsServiceError::NoBalanceDue => StatusError::conflict().brief("No balance due"),
        PaymentsServiceError::DepositCheckoutOpen => {
            StatusError::conflict().brief("Deposit checkout still open")
        }
        PaymentsServiceError::GatewayConfig => {
            StatusError::conflict().brief("Provider cannot take online payments yet")
        }
        PaymentsServiceError::GatewayCall(source) => {
            error!("payment gateway request failed: {source}");

            StatusError::bad_gateway()
        }
        PaymentsServiceError::InvalidData => {
            StatusError::bad_request().brief("Invalid payment payload")
        }
        PaymentsServiceError::Time(source) => {
            error!("payment time calculation failed: {source}");

            StatusError::internal_server_error()
        }
        PaymentsServiceError::Sql(source) => {
            error!("payment storage error: {source}");

            StatusError::internal_server_error()
        }
    }
}
