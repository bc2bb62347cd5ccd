//! Create Balance Request Handler

use std::sync::Arc;

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{
    extensions::*,
    payments::{errors::into_status_error, handlers::PaymentRequestResponse},
    state::State,
};

/// Create Balance Request Handler
///
/// Opens a gateway checkout for whatever is still owed on a confirmed booking.
#[endpoint(
    tags("payments"),
    summary = "Request the remaining balance",
    responses(
        (status_code = StatusCode::OK, description = "Checkout opened"),
        (status_code = StatusCode::NOT_FOUND, description = "Booking not found"),
        (status_code = StatusCode::CONFLICT, description = "Nothing left to pay"),
        (status_code = StatusCode::BAD_GATEWAY, description = "Gateway unavailable"),
    ),
)]
pub(crate) async fn handler(
    booking: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<PaymentRequestResponse>, StatusError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let request = state
        .app
        .payments
        .create_balance_request(booking.into_inner().into())
        .await
        .map_err(into_status_error)?;

    Ok(Json(request.into()))
}
