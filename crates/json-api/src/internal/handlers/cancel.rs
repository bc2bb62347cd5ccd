//! Cancel Booking Handler

use std::sync::Arc;

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{
    bookings::{errors::into_status_error, get::BookingResponse},
    errors::ApiError,
    extensions::*,
    state::State,
};

/// Cancel Booking Handler
///
/// Cancels a booking and frees its slot.
#[endpoint(
    tags("internal"),
    summary = "Cancel booking",
    security(("bearer_auth" = [])),
)]
pub(crate) async fn handler(
    booking: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<BookingResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let record = state
        .app
        .bookings
        .cancel_booking(booking.into_inner().into())
        .await
        .map_err(into_status_error)?;

    Ok(Json(record.into()))
}
