//! Complete Booking Handler

use std::sync::Arc;

use salvo::{oapi::extract::PathParam, prelude::*};
use uuid::Uuid;

use crate::{
    bookings::{errors::into_status_error, get::BookingResponse},
    errors::ApiError,
    extensions::*,
    state::State,
};

/// Complete Booking Handler
///
/// Marks a confirmed session as done.
#[endpoint(
    tags("internal"),
    summary = "Complete booking",
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
        .complete_booking(booking.into_inner().into())
        .await
        .map_err(into_status_error)?;

    Ok(Json(record.into()))
}

#[cfg(test)]
mod tests {
    use salvo::test::TestClient;

    use atelier_app::domain::bookings::{
        BookingsServiceError,
        records::BookingUuid,
        status::{BookingStatus, TransitionError},
    };

    use crate::test_helpers::{Mocks, make_booking, make_service};

    use super::*;

    fn service(mocks: Mocks) -> Service {
        make_service(
            mocks,
            Router::with_path("internal/bookings/{booking}/complete").post(handler),
        )
    }

    #[tokio::test]
    async fn test_complete_returns_200() {
        let booking = BookingUuid::new();

        let mut mocks = Mocks::default();

        mocks
            .bookings
            .expect_complete_booking()
            .once()
            .return_once(move |_| Ok(make_booking(booking, BookingStatus::Completed)));

        let res = TestClient::post(format!(
            "http://example.com/internal/bookings/{booking}/complete"
        ))
        .send(&service(mocks))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));
    }

    #[tokio::test]
    async fn test_pending_booking_cannot_complete() {
        let mut mocks = Mocks::default();

        mocks
            .bookings
            .expect_complete_booking()
            .once()
            .return_once(|_| {
                Err(BookingsServiceError::InvalidTransition(
                    TransitionError::NotConfirmedForCompletion,
                ))
            });

        let res = TestClient::post(format!(
            "http://example.com/internal/bookings/{}/complete",
            BookingUuid::new()
        ))
        .send(&service(mocks))
        .await;

        assert_eq!(res.status_code, Some(StatusCode::CONFLICT));
    }
}
