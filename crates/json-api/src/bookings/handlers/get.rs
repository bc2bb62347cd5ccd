//! Get Booking Handler

use std::sync::Arc;

use salvo::{
    oapi::{ToSchema, extract::PathParam},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atelier_app::domain::bookings::records::BookingRecord;

use crate::{bookings::errors::into_status_error, errors::ApiError, extensions::*, state::State};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct BookingResponse {
    pub uuid: Uuid,
    pub provider_uuid: Uuid,
    pub client_uuid: Uuid,

    /// Session start (RFC 3339)
    pub starts_at: String,

    /// Session end (RFC 3339)
    pub ends_at: String,

    pub duration_minutes: u32,

    /// `consultation`, `session` or `retouch`
    pub kind: String,

    /// `pending_payment`, `confirmed`, `cancelled` or `completed`
    pub status: String,

    /// Total price in minor units
    pub price: u64,

    /// Deposit in minor units
    pub deposit_amount: u64,

    pub deposit_paid: bool,
    pub description: Option<String>,
    pub zone: Option<String>,
    pub size: Option<String>,
    pub style: Option<String>,
    pub reference_photos: Vec<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

impl From<BookingRecord> for BookingResponse {
    fn from(booking: BookingRecord) -> Self {
        BookingResponse {
            uuid: booking.uuid.into(),
            provider_uuid: booking.provider_uuid.into(),
            client_uuid: booking.client_uuid.into(),
            starts_at: booking.starts_at.to_string(),
            ends_at: booking.ends_at.to_string(),
            duration_minutes: booking.duration_minutes,
            kind: booking.kind.to_string(),
            status: booking.status.to_string(),
            price: booking.price,
            deposit_amount: booking.deposit_amount,
            deposit_paid: booking.deposit_paid,
            description: booking.project.description,
            zone: booking.project.zone,
            size: booking.project.size,
            style: booking.project.style,
            reference_photos: booking.project.reference_photos,
            notes: booking.project.notes,
            created_at: booking.created_at.to_string(),
        }
    }
}

/// Get Booking Handler
///
/// Returns a booking.
#[endpoint(tags("bookings"), summary = "Get Booking")]
pub(crate) async fn handler(
    booking: PathParam<Uuid>,
    depot: &mut Depot,
) -> Result<Json<BookingResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let booking = state
        .app
        .bookings
        .get_booking(booking.into_inner().into())
        .await
        .map_err(into_status_error)?;

    Ok(Json(booking.into()))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use testresult::TestResult;

    use atelier_app::domain::{
        Entity,
        bookings::{BookingsServiceError, records::BookingUuid, status::BookingStatus},
    };

    use crate::test_helpers::{Mocks, make_booking, make_service};

    use super::*;

    fn service(mocks: Mocks) -> Service {
        make_service(mocks, Router::with_path("bookings/{booking}").get(handler))
    }

    #[tokio::test]
    async fn test_get_returns_200() -> TestResult {
        let uuid = BookingUuid::new();
        let booking = make_booking(uuid, BookingStatus::Confirmed);

        let mut mocks = Mocks::default();

        mocks
            .bookings
            .expect_get_booking()
            .once()
            .withf(move |u| *u == uuid)
            .return_once(move |_| Ok(booking));

        let mut res = TestClient::get(format!("http://example.com/bookings/{uuid}"))
            .send(&service(mocks))
            .await;

        let body: BookingResponse = res.take_json().await?;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(body.uuid, uuid.into_uuid());
        assert_eq!(body.status, "confirmed");
        assert_eq!(body.kind, "session");
        assert!(body.deposit_paid);

        Ok(())
    }

    #[tokio::test]
    async fn test_get_missing_booking_returns_404() -> TestResult {
        let uuid = BookingUuid::new();

        let mut mocks = Mocks::default();

        mocks
            .bookings
            .expect_get_booking()
            .once()
            .return_once(|_| Err(BookingsServiceError::NotFound(Entity::Booking)));

        let res = TestClient::get(format!("http://example.com/bookings/{uuid}"))
            .send(&service(mocks))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

        Ok(())
    }
}
