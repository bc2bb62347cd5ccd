//! Create Booking Handler

use std::sync::Arc;

use jiff::Timestamp;
use salvo::{
    http::header::LOCATION,
    oapi::{ToSchema, extract::JsonBody},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atelier_app::domain::bookings::{
    data::{BookingDraft, ContactDraft},
    status::BookingKind,
};

use crate::{
    bookings::errors::into_status_error,
    errors::{ApiError, ValidationErrorResponse},
    extensions::*,
    observability::record_booking_created,
    state::State,
};

/// Appointment type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub(crate) enum BookingKindRequest {
    Consultation,
    Session,
    Retouch,
}

impl From<BookingKindRequest> for BookingKind {
    fn from(kind: BookingKindRequest) -> Self {
        match kind {
            BookingKindRequest::Consultation => BookingKind::Consultation,
            BookingKindRequest::Session => BookingKind::Session,
            BookingKindRequest::Retouch => BookingKind::Retouch,
        }
    }
}

/// Contact details for a client without an id yet.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub(crate) struct ContactRequest {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
}

/// Create Booking Request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub(crate) struct CreateBookingRequest {
    pub provider_uuid: Option<Uuid>,

    /// Existing client; give either this or `client`
    pub client_uuid: Option<Uuid>,

    pub client: Option<ContactRequest>,

    /// Requested start (RFC 3339)
    pub starts_at: Option<String>,

    pub duration_minutes: Option<i64>,

    pub kind: Option<BookingKindRequest>,

    /// Total price in minor units
    pub price: Option<i64>,

    /// Deposit in minor units; stored as zero when omitted
    pub deposit_amount: Option<i64>,

    pub description: Option<String>,
    pub zone: Option<String>,
    pub size: Option<String>,
    pub style: Option<String>,

    /// Absolute http(s) URLs, at most ten
    #[serde(default)]
    pub reference_photos: Vec<String>,

    pub notes: Option<String>,
}

impl TryFrom<CreateBookingRequest> for BookingDraft {
    type Error = ValidationErrorResponse;

    fn try_from(request: CreateBookingRequest) -> Result<Self, Self::Error> {
        let starts_at = request
            .starts_at
            .as_deref()
            .map(str::parse::<Timestamp>)
            .transpose()
            .map_err(|error| {
                ValidationErrorResponse::single(
                    "starts_at",
                    format!("start time is not a valid RFC 3339 timestamp: {error}"),
                )
            })?;

        Ok(BookingDraft {
            provider_uuid: request.provider_uuid.map(Into::into),
            client_uuid: request.client_uuid.map(Into::into),
            client: request.client.map(|contact| ContactDraft {
                email: contact.email,
                name: contact.name,
                phone: contact.phone,
            }),
            starts_at,
            duration_minutes: request.duration_minutes,
            kind: request.kind.map(Into::into),
            price: request.price,
            deposit_amount: request.deposit_amount,
            description: request.description,
            zone: request.zone,
            size: request.size,
            style: request.style,
            reference_photos: request.reference_photos,
            notes: request.notes,
        })
    }
}

/// Booking Created Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct BookingCreatedResponse {
    /// Created booking UUID
    pub uuid: Uuid,

    /// Always `pending_payment` for a new booking
    pub status: String,
}

/// Create Booking Handler
///
/// Reserves the requested range as `pending_payment` until the deposit settles.
#[endpoint(
    tags("bookings"),
    summary = "Request a booking",
    responses(
        (status_code = StatusCode::CREATED, description = "Booking created"),
        (status_code = StatusCode::NOT_FOUND, description = "Unknown provider or client"),
        (status_code = StatusCode::CONFLICT, description = "Slot unavailable"),
        (status_code = StatusCode::TOO_MANY_REQUESTS, description = "Rate limited"),
    ),
)]
pub(crate) async fn handler(
    json: JsonBody<CreateBookingRequest>,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<BookingCreatedResponse>, ApiError> {
    let state = depot.obtain_or_500::<Arc<State>>()?;

    let draft = BookingDraft::try_from(json.into_inner()).map_err(ApiError::Validation)?;

    let created = state
        .app
        .bookings
        .create_booking(draft)
        .await
        .map_err(into_status_error)?;

    record_booking_created();

    res.add_header(LOCATION, format!("/bookings/{}", created.uuid), true)
        .or_500("failed to set location header")?
        .status_code(StatusCode::CREATED);

    Ok(Json(BookingCreatedResponse {
        uuid: created.uuid.into(),
        status: created.status.to_string(),
    }))
}
