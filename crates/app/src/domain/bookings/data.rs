//! Bookings Data

use jiff::Timestamp;

use crate::domain::{
    availability::slots::TimeRange,
    bookings::{
        records::{BookingUuid, ProjectDetails},
        status::BookingKind,
    },
    clients::records::ClientUuid,
    providers::records::ProviderUuid,
};

/// Booking request as received, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BookingDraft {
    pub provider_uuid: Option<ProviderUuid>,
    pub client_uuid: Option<ClientUuid>,
    pub client: Option<ContactDraft>,
    pub starts_at: Option<Timestamp>,
    pub duration_minutes: Option<i64>,
    pub kind: Option<BookingKind>,
    pub price: Option<i64>,
    pub deposit_amount: Option<i64>,
    pub description: Option<String>,
    pub zone: Option<String>,
    pub size: Option<String>,
    pub style: Option<String>,
    pub reference_photos: Vec<String>,
    pub notes: Option<String>,
}

/// Unvalidated client contact details.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContactDraft {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
}

/// Validated booking ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NewBooking {
    pub uuid: BookingUuid,
    pub provider_uuid: ProviderUuid,
    pub client_uuid: ClientUuid,
    pub range: TimeRange,
    pub occupied: TimeRange,
    pub duration_minutes: u32,
    pub kind: BookingKind,
    pub price: u64,
    pub deposit_amount: u64,
    pub project: ProjectDetails,
}
