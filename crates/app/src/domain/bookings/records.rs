//! Booking Records

use jiff::Timestamp;

use crate::{
    domain::{
        availability::slots::TimeRange,
        bookings::status::{BookingKind, BookingStatus},
        clients::records::ClientUuid,
        providers::records::ProviderUuid,
    },
    uuids::TypedUuid,
};

/// Booking UUID
pub type BookingUuid = TypedUuid<BookingRecord>;

/// Free-text description of the requested work.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectDetails {
    pub description: Option<String>,
    pub zone: Option<String>,
    pub size: Option<String>,
    pub style: Option<String>,
    pub reference_photos: Vec<String>,
    pub notes: Option<String>,
}

/// Booking Record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRecord {
    pub uuid: BookingUuid,
    pub provider_uuid: ProviderUuid,
    pub client_uuid: ClientUuid,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub duration_minutes: u32,
    /// Booking range widened by the provider's padding at creation time.
    pub occupied: TimeRange,
    pub kind: BookingKind,
    pub status: BookingStatus,
    pub price: u64,
    pub deposit_amount: u64,
    pub deposit_paid: bool,
    pub gateway_reference: Option<String>,
    pub project: ProjectDetails,
    pub notification_failed: bool,
    pub reminder_sent_at: Option<Timestamp>,
    pub review_requested_at: Option<Timestamp>,
    pub confirmed_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl BookingRecord {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.starts_at, self.ends_at)
    }
}

/// Result of a successful booking request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedBooking {
    pub uuid: BookingUuid,
    pub status: BookingStatus,
}
