//! Test Helpers

use jiff::{
    Timestamp, ToSpan, Zoned,
    civil::{Date, Time, Weekday},
    tz::TimeZone,
};

use crate::{
    domain::{
        bookings::{
            data::{BookingDraft, ContactDraft},
            status::BookingKind,
        },
        providers::{
            ProvidersService, ProvidersServiceError,
            data::{NewProvider, NewWorkingHour},
            records::ProviderUuid,
        },
    },
    test::TestContext,
};

pub(crate) fn new_provider(prep: u32, cleanup: u32, buffer: u32) -> NewProvider {
    NewProvider {
        uuid: ProviderUuid::new(),
        name: "Ink & Co".to_string(),
        email: "artist@example.com".to_string(),
        prep_minutes: prep,
        cleanup_minutes: cleanup,
        buffer_minutes: buffer,
        slot_interval_minutes: 30,
    }
}

/// Give `provider` the same window on all seven days.
pub(crate) async fn open_every_day(
    ctx: &TestContext,
    provider: ProviderUuid,
    starts_at: Time,
    ends_at: Time,
) -> Result<(), ProvidersServiceError> {
    let hours = (0..7)
        .map(|day_of_week| NewWorkingHour {
            day_of_week,
            starts_at,
            ends_at,
        })
        .collect();

    ctx.providers.set_working_hours(provider, hours).await?;

    Ok(())
}

/// A Monday at least a week away.
pub(crate) fn future_monday() -> Date {
    Zoned::now()
        .with_time_zone(TimeZone::UTC)
        .date()
        .checked_add(7.days())
        .and_then(|date| date.nth_weekday(1, Weekday::Monday))
        .expect("a Monday exists after any date")
}

/// `date` at `hour:minute` UTC.
pub(crate) fn at(date: Date, hour: i8, minute: i8) -> Timestamp {
    date.at(hour, minute, 0, 0)
        .to_zoned(TimeZone::UTC)
        .expect("UTC has no gaps")
        .timestamp()
}

/// A session request for `duration` minutes: price 200.00, deposit 60.00.
pub(crate) fn booking_draft(provider: ProviderUuid, starts_at: Timestamp, duration: i64) -> BookingDraft {
    BookingDraft {
        provider_uuid: Some(provider),
        client: Some(ContactDraft {
            email: "robin@example.com".to_string(),
            name: "Robin".to_string(),
            phone: None,
        }),
        starts_at: Some(starts_at),
        duration_minutes: Some(duration),
        kind: Some(BookingKind::Session),
        price: Some(20_000),
        deposit_amount: Some(6_000),
        description: Some("Fine line rose".to_string()),
        ..BookingDraft::default()
    }
}
