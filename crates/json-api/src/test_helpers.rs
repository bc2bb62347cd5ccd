//! Test helpers.

use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use salvo::{affix_state::inject, prelude::*};

use atelier_app::{
    context::AppContext,
    database::MockDatabaseHealth,
    domain::{
        availability::{MockAvailabilityService, slots::TimeRange},
        bookings::{
            MockBookingsService,
            records::{BookingRecord, BookingUuid, ProjectDetails},
            status::{BookingKind, BookingStatus},
        },
        clients::records::ClientUuid,
        payments::MockPaymentsService,
        providers::records::ProviderUuid,
    },
    rate_limit::{RateLimitConfig, RateLimiter},
};

use crate::state::{Secrets, State};

pub(crate) const TEST_INTERNAL_TOKEN: &str = "staff-token";
pub(crate) const TEST_WEBHOOK_SECRET: &str = "whsec_test";

/// Service mocks; any call without a matching expectation fails the test.
#[derive(Default)]
pub(crate) struct Mocks {
    pub database: MockDatabaseHealth,
    pub availability: MockAvailabilityService,
    pub bookings: MockBookingsService,
    pub payments: MockPaymentsService,
}

pub(crate) fn state_with_limits(mocks: Mocks, limits: RateLimitConfig) -> Arc<State> {
    state_behind_proxies(mocks, limits, 0)
}

pub(crate) fn state_behind_proxies(
    mocks: Mocks,
    limits: RateLimitConfig,
    trusted_proxy_hops: usize,
) -> Arc<State> {
    let app = AppContext {
        database: Arc::new(mocks.database),
        availability: Arc::new(mocks.availability),
        bookings: Arc::new(mocks.bookings),
        payments: Arc::new(mocks.payments),
    };

    State::from_app_context(
        app,
        RateLimiter::new(limits),
        Secrets {
            webhook: TEST_WEBHOOK_SECRET.to_string(),
            internal_token: TEST_INTERNAL_TOKEN.to_string(),
        },
        trusted_proxy_hops,
    )
}

pub(crate) fn make_service(mocks: Mocks, route: Router) -> Service {
    Service::new(
        Router::new()
            .hoop(inject(state_with_limits(mocks, RateLimitConfig::default())))
            .push(route),
    )
}

pub(crate) fn make_booking(uuid: BookingUuid, status: BookingStatus) -> BookingRecord {
    let starts_at = Timestamp::UNIX_EPOCH + SignedDuration::from_hours(24 * 365 * 70);
    let ends_at = starts_at + SignedDuration::from_hours(2);

    BookingRecord {
        uuid,
        provider_uuid: ProviderUuid::new(),
        client_uuid: ClientUuid::new(),
        starts_at,
        ends_at,
        duration_minutes: 120,
        occupied: TimeRange::new(starts_at, ends_at),
        kind: BookingKind::Session,
        status,
        price: 20_000,
        deposit_amount: 6_000,
        deposit_paid: status != BookingStatus::PendingPayment,
        gateway_reference: None,
        project: ProjectDetails {
            description: Some("Fine line swallow".to_string()),
            zone: Some("forearm".to_string()),
            ..ProjectDetails::default()
        },
        notification_failed: false,
        reminder_sent_at: None,
        review_requested_at: None,
        confirmed_at: None,
        cancelled_at: None,
        completed_at: None,
        created_at: Timestamp::UNIX_EPOCH,
        updated_at: Timestamp::UNIX_EPOCH,
    }
}
