//! Availability service.

use async_trait::async_trait;
use jiff::{Timestamp, civil::Date, tz::TimeZone};
use mockall::automock;
use tracing::debug;

use crate::{
    database::Db,
    domain::{
        availability::{
            errors::AvailabilityServiceError,
            schedule::Schedule,
            slots::{
                MAX_DURATION_MINUTES, MIN_DURATION_MINUTES, SlotList, SlotRules, day_slots,
                extend_capped,
            },
        },
        providers::{records::ProviderUuid, repository::PgProvidersRepository},
    },
};

/// Longest date range a single query may cover, in days.
pub const MAX_QUERY_DAYS: i32 = 31;

/// Default cap on slots returned per query.
pub const DEFAULT_MAX_SLOTS: usize = 500;

/// Free slots for one provider and duration over an inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotQuery {
    pub provider: ProviderUuid,
    pub from: Date,
    /// Last day of the range; `from` alone when absent.
    pub until: Option<Date>,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone)]
pub struct AvailabilitySettings {
    pub time_zone: TimeZone,
    pub max_slots: usize,
}

impl Default for AvailabilitySettings {
    fn default() -> Self {
        Self {
            time_zone: TimeZone::UTC,
            max_slots: DEFAULT_MAX_SLOTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgAvailabilityService {
    db: Db,
    settings: AvailabilitySettings,
    providers: PgProvidersRepository,
}

impl PgAvailabilityService {
    #[must_use]
    pub fn new(db: Db, settings: AvailabilitySettings) -> Self {
        Self {
            db,
            settings,
            providers: PgProvidersRepository::new(),
        }
    }

    fn check_query(query: &SlotQuery) -> Result<Date, AvailabilityServiceError> {
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&query.duration_minutes) {
            return Err(AvailabilityServiceError::InvalidQuery(format!(
                "duration must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES} minutes"
            )));
        }

        let until = query.until.unwrap_or(query.from);

        if until < query.from {
            return Err(AvailabilityServiceError::InvalidQuery(
                "range end is before its start".to_string(),
            ));
        }

        if query.from.until(until)?.get_days() >= MAX_QUERY_DAYS {
            return Err(AvailabilityServiceError::InvalidQuery(format!(
                "range may cover at most {MAX_QUERY_DAYS} days"
            )));
        }

        Ok(until)
    }
}

#[async_trait]
impl AvailabilityService for PgAvailabilityService {
    async fn available_slots(&self, query: SlotQuery) -> Result<SlotList, AvailabilityServiceError> {
        let until = Self::check_query(&query)?;

        let mut tx = self.db.begin_transaction().await?;

        let provider = self.providers.get_provider(&mut tx, query.provider).await?;

        let schedule =
            Schedule::load(&mut tx, &provider, query.from, until, &self.settings.time_zone).await?;

        tx.commit().await?;

        let rules = SlotRules {
            duration_minutes: query.duration_minutes,
            interval_minutes: provider.slot_interval_minutes,
            padding: provider.padding(),
        };

        let now = Timestamp::now();
        let mut list = SlotList::default();

        for day in schedule.days() {
            if day.absent {
                continue;
            }

            let slots = day_slots(&day.windows, schedule.occupied(), &rules, now)?;

            extend_capped(&mut list, slots, self.settings.max_slots);

            if list.truncated {
                break;
            }
        }

        debug!(
            provider = %query.provider,
            from = %query.from,
            %until,
            slots = list.slots.len(),
            truncated = list.truncated,
            "computed available slots"
        );

        Ok(list)
    }
}

#[automock]
#[async_trait]
pub trait AvailabilityService: Send + Sync {
    /// Compute free slots; read-only and safe to repeat.
    async fn available_slots(&self, query: SlotQuery) -> Result<SlotList, AvailabilityServiceError>;
}

#[cfg(test)]
mod tests {
    use jiff::{ToSpan, civil::time};
    use testresult::TestResult;

    use crate::{
        domain::{
            availability::slots::TimeRange,
            bookings::BookingsService,
            providers::{ProvidersService, data::NewAbsence},
        },
        test::{
            TestContext,
            helpers::{at, booking_draft, future_monday, new_provider, open_every_day},
        },
    };

    use super::*;

    fn query(provider: ProviderUuid, from: Date, duration_minutes: u32) -> SlotQuery {
        SlotQuery {
            provider,
            from,
            until: None,
            duration_minutes,
        }
    }

    #[tokio::test]
    async fn open_day_yields_every_interval() -> TestResult {
        let ctx = TestContext::new().await;
        let provider = ctx.providers.create_provider(new_provider(0, 0, 0)).await?;
        open_every_day(&ctx, provider.uuid, time(10, 0, 0, 0), time(18, 0, 0, 0)).await?;

        let monday = future_monday();
        let list = ctx
            .availability
            .available_slots(query(provider.uuid, monday, 120))
            .await?;

        assert_eq!(list.slots.len(), 13);
        assert_eq!(
            list.slots.first().map(|slot| slot.start),
            Some(at(monday, 10, 0))
        );
        assert!(!list.truncated);

        Ok(())
    }

    #[tokio::test]
    async fn existing_booking_removes_its_expanded_range() -> TestResult {
        let ctx = TestContext::new().await;
        let provider = ctx
            .providers
            .create_provider(new_provider(15, 15, 0))
            .await?;
        open_every_day(&ctx, provider.uuid, time(10, 0, 0, 0), time(18, 0, 0, 0)).await?;

        let monday = future_monday();
        ctx.bookings
            .create_booking(booking_draft(provider.uuid, at(monday, 11, 0), 60))
            .await?;

        let list = ctx
            .availability
            .available_slots(query(provider.uuid, monday, 60))
            .await?;

        let blocked = TimeRange::new(at(monday, 10, 45), at(monday, 12, 15));

        assert!(!list.slots.is_empty());
        assert!(
            list.slots
                .iter()
                .all(|slot| !TimeRange::new(slot.start, slot.end).overlaps(&blocked))
        );

        Ok(())
    }

    #[tokio::test]
    async fn absence_day_yields_nothing() -> TestResult {
        let ctx = TestContext::new().await;
        let provider = ctx.providers.create_provider(new_provider(0, 0, 0)).await?;
        open_every_day(&ctx, provider.uuid, time(10, 0, 0, 0), time(18, 0, 0, 0)).await?;

        let monday = future_monday();
        ctx.providers
            .add_absence(
                provider.uuid,
                NewAbsence {
                    date: monday,
                    reason: None,
                },
            )
            .await?;

        let list = ctx
            .availability
            .available_slots(query(provider.uuid, monday, 60))
            .await?;

        assert!(list.slots.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn day_without_working_hours_is_empty_not_an_error() -> TestResult {
        let ctx = TestContext::new().await;
        let provider = ctx.providers.create_provider(new_provider(0, 0, 0)).await?;

        let list = ctx
            .availability
            .available_slots(query(provider.uuid, future_monday(), 60))
            .await?;

        assert!(list.slots.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn date_range_is_capped() -> TestResult {
        let ctx = TestContext::new().await;
        let provider = ctx.providers.create_provider(new_provider(0, 0, 0)).await?;
        open_every_day(&ctx, provider.uuid, time(0, 0, 0, 0), time(23, 30, 0, 0)).await?;

        let from = future_monday();
        let service = PgAvailabilityService::new(
            ctx.db(),
            AvailabilitySettings {
                time_zone: TimeZone::UTC,
                max_slots: 50,
            },
        );

        let list = service
            .available_slots(SlotQuery {
                until: Some(from.checked_add(6.days())?),
                ..query(provider.uuid, from, 30)
            })
            .await?;

        assert_eq!(list.slots.len(), 50);
        assert!(list.truncated);

        Ok(())
    }

    #[tokio::test]
    async fn oversized_range_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;
        let provider = ctx.providers.create_provider(new_provider(0, 0, 0)).await?;
        let from = future_monday();

        let result = ctx
            .availability
            .available_slots(SlotQuery {
                until: Some(from.checked_add(31.days())?),
                ..query(provider.uuid, from, 60)
            })
            .await;

        assert!(matches!(
            result,
            Err(AvailabilityServiceError::InvalidQuery(_))
        ));

        Ok(())
    }

    #[tokio::test]
    async fn duration_outside_bounds_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;
        let provider = ctx.providers.create_provider(new_provider(0, 0, 0)).await?;

        let result = ctx
            .availability
            .available_slots(query(provider.uuid, future_monday(), 15))
            .await;

        assert!(matches!(
            result,
            Err(AvailabilityServiceError::InvalidQuery(_))
        ));

        Ok(())
    }

    #[tokio::test]
    async fn unknown_provider_is_reported() -> TestResult {
        let ctx = TestContext::new().await;

        let result = ctx
            .availability
            .available_slots(query(ProviderUuid::new(), future_monday(), 60))
            .await;

        assert!(matches!(
            result,
            Err(AvailabilityServiceError::ProviderNotFound)
        ));

        Ok(())
    }
}
