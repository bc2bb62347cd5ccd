//! Schedule loading shared by slot queries and booking creation.

use jiff::{
    Timestamp, ToSpan,
    civil::Date,
    tz::TimeZone,
};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use sqlx::{Postgres, Transaction};
use thiserror::Error;

use crate::domain::{
    availability::slots::{Padding, RangeCheckError, TimeRange, check_range, working_windows},
    bookings::repository::PgBookingsRepository,
    providers::{records::ProviderRecord, repository::PgProvidersRepository},
};

#[derive(Debug, Error)]
pub(crate) enum ScheduleError {
    #[error("storage error")]
    Sql(#[from] sqlx::Error),

    #[error("time calculation failed")]
    Time(#[from] jiff::Error),
}

/// One calendar day of a provider's schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScheduledDay {
    pub date: Date,
    pub absent: bool,
    pub windows: SmallVec<[TimeRange; 2]>,
}

/// Working windows, absences and occupied ranges of a provider over a date range.
#[derive(Debug, Clone)]
pub(crate) struct Schedule {
    days: Vec<ScheduledDay>,
    occupied: Vec<TimeRange>,
    time_zone: TimeZone,
}

impl Schedule {
    /// Load everything slot computation needs for the inclusive range `from..=until`.
    ///
    /// Occupied ranges are fetched with a day of margin on both sides so padding that
    /// reaches across midnight is still seen.
    pub(crate) async fn load(
        tx: &mut Transaction<'_, Postgres>,
        provider: &ProviderRecord,
        from: Date,
        until: Date,
        time_zone: &TimeZone,
    ) -> Result<Self, ScheduleError> {
        let providers = PgProvidersRepository::new();
        let bookings = PgBookingsRepository::new();

        let hours = providers.list_working_hours(tx, provider.uuid).await?;

        let absences: FxHashSet<Date> = providers
            .list_absences(tx, provider.uuid, from, until)
            .await?
            .into_iter()
            .map(|absence| absence.date)
            .collect();

        let mut days = Vec::new();
        let mut date = from;

        while date <= until {
            days.push(ScheduledDay {
                date,
                absent: absences.contains(&date),
                windows: working_windows(date, &hours, time_zone)?,
            });

            date = date.tomorrow()?;
        }

        let range_start = from.yesterday()?.to_zoned(time_zone.clone())?.timestamp();
        let range_end = until
            .checked_add(2.days())?
            .to_zoned(time_zone.clone())?
            .timestamp();

        let occupied = bookings
            .list_occupied(tx, provider.uuid, range_start, range_end)
            .await?;

        Ok(Self {
            days,
            occupied,
            time_zone: time_zone.clone(),
        })
    }

    pub(crate) fn days(&self) -> &[ScheduledDay] {
        &self.days
    }

    pub(crate) fn occupied(&self) -> &[TimeRange] {
        &self.occupied
    }

    /// Check a concrete range against the loaded day it starts on.
    pub(crate) fn check(
        &self,
        requested: TimeRange,
        padding: Padding,
    ) -> Result<(), RangeCheckError> {
        let date = local_date(requested.start, &self.time_zone);

        let (windows, absent) = self
            .days
            .iter()
            .find(|day| day.date == date)
            .map_or((&[][..], false), |day| (day.windows.as_slice(), day.absent));

        check_range(requested, windows, &self.occupied, padding, absent)
    }
}

/// The local calendar date `at` falls on.
pub(crate) fn local_date(at: Timestamp, time_zone: &TimeZone) -> Date {
    at.to_zoned(time_zone.clone()).date()
}
