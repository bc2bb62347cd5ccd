//! Slot Computation
//!
//! Pure functions turning working windows and occupied ranges into bookable slots.
//! Loading those inputs lives in [`super::schedule`].

use std::fmt;

use jiff::{SignedDuration, Timestamp, civil::Date, tz::TimeZone};
use smallvec::SmallVec;
use thiserror::Error;

use crate::domain::providers::records::WorkingHourRecord;

/// Shortest bookable duration in minutes.
pub const MIN_DURATION_MINUTES: u32 = 30;

/// Longest bookable duration in minutes.
pub const MAX_DURATION_MINUTES: u32 = 480;

/// Half-open instant range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeRange {
    pub const fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Time a provider keeps free around every booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Padding {
    /// Prep time.
    pub before: SignedDuration,
    /// Cleanup plus buffer time.
    pub after: SignedDuration,
}

impl Default for Padding {
    fn default() -> Self {
        Self {
            before: SignedDuration::ZERO,
            after: SignedDuration::ZERO,
        }
    }
}

impl Padding {
    pub fn from_minutes(prep: u32, cleanup: u32, buffer: u32) -> Self {
        Self {
            before: SignedDuration::from_mins(i64::from(prep)),
            after: SignedDuration::from_mins(i64::from(cleanup) + i64::from(buffer)),
        }
    }

    /// Widen a booking range into the range it actually occupies.
    ///
    /// # Errors
    ///
    /// Returns an error when the widened range leaves the supported timestamp range.
    pub fn expand(&self, range: TimeRange) -> Result<TimeRange, jiff::Error> {
        Ok(TimeRange {
            start: range.start.checked_sub(self.before)?,
            end: range.end.checked_add(self.after)?,
        })
    }
}

/// A bookable candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub start: Timestamp,
    pub end: Timestamp,
    pub duration_minutes: u32,
}

/// Slots for a query, in chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SlotList {
    pub slots: Vec<Slot>,
    /// Set when the result hit the configured cap and later slots were dropped.
    pub truncated: bool,
}

/// How candidates are generated for one provider and duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRules {
    pub duration_minutes: u32,
    pub interval_minutes: u32,
    pub padding: Padding,
}

impl SlotRules {
    fn duration(&self) -> SignedDuration {
        SignedDuration::from_mins(i64::from(self.duration_minutes))
    }

    fn interval(&self) -> SignedDuration {
        SignedDuration::from_mins(i64::from(self.interval_minutes.max(1)))
    }
}

/// Why a requested range cannot be booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    OutsideWorkingHours,
    Absence,
    Overlap,
    InPast,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OutsideWorkingHours => "the requested time is outside the provider's working hours",
            Self::Absence => "the provider is not available on that day",
            Self::Overlap => "the requested time overlaps an existing booking",
            Self::InPast => "the requested time has already passed",
        })
    }
}

/// A rejected range and, for overlaps, the occupied range it ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotConflict {
    pub reason: UnavailableReason,
    pub conflict: Option<TimeRange>,
}

impl fmt::Display for SlotConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.conflict {
            Some(range) => write!(f, "{} {range}", self.reason),
            None => fmt::Display::fmt(&self.reason, f),
        }
    }
}

/// Why a concrete range could not be accepted.
#[derive(Debug, Error)]
pub enum RangeCheckError {
    #[error("slot unavailable: {0}")]
    Unavailable(SlotConflict),

    #[error("padded range out of bounds")]
    Time(#[from] jiff::Error),
}

impl From<SlotConflict> for RangeCheckError {
    fn from(conflict: SlotConflict) -> Self {
        Self::Unavailable(conflict)
    }
}

/// The weekday number used by working hours: 0 = Sunday through 6 = Saturday.
pub fn day_of_week(date: Date) -> i8 {
    date.weekday().to_sunday_zero_offset()
}

/// Resolve the active working-hour rows for `date` into instants in the studio time zone.
///
/// # Errors
///
/// Returns an error when a local time cannot be placed in the time zone.
pub fn working_windows(
    date: Date,
    hours: &[WorkingHourRecord],
    time_zone: &TimeZone,
) -> Result<SmallVec<[TimeRange; 2]>, jiff::Error> {
    let weekday = day_of_week(date);

    let mut windows = SmallVec::new();

    for hour in hours
        .iter()
        .filter(|hour| hour.active && hour.day_of_week == weekday)
    {
        let start = date.to_datetime(hour.starts_at).to_zoned(time_zone.clone())?;
        let end = date.to_datetime(hour.ends_at).to_zoned(time_zone.clone())?;

        windows.push(TimeRange::new(start.timestamp(), end.timestamp()));
    }

    windows.sort_unstable();

    Ok(windows)
}

/// Walk every window at the rules' interval and keep the candidates that fit.
///
/// `occupied` holds the already-expanded ranges of active bookings. A candidate is kept
/// when it ends inside its window, starts after `now`, and its own expanded range
/// touches none of them. Duplicate starts from overlapping windows collapse into one.
///
/// # Errors
///
/// Returns an error when timestamp arithmetic overflows.
pub fn day_slots(
    windows: &[TimeRange],
    occupied: &[TimeRange],
    rules: &SlotRules,
    now: Timestamp,
) -> Result<Vec<Slot>, jiff::Error> {
    let duration = rules.duration();
    let interval = rules.interval();

    let mut slots = Vec::new();

    for window in windows {
        let mut start = window.start;

        loop {
            let end = start.checked_add(duration)?;

            if end > window.end {
                break;
            }

            let candidate = rules.padding.expand(TimeRange::new(start, end))?;

            if start > now && !occupied.iter().any(|range| range.overlaps(&candidate)) {
                slots.push(Slot {
                    start,
                    end,
                    duration_minutes: rules.duration_minutes,
                });
            }

            start = start.checked_add(interval)?;
        }
    }

    slots.sort_unstable_by_key(|slot| slot.start);
    slots.dedup_by_key(|slot| slot.start);

    Ok(slots)
}

/// Check a concrete booking range against the same rules slot generation applies.
///
/// # Errors
///
/// Returns the first reason the range cannot be booked, or a time error when the
/// padded range leaves the supported timestamp range.
pub fn check_range(
    requested: TimeRange,
    windows: &[TimeRange],
    occupied: &[TimeRange],
    padding: Padding,
    absent: bool,
) -> Result<(), RangeCheckError> {
    if absent {
        return Err(SlotConflict {
            reason: UnavailableReason::Absence,
            conflict: None,
        }
        .into());
    }

    if !windows.iter().any(|window| window.contains(&requested)) {
        return Err(SlotConflict {
            reason: UnavailableReason::OutsideWorkingHours,
            conflict: None,
        }
        .into());
    }

    let expanded = padding.expand(requested)?;

    if let Some(range) = occupied.iter().find(|range| range.overlaps(&expanded)) {
        return Err(SlotConflict {
            reason: UnavailableReason::Overlap,
            conflict: Some(*range),
        }
        .into());
    }

    Ok(())
}

/// Append one day's slots to `list`, honouring the cap.
pub(crate) fn extend_capped(list: &mut SlotList, day: Vec<Slot>, limit: usize) {
    for slot in day {
        if list.slots.len() >= limit {
            list.truncated = true;
            return;
        }

        list.slots.push(slot);
    }
}

#[cfg(test)]
mod tests {
    use jiff::{
        civil::{Time, date, time},
        tz::offset,
    };

    use crate::domain::providers::records::{ProviderUuid, WorkingHourUuid};

    use super::*;

    fn conflict_of(result: Result<(), RangeCheckError>) -> Option<SlotConflict> {
        match result {
            Err(RangeCheckError::Unavailable(conflict)) => Some(conflict),
            Ok(()) | Err(RangeCheckError::Time(_)) => None,
        }
    }

    fn utc(day: Date, at: Time) -> Timestamp {
        day.to_datetime(at)
            .to_zoned(TimeZone::UTC)
            .map(|zoned| zoned.timestamp())
            .unwrap_or(Timestamp::UNIX_EPOCH)
    }

    fn hour(day_of_week: i8, starts_at: Time, ends_at: Time) -> WorkingHourRecord {
        WorkingHourRecord {
            uuid: WorkingHourUuid::new(),
            provider_uuid: ProviderUuid::new(),
            day_of_week,
            starts_at,
            ends_at,
            active: true,
        }
    }

    fn rules(duration_minutes: u32, padding: Padding) -> SlotRules {
        SlotRules {
            duration_minutes,
            interval_minutes: 30,
            padding,
        }
    }

    // 2030-06-03 is a Monday.
    const MONDAY: Date = date(2030, 6, 3);

    #[test]
    fn weekday_numbering_starts_on_sunday() {
        assert_eq!(day_of_week(date(2030, 6, 2)), 0);
        assert_eq!(day_of_week(MONDAY), 1);
        assert_eq!(day_of_week(date(2030, 6, 8)), 6);
    }

    #[test]
    fn working_windows_only_include_matching_active_rows() -> Result<(), jiff::Error> {
        let mut inactive = hour(1, time(19, 0, 0, 0), time(21, 0, 0, 0));
        inactive.active = false;

        let hours = [
            hour(1, time(14, 0, 0, 0), time(18, 0, 0, 0)),
            hour(2, time(9, 0, 0, 0), time(12, 0, 0, 0)),
            hour(1, time(10, 0, 0, 0), time(13, 0, 0, 0)),
            inactive,
        ];

        let windows = working_windows(MONDAY, &hours, &TimeZone::UTC)?;

        assert_eq!(
            windows.as_slice(),
            &[
                TimeRange::new(utc(MONDAY, time(10, 0, 0, 0)), utc(MONDAY, time(13, 0, 0, 0))),
                TimeRange::new(utc(MONDAY, time(14, 0, 0, 0)), utc(MONDAY, time(18, 0, 0, 0))),
            ]
        );

        Ok(())
    }

    #[test]
    fn working_windows_resolve_in_studio_time_zone() -> Result<(), jiff::Error> {
        let studio = TimeZone::fixed(offset(2));
        let hours = [hour(1, time(10, 0, 0, 0), time(18, 0, 0, 0))];

        let windows = working_windows(MONDAY, &hours, &studio)?;

        assert_eq!(
            windows.first().map(|window| window.start),
            Some(utc(MONDAY, time(8, 0, 0, 0)))
        );

        Ok(())
    }

    #[test]
    fn full_day_without_bookings_yields_every_interval() -> Result<(), jiff::Error> {
        let window = TimeRange::new(utc(MONDAY, time(10, 0, 0, 0)), utc(MONDAY, time(18, 0, 0, 0)));

        let slots = day_slots(&[window], &[], &rules(120, Padding::default()), Timestamp::UNIX_EPOCH)?;

        assert_eq!(slots.len(), 13);
        assert_eq!(
            slots.first().map(|slot| (slot.start, slot.end)),
            Some((utc(MONDAY, time(10, 0, 0, 0)), utc(MONDAY, time(12, 0, 0, 0))))
        );
        assert_eq!(
            slots.last().map(|slot| (slot.start, slot.end)),
            Some((utc(MONDAY, time(16, 0, 0, 0)), utc(MONDAY, time(18, 0, 0, 0))))
        );
        assert!(slots.iter().all(|slot| slot.duration_minutes == 120));

        Ok(())
    }

    #[test]
    fn padded_booking_blocks_its_expanded_range() -> Result<(), jiff::Error> {
        let padding = Padding::from_minutes(15, 15, 0);
        let window = TimeRange::new(utc(MONDAY, time(10, 0, 0, 0)), utc(MONDAY, time(18, 0, 0, 0)));
        let booking = TimeRange::new(utc(MONDAY, time(11, 0, 0, 0)), utc(MONDAY, time(12, 0, 0, 0)));
        let occupied = padding.expand(booking)?;

        assert_eq!(
            occupied,
            TimeRange::new(utc(MONDAY, time(10, 45, 0, 0)), utc(MONDAY, time(12, 15, 0, 0)))
        );

        let slots = day_slots(&[window], &[occupied], &rules(60, padding), Timestamp::UNIX_EPOCH)?;

        assert!(
            slots
                .iter()
                .all(|slot| !TimeRange::new(slot.start, slot.end).overlaps(&occupied))
        );
        assert_eq!(
            slots.first().map(|slot| slot.start),
            Some(utc(MONDAY, time(12, 30, 0, 0)))
        );

        Ok(())
    }

    #[test]
    fn unpadded_neighbours_may_touch() -> Result<(), jiff::Error> {
        let window = TimeRange::new(utc(MONDAY, time(10, 0, 0, 0)), utc(MONDAY, time(13, 0, 0, 0)));
        let occupied = TimeRange::new(utc(MONDAY, time(11, 0, 0, 0)), utc(MONDAY, time(12, 0, 0, 0)));

        let slots = day_slots(&[window], &[occupied], &rules(60, Padding::default()), Timestamp::UNIX_EPOCH)?;

        let starts: Vec<_> = slots.iter().map(|slot| slot.start).collect();

        assert_eq!(
            starts,
            vec![utc(MONDAY, time(10, 0, 0, 0)), utc(MONDAY, time(12, 0, 0, 0))]
        );

        Ok(())
    }

    #[test]
    fn duration_longer_than_window_yields_nothing() -> Result<(), jiff::Error> {
        let window = TimeRange::new(utc(MONDAY, time(10, 0, 0, 0)), utc(MONDAY, time(11, 0, 0, 0)));

        let slots = day_slots(&[window], &[], &rules(120, Padding::default()), Timestamp::UNIX_EPOCH)?;

        assert!(slots.is_empty());

        Ok(())
    }

    #[test]
    fn split_shifts_merge_in_order_without_duplicates() -> Result<(), jiff::Error> {
        let morning = TimeRange::new(utc(MONDAY, time(10, 0, 0, 0)), utc(MONDAY, time(12, 0, 0, 0)));
        let overlapping = TimeRange::new(utc(MONDAY, time(11, 0, 0, 0)), utc(MONDAY, time(13, 0, 0, 0)));
        let afternoon = TimeRange::new(utc(MONDAY, time(15, 0, 0, 0)), utc(MONDAY, time(16, 0, 0, 0)));

        let slots = day_slots(
            &[afternoon, morning, overlapping],
            &[],
            &rules(60, Padding::default()),
            Timestamp::UNIX_EPOCH,
        )?;

        let starts: Vec<_> = slots.iter().map(|slot| slot.start).collect();

        assert_eq!(
            starts,
            vec![
                utc(MONDAY, time(10, 0, 0, 0)),
                utc(MONDAY, time(10, 30, 0, 0)),
                utc(MONDAY, time(11, 0, 0, 0)),
                utc(MONDAY, time(11, 30, 0, 0)),
                utc(MONDAY, time(12, 0, 0, 0)),
                utc(MONDAY, time(15, 0, 0, 0)),
            ]
        );

        Ok(())
    }

    #[test]
    fn slots_not_after_now_are_dropped() -> Result<(), jiff::Error> {
        let window = TimeRange::new(utc(MONDAY, time(10, 0, 0, 0)), utc(MONDAY, time(13, 0, 0, 0)));
        let now = utc(MONDAY, time(11, 0, 0, 0));

        let slots = day_slots(&[window], &[], &rules(60, Padding::default()), now)?;

        assert_eq!(
            slots.first().map(|slot| slot.start),
            Some(utc(MONDAY, time(11, 30, 0, 0)))
        );

        Ok(())
    }

    #[test]
    fn check_range_reports_the_conflicting_range() {
        let window = TimeRange::new(utc(MONDAY, time(10, 0, 0, 0)), utc(MONDAY, time(18, 0, 0, 0)));
        let occupied = TimeRange::new(utc(MONDAY, time(10, 45, 0, 0)), utc(MONDAY, time(12, 15, 0, 0)));
        let requested = TimeRange::new(utc(MONDAY, time(12, 0, 0, 0)), utc(MONDAY, time(13, 0, 0, 0)));

        let result = check_range(requested, &[window], &[occupied], Padding::default(), false);

        assert_eq!(
            conflict_of(result),
            Some(SlotConflict {
                reason: UnavailableReason::Overlap,
                conflict: Some(occupied),
            })
        );
    }

    #[test]
    fn check_range_rejects_ranges_spilling_out_of_a_window() {
        let window = TimeRange::new(utc(MONDAY, time(10, 0, 0, 0)), utc(MONDAY, time(18, 0, 0, 0)));
        let requested = TimeRange::new(utc(MONDAY, time(17, 30, 0, 0)), utc(MONDAY, time(18, 30, 0, 0)));

        let result = check_range(requested, &[window], &[], Padding::default(), false);

        assert_eq!(
            conflict_of(result).map(|conflict| conflict.reason),
            Some(UnavailableReason::OutsideWorkingHours)
        );
    }

    #[test]
    fn check_range_rejects_absence_days_first() {
        let window = TimeRange::new(utc(MONDAY, time(10, 0, 0, 0)), utc(MONDAY, time(18, 0, 0, 0)));
        let requested = TimeRange::new(utc(MONDAY, time(11, 0, 0, 0)), utc(MONDAY, time(12, 0, 0, 0)));

        let result = check_range(requested, &[window], &[], Padding::default(), true);

        assert_eq!(
            conflict_of(result).map(|conflict| conflict.reason),
            Some(UnavailableReason::Absence)
        );
    }

    #[test]
    fn check_range_reports_padding_past_the_supported_range() {
        let requested = TimeRange::new(
            Timestamp::MAX - SignedDuration::from_hours(1),
            Timestamp::MAX,
        );
        let window = requested;

        let result = check_range(
            requested,
            &[window],
            &[],
            Padding::from_minutes(0, 30, 0),
            false,
        );

        assert!(
            matches!(result, Err(RangeCheckError::Time(_))),
            "overflowing padding must not fall back to the bare range, got {result:?}"
        );
    }

    #[test]
    fn extend_capped_flags_truncation() {
        let slot = Slot {
            start: Timestamp::UNIX_EPOCH,
            end: Timestamp::UNIX_EPOCH,
            duration_minutes: 30,
        };
        let mut list = SlotList::default();

        extend_capped(&mut list, vec![slot; 3], 5);
        assert!(!list.truncated);

        extend_capped(&mut list, vec![slot; 3], 5);
        assert_eq!(list.slots.len(), 5);
        assert!(list.truncated);
    }
}
