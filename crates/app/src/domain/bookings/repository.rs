//! Bookings Repository

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::{
    database::{get_parsed, get_u32, get_u64, to_i32, to_i64},
    domain::{
        availability::slots::TimeRange,
        bookings::{
            data::NewBooking,
            records::{BookingRecord, BookingUuid, ProjectDetails},
            status::BookingStatus,
        },
        clients::records::ClientUuid,
        providers::records::ProviderUuid,
    },
};

const CREATE_BOOKING_SQL: &str = include_str!("sql/create_booking.sql");
const GET_BOOKING_SQL: &str = include_str!("sql/get_booking.sql");
const LOCK_BOOKING_SQL: &str = include_str!("sql/lock_booking.sql");
const UPDATE_STATUS_SQL: &str = include_str!("sql/update_status.sql");
const SET_GATEWAY_REFERENCE_SQL: &str = include_str!("sql/set_gateway_reference.sql");
const LIST_OCCUPIED_SQL: &str = include_str!("sql/list_occupied.sql");
const MARK_NOTIFICATION_FAILED_SQL: &str = include_str!("sql/mark_notification_failed.sql");
const LIST_DUE_REMINDERS_SQL: &str = include_str!("sql/list_due_reminders.sql");
const MARK_REMINDER_SENT_SQL: &str = include_str!("sql/mark_reminder_sent.sql");
const LIST_DUE_REVIEW_REQUESTS_SQL: &str = include_str!("sql/list_due_review_requests.sql");
const MARK_REVIEW_REQUESTED_SQL: &str = include_str!("sql/mark_review_requested.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgBookingsRepository;

impl PgBookingsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_booking(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking: &NewBooking,
    ) -> Result<BookingRecord, sqlx::Error> {
        query_as::<Postgres, BookingRecord>(CREATE_BOOKING_SQL)
            .bind(booking.uuid.into_uuid())
            .bind(booking.provider_uuid.into_uuid())
            .bind(booking.client_uuid.into_uuid())
            .bind(SqlxTimestamp::from(booking.range.start))
            .bind(SqlxTimestamp::from(booking.range.end))
            .bind(to_i32(booking.duration_minutes, "duration_minutes")?)
            .bind(SqlxTimestamp::from(booking.occupied.start))
            .bind(SqlxTimestamp::from(booking.occupied.end))
            .bind(booking.kind.as_str())
            .bind(to_i64(booking.price, "price")?)
            .bind(to_i64(booking.deposit_amount, "deposit_amount")?)
            .bind(booking.project.description.as_deref())
            .bind(booking.project.zone.as_deref())
            .bind(booking.project.size.as_deref())
            .bind(booking.project.style.as_deref())
            .bind(&booking.project.reference_photos)
            .bind(booking.project.notes.as_deref())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_booking(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking: BookingUuid,
    ) -> Result<BookingRecord, sqlx::Error> {
        query_as::<Postgres, BookingRecord>(GET_BOOKING_SQL)
            .bind(booking.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    /// Fetch the booking holding its row lock until the transaction ends.
    pub(crate) async fn lock_booking(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking: BookingUuid,
    ) -> Result<BookingRecord, sqlx::Error> {
        query_as::<Postgres, BookingRecord>(LOCK_BOOKING_SQL)
            .bind(booking.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    /// Store a new status, stamping the matching `*_at` column. `deposit_paid` can only be
    /// raised, never cleared.
    pub(crate) async fn update_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking: BookingUuid,
        status: BookingStatus,
        deposit_paid: bool,
    ) -> Result<BookingRecord, sqlx::Error> {
        query_as::<Postgres, BookingRecord>(UPDATE_STATUS_SQL)
            .bind(booking.into_uuid())
            .bind(status.as_str())
            .bind(deposit_paid)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn set_gateway_reference(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking: BookingUuid,
        reference: &str,
    ) -> Result<(), sqlx::Error> {
        query(SET_GATEWAY_REFERENCE_SQL)
            .bind(booking.into_uuid())
            .bind(reference)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Expanded ranges of active bookings intersecting `[from, until)`.
    pub(crate) async fn list_occupied(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        provider: ProviderUuid,
        from: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<TimeRange>, sqlx::Error> {
        let rows: Vec<(SqlxTimestamp, SqlxTimestamp)> = query_as(LIST_OCCUPIED_SQL)
            .bind(provider.into_uuid())
            .bind(SqlxTimestamp::from(from))
            .bind(SqlxTimestamp::from(until))
            .fetch_all(&mut **tx)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(start, end)| TimeRange::new(start.to_jiff(), end.to_jiff()))
            .collect())
    }

    pub(crate) async fn mark_notification_failed(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking: BookingUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(MARK_NOTIFICATION_FAILED_SQL)
            .bind(booking.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Confirmed bookings starting in `[from, until)` that have not been reminded yet.
    pub(crate) async fn list_due_reminders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        from: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<BookingRecord>, sqlx::Error> {
        query_as::<Postgres, BookingRecord>(LIST_DUE_REMINDERS_SQL)
            .bind(SqlxTimestamp::from(from))
            .bind(SqlxTimestamp::from(until))
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn mark_reminder_sent(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking: BookingUuid,
        sent_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        query(MARK_REMINDER_SENT_SQL)
            .bind(booking.into_uuid())
            .bind(SqlxTimestamp::from(sent_at))
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Completed bookings, finished by `completed_before`, still waiting for a review request.
    pub(crate) async fn list_due_review_requests(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        completed_before: Timestamp,
    ) -> Result<Vec<BookingRecord>, sqlx::Error> {
        query_as::<Postgres, BookingRecord>(LIST_DUE_REVIEW_REQUESTS_SQL)
            .bind(SqlxTimestamp::from(completed_before))
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn mark_review_requested(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking: BookingUuid,
        requested_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        query(MARK_REVIEW_REQUESTED_SQL)
            .bind(booking.into_uuid())
            .bind(SqlxTimestamp::from(requested_at))
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}

fn optional_timestamp(row: &PgRow, column: &str) -> sqlx::Result<Option<Timestamp>> {
    Ok(row
        .try_get::<Option<SqlxTimestamp>, _>(column)?
        .map(SqlxTimestamp::to_jiff))
}

impl<'r> FromRow<'r, PgRow> for BookingRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: BookingUuid::from_uuid(row.try_get("uuid")?),
            provider_uuid: ProviderUuid::from_uuid(row.try_get("provider_uuid")?),
            client_uuid: ClientUuid::from_uuid(row.try_get("client_uuid")?),
            starts_at: row.try_get::<SqlxTimestamp, _>("starts_at")?.to_jiff(),
            ends_at: row.try_get::<SqlxTimestamp, _>("ends_at")?.to_jiff(),
            duration_minutes: get_u32(row, "duration_minutes")?,
            occupied: TimeRange::new(
                row.try_get::<SqlxTimestamp, _>("occupied_from")?.to_jiff(),
                row.try_get::<SqlxTimestamp, _>("occupied_until")?.to_jiff(),
            ),
            kind: get_parsed(row, "kind")?,
            status: get_parsed(row, "status")?,
            price: get_u64(row, "price")?,
            deposit_amount: get_u64(row, "deposit_amount")?,
            deposit_paid: row.try_get("deposit_paid")?,
            gateway_reference: row.try_get("gateway_reference")?,
            project: ProjectDetails {
                description: row.try_get("description")?,
                zone: row.try_get("zone")?,
                size: row.try_get("size")?,
                style: row.try_get("style")?,
                reference_photos: row.try_get("reference_photos")?,
                notes: row.try_get("notes")?,
            },
            notification_failed: row.try_get("notification_failed")?,
            reminder_sent_at: optional_timestamp(row, "reminder_sent_at")?,
            review_requested_at: optional_timestamp(row, "review_requested_at")?,
            confirmed_at: optional_timestamp(row, "confirmed_at")?,
            cancelled_at: optional_timestamp(row, "cancelled_at")?,
            completed_at: optional_timestamp(row, "completed_at")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
