//! Payments Repository

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, query_scalar};

use crate::{
    database::{get_parsed, get_u64, to_i64},
    domain::{
        bookings::records::BookingUuid,
        payments::{
            data::NewPayment,
            records::{PaymentKind, PaymentRecord, PaymentUuid},
        },
        providers::records::ProviderUuid,
    },
};

const CREATE_PAYMENT_SQL: &str = include_str!("sql/create_payment.sql");
const LOCK_PAYMENT_SQL: &str = include_str!("sql/lock_payment.sql");
const LOCK_PAYMENT_BY_INTENT_SQL: &str = include_str!("sql/lock_payment_by_intent.sql");
const SETTLE_PAYMENT_SQL: &str = include_str!("sql/settle_payment.sql");
const SETTLED_TOTAL_SQL: &str = include_str!("sql/settled_total.sql");
const FIND_PENDING_REQUEST_SQL: &str = include_str!("sql/find_pending_request.sql");
const HAS_OPEN_CHECKOUT_SQL: &str = include_str!("sql/has_open_checkout.sql");
const RECORD_EVENT_SQL: &str = include_str!("sql/record_event.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgPaymentsRepository;

impl PgPaymentsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_payment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        payment: &NewPayment,
    ) -> Result<PaymentRecord, sqlx::Error> {
        query_as::<Postgres, PaymentRecord>(CREATE_PAYMENT_SQL)
            .bind(payment.uuid.into_uuid())
            .bind(payment.booking_uuid.into_uuid())
            .bind(payment.provider_uuid.into_uuid())
            .bind(to_i64(payment.amount, "amount")?)
            .bind(payment.kind.as_str())
            .bind(payment.method.as_str())
            .bind(payment.status.as_str())
            .bind(payment.gateway_session_id.as_deref())
            .bind(payment.checkout_url.as_deref())
            .bind(payment.settled_at.map(SqlxTimestamp::from))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn lock_payment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        payment: PaymentUuid,
    ) -> Result<Option<PaymentRecord>, sqlx::Error> {
        query_as::<Postgres, PaymentRecord>(LOCK_PAYMENT_SQL)
            .bind(payment.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn lock_payment_by_intent(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        intent_id: &str,
    ) -> Result<Option<PaymentRecord>, sqlx::Error> {
        query_as::<Postgres, PaymentRecord>(LOCK_PAYMENT_BY_INTENT_SQL)
            .bind(intent_id)
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn settle_payment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        payment: PaymentUuid,
        settled_at: Timestamp,
        intent_id: Option<&str>,
    ) -> Result<PaymentRecord, sqlx::Error> {
        query_as::<Postgres, PaymentRecord>(SETTLE_PAYMENT_SQL)
            .bind(payment.into_uuid())
            .bind(SqlxTimestamp::from(settled_at))
            .bind(intent_id)
            .fetch_one(&mut **tx)
            .await
    }

    /// Sum of settled payment amounts for `booking`.
    pub(crate) async fn settled_total(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking: BookingUuid,
    ) -> Result<u64, sqlx::Error> {
        let total: i64 = query_scalar(SETTLED_TOTAL_SQL)
            .bind(booking.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        u64::try_from(total).map_err(|e| sqlx::Error::ColumnDecode {
            index: "amount".to_string(),
            source: Box::new(e),
        })
    }

    /// Latest unpaid checkout already issued for the same kind and amount.
    pub(crate) async fn find_pending_request(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking: BookingUuid,
        kind: PaymentKind,
        amount: u64,
    ) -> Result<Option<PaymentRecord>, sqlx::Error> {
        query_as::<Postgres, PaymentRecord>(FIND_PENDING_REQUEST_SQL)
            .bind(booking.into_uuid())
            .bind(kind.as_str())
            .bind(to_i64(amount, "amount")?)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Whether any unpaid checkout of `kind` is still open for `booking`.
    pub(crate) async fn has_open_checkout(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        booking: BookingUuid,
        kind: PaymentKind,
    ) -> Result<bool, sqlx::Error> {
        query_scalar(HAS_OPEN_CHECKOUT_SQL)
            .bind(booking.into_uuid())
            .bind(kind.as_str())
            .fetch_one(&mut **tx)
            .await
    }

    /// Remember a gateway event. Returns `false` when it was seen before.
    pub(crate) async fn record_event(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event_id: &str,
        kind: &str,
    ) -> Result<bool, sqlx::Error> {
        let rows_affected = query(RECORD_EVENT_SQL)
            .bind(event_id)
            .bind(kind)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected == 1)
    }
}

impl<'r> FromRow<'r, PgRow> for PaymentRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: PaymentUuid::from_uuid(row.try_get("uuid")?),
            booking_uuid: BookingUuid::from_uuid(row.try_get("booking_uuid")?),
            provider_uuid: ProviderUuid::from_uuid(row.try_get("provider_uuid")?),
            amount: get_u64(row, "amount")?,
            kind: get_parsed(row, "kind")?,
            method: get_parsed(row, "method")?,
            status: get_parsed(row, "status")?,
            gateway_session_id: row.try_get("gateway_session_id")?,
            gateway_intent_id: row.try_get("gateway_intent_id")?,
            checkout_url: row.try_get("checkout_url")?,
            settled_at: row
                .try_get::<Option<SqlxTimestamp>, _>("settled_at")?
                .map(SqlxTimestamp::to_jiff),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
