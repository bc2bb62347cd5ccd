//! Providers Repository

use jiff::civil::Date;
use jiff_sqlx::{Date as SqlxDate, Time as SqlxTime, Timestamp as SqlxTimestamp};
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::{
    database::{get_parsed, get_u32, to_i32},
    domain::providers::{
        data::{GatewayAccount, NewAbsence, NewProvider, NewWorkingHour, SubscriptionUpdate},
        records::{
            AbsenceRecord, AbsenceUuid, ProviderRecord, ProviderUuid, SubscriptionState,
            WorkingHourRecord, WorkingHourUuid,
        },
    },
};

const CREATE_PROVIDER_SQL: &str = include_str!("sql/create_provider.sql");
const GET_PROVIDER_SQL: &str = include_str!("sql/get_provider.sql");
const LOCK_PROVIDER_SQL: &str = include_str!("sql/lock_provider.sql");
const DELETE_WORKING_HOURS_SQL: &str = include_str!("sql/delete_working_hours.sql");
const CREATE_WORKING_HOUR_SQL: &str = include_str!("sql/create_working_hour.sql");
const LIST_WORKING_HOURS_SQL: &str = include_str!("sql/list_working_hours.sql");
const CREATE_ABSENCE_SQL: &str = include_str!("sql/create_absence.sql");
const LIST_ABSENCES_SQL: &str = include_str!("sql/list_absences.sql");
const SET_GATEWAY_ACCOUNT_SQL: &str = include_str!("sql/set_gateway_account.sql");
const UPDATE_SUBSCRIPTION_BY_PROVIDER_SQL: &str =
    include_str!("sql/update_subscription_by_provider.sql");
const UPDATE_SUBSCRIPTION_BY_ID_SQL: &str = include_str!("sql/update_subscription_by_id.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgProvidersRepository;

impl PgProvidersRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_provider(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        provider: &NewProvider,
    ) -> Result<ProviderRecord, sqlx::Error> {
        query_as::<Postgres, ProviderRecord>(CREATE_PROVIDER_SQL)
            .bind(provider.uuid.into_uuid())
            .bind(&provider.name)
            .bind(&provider.email)
            .bind(to_i32(provider.prep_minutes, "prep_minutes")?)
            .bind(to_i32(provider.cleanup_minutes, "cleanup_minutes")?)
            .bind(to_i32(provider.buffer_minutes, "buffer_minutes")?)
            .bind(to_i32(
                provider.slot_interval_minutes,
                "slot_interval_minutes",
            )?)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_provider(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        provider: ProviderUuid,
    ) -> Result<ProviderRecord, sqlx::Error> {
        query_as::<Postgres, ProviderRecord>(GET_PROVIDER_SQL)
            .bind(provider.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    /// Fetch the provider and hold its row lock until the transaction ends, serialising
    /// concurrent booking attempts for the same provider.
    pub(crate) async fn lock_provider(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        provider: ProviderUuid,
    ) -> Result<ProviderRecord, sqlx::Error> {
        query_as::<Postgres, ProviderRecord>(LOCK_PROVIDER_SQL)
            .bind(provider.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn replace_working_hours(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        provider: ProviderUuid,
        hours: &[NewWorkingHour],
    ) -> Result<Vec<WorkingHourRecord>, sqlx::Error> {
        query(DELETE_WORKING_HOURS_SQL)
            .bind(provider.into_uuid())
            .execute(&mut **tx)
            .await?;

        let mut created = Vec::with_capacity(hours.len());

        for hour in hours {
            let record = query_as::<Postgres, WorkingHourRecord>(CREATE_WORKING_HOUR_SQL)
                .bind(WorkingHourUuid::new().into_uuid())
                .bind(provider.into_uuid())
                .bind(i16::from(hour.day_of_week))
                .bind(SqlxTime::from(hour.starts_at))
                .bind(SqlxTime::from(hour.ends_at))
                .fetch_one(&mut **tx)
                .await?;

            created.push(record);
        }

        Ok(created)
    }

    pub(crate) async fn list_working_hours(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        provider: ProviderUuid,
    ) -> Result<Vec<WorkingHourRecord>, sqlx::Error> {
        query_as::<Postgres, WorkingHourRecord>(LIST_WORKING_HOURS_SQL)
            .bind(provider.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn create_absence(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        provider: ProviderUuid,
        absence: &NewAbsence,
    ) -> Result<AbsenceRecord, sqlx::Error> {
        query_as::<Postgres, AbsenceRecord>(CREATE_ABSENCE_SQL)
            .bind(AbsenceUuid::new().into_uuid())
            .bind(provider.into_uuid())
            .bind(SqlxDate::from(absence.date))
            .bind(absence.reason.as_deref())
            .fetch_one(&mut **tx)
            .await
    }

    /// Absences falling on any day in the inclusive range.
    pub(crate) async fn list_absences(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        provider: ProviderUuid,
        from: Date,
        until: Date,
    ) -> Result<Vec<AbsenceRecord>, sqlx::Error> {
        query_as::<Postgres, AbsenceRecord>(LIST_ABSENCES_SQL)
            .bind(provider.into_uuid())
            .bind(SqlxDate::from(from))
            .bind(SqlxDate::from(until))
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn set_gateway_account(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        provider: ProviderUuid,
        account: &GatewayAccount,
    ) -> Result<ProviderRecord, sqlx::Error> {
        query_as::<Postgres, ProviderRecord>(SET_GATEWAY_ACCOUNT_SQL)
            .bind(provider.into_uuid())
            .bind(&account.account_id)
            .bind(account.onboarded)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn update_subscription_for_provider(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        provider: ProviderUuid,
        update: &SubscriptionUpdate,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(UPDATE_SUBSCRIPTION_BY_PROVIDER_SQL)
            .bind(provider.into_uuid())
            .bind(update.customer_id.as_deref())
            .bind(update.subscription_id.as_deref())
            .bind(update.status.as_str())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn update_subscription_by_id(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        subscription_id: &str,
        update: &SubscriptionUpdate,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(UPDATE_SUBSCRIPTION_BY_ID_SQL)
            .bind(subscription_id)
            .bind(update.customer_id.as_deref())
            .bind(update.status.as_str())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

impl<'r> FromRow<'r, PgRow> for ProviderRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: ProviderUuid::from_uuid(row.try_get("uuid")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            prep_minutes: get_u32(row, "prep_minutes")?,
            cleanup_minutes: get_u32(row, "cleanup_minutes")?,
            buffer_minutes: get_u32(row, "buffer_minutes")?,
            slot_interval_minutes: get_u32(row, "slot_interval_minutes")?,
            gateway_account_id: row.try_get("gateway_account_id")?,
            gateway_onboarded: row.try_get("gateway_onboarded")?,
            subscription: SubscriptionState {
                customer_id: row.try_get("gateway_customer_id")?,
                subscription_id: row.try_get("gateway_subscription_id")?,
                status: get_parsed(row, "subscription_status")?,
            },
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for WorkingHourRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let day_of_week: i16 = row.try_get("day_of_week")?;

        Ok(Self {
            uuid: WorkingHourUuid::from_uuid(row.try_get("uuid")?),
            provider_uuid: ProviderUuid::from_uuid(row.try_get("provider_uuid")?),
            day_of_week: i8::try_from(day_of_week).map_err(|e| sqlx::Error::ColumnDecode {
                index: "day_of_week".to_string(),
                source: Box::new(e),
            })?,
            starts_at: row.try_get::<SqlxTime, _>("starts_at")?.to_jiff(),
            ends_at: row.try_get::<SqlxTime, _>("ends_at")?.to_jiff(),
            active: row.try_get("active")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for AbsenceRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: AbsenceUuid::from_uuid(row.try_get("uuid")?),
            provider_uuid: ProviderUuid::from_uuid(row.try_get("provider_uuid")?),
            date: row.try_get::<SqlxDate, _>("date")?.to_jiff(),
            reason: row.try_get("reason")?,
        })
    }
}
