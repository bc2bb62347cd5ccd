//! Database connection management

use async_trait::async_trait;
use mockall::automock;
use sqlx::{
    PgPool, Postgres, Row, Transaction,
    postgres::{PgPoolOptions, PgRow},
    query,
};

/// Raised to `SERIALIZABLE` for operations whose read-then-write must not race.
const SET_SERIALIZABLE_SQL: &str = "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE";

/// `serialization_failure`, reported when a serializable transaction lost a race.
const SERIALIZATION_FAILURE: &str = "40001";

/// `deadlock_detected`.
const DEADLOCK_DETECTED: &str = "40P01";

/// `exclusion_violation`, raised by the booking overlap constraint.
const EXCLUSION_VIOLATION: &str = "23P01";

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

const PING_SQL: &str = "SELECT 1";

#[derive(Debug, Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Begin a read-committed transaction.
    ///
    /// # Errors
    ///
    /// Returns an error when starting the transaction fails.
    pub async fn begin_transaction(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Begin a transaction running at `SERIALIZABLE` isolation.
    ///
    /// # Errors
    ///
    /// Returns an error when starting the transaction or raising its isolation level fails.
    pub async fn begin_serializable_transaction(
        &self,
    ) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        query(SET_SERIALIZABLE_SQL).execute(&mut *tx).await?;

        Ok(tx)
    }
}

/// Round trip to the database, used by the health endpoint.
#[automock]
#[async_trait]
pub trait DatabaseHealth: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when no connection can be acquired or the query fails.
    async fn ping(&self) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl DatabaseHealth for Db {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        query(PING_SQL).execute(&self.pool).await?;

        Ok(())
    }
}

/// Connect to `PostgreSQL`.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(DEFAULT_MAX_CONNECTIONS)
        .connect(database_url)
        .await
}

/// Apply pending migrations.
///
/// # Errors
///
/// Returns an error if a migration fails to apply.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

/// Whether the transaction that produced `error` can be retried from scratch.
pub(crate) fn is_retryable(error: &sqlx::Error) -> bool {
    has_code(error, SERIALIZATION_FAILURE) || has_code(error, DEADLOCK_DETECTED)
}

pub(crate) fn is_exclusion_violation(error: &sqlx::Error) -> bool {
    has_code(error, EXCLUSION_VIOLATION)
}

/// Read an unsigned integer column stored as `INTEGER`.
pub(crate) fn get_u32(row: &PgRow, column: &str) -> Result<u32, sqlx::Error> {
    let value: i32 = row.try_get(column)?;

    u32::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Read a money column stored as `BIGINT` minor units.
pub(crate) fn get_u64(row: &PgRow, column: &str) -> Result<u64, sqlx::Error> {
    let value: i64 = row.try_get(column)?;

    u64::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Convert an unsigned value for binding to a `BIGINT` parameter.
pub(crate) fn to_i64(value: u64, column: &str) -> Result<i64, sqlx::Error> {
    i64::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Convert an unsigned value for binding to an `INTEGER` parameter.
pub(crate) fn to_i32(value: u32, column: &str) -> Result<i32, sqlx::Error> {
    i32::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Parse a text enum column through its `FromStr` implementation.
pub(crate) fn get_parsed<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value: String = row.try_get(column)?;

    value.parse().map_err(|e: T::Err| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn has_code(error: &sqlx::Error, code: &str) -> bool {
    error
        .as_database_error()
        .and_then(|database_error| database_error.code())
        .is_some_and(|actual| actual == code)
}
