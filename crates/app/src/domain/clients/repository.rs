//! Clients Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};

use crate::domain::clients::{
    data::ClientContact,
    records::{ClientRecord, ClientUuid},
};

const UPSERT_CLIENT_SQL: &str = include_str!("sql/upsert_client.sql");
const GET_CLIENT_SQL: &str = include_str!("sql/get_client.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgClientsRepository;

impl PgClientsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Insert the client, or refresh name and phone of the one already holding this email.
    pub(crate) async fn find_or_create(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        contact: &ClientContact,
    ) -> Result<ClientRecord, sqlx::Error> {
        query_as::<Postgres, ClientRecord>(UPSERT_CLIENT_SQL)
            .bind(ClientUuid::new().into_uuid())
            .bind(&contact.email)
            .bind(&contact.name)
            .bind(contact.phone.as_deref())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_client(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        client: ClientUuid,
    ) -> Result<ClientRecord, sqlx::Error> {
        query_as::<Postgres, ClientRecord>(GET_CLIENT_SQL)
            .bind(client.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for ClientRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: ClientUuid::from_uuid(row.try_get("uuid")?),
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            phone: row.try_get("phone")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
