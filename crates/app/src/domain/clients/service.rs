//! Clients service.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::clients::{
        data::ClientContact,
        errors::ClientsServiceError,
        records::{ClientRecord, ClientUuid},
        repository::PgClientsRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgClientsService {
    db: Db,
    repository: PgClientsRepository,
}

impl PgClientsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgClientsRepository::new(),
        }
    }
}

#[async_trait]
impl ClientsService for PgClientsService {
    async fn find_or_create_client(
        &self,
        contact: ClientContact,
    ) -> Result<ClientRecord, ClientsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let client = self.repository.find_or_create(&mut tx, &contact).await?;

        tx.commit().await?;

        Ok(client)
    }

    async fn get_client(&self, client: ClientUuid) -> Result<ClientRecord, ClientsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let record = self.repository.get_client(&mut tx, client).await?;

        tx.commit().await?;

        Ok(record)
    }
}

#[automock]
#[async_trait]
pub trait ClientsService: Send + Sync {
    /// Look a client up by email (case-insensitive), creating it when absent.
    async fn find_or_create_client(
        &self,
        contact: ClientContact,
    ) -> Result<ClientRecord, ClientsServiceError>;

    async fn get_client(&self, client: ClientUuid) -> Result<ClientRecord, ClientsServiceError>;
}
