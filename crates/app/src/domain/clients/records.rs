//! Client Records

use jiff::Timestamp;

use crate::uuids::TypedUuid;

/// Client UUID
pub type ClientUuid = TypedUuid<ClientRecord>;

/// Client Record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    pub uuid: ClientUuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
