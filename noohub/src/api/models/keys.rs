//! API request/response models for keys.

use crate::db::models::keys::KeyRecord;
use crate::types::{KeyId, UserId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KeyCreate {
    pub name: String,
    /// Project the key may push to, or `*` for every project of the owner
    #[schema(default = "*")]
    pub project: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct KeyUpdate {
    pub name: Option<String>,
    pub project: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct KeyResponse {
    pub id: KeyId,
    pub user_id: UserId,
    pub name: String,
    pub project: String,
    pub active: bool,
}

impl From<KeyRecord> for KeyResponse {
    fn from(record: KeyRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            name: record.name,
            project: record.project,
            active: record.active,
        }
    }
}

/// A key together with the bearer token that authenticates as it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KeyWithToken {
    pub key: KeyResponse,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KeyList {
    pub keys: Vec<KeyResponse>,
}
