//! Database models for API keys.

use crate::types::{KeyId, UserId, WILDCARD_SCOPE};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A key row joined with its owner's username.
///
/// This is also the value stored in the key cache, serialized as JSON, so field names are part
/// of the cache format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct KeyRecord {
    pub id: KeyId,
    pub user_id: UserId,
    pub owner: String,
    pub name: String,
    /// A literal project name, or `*` for every project owned by `owner`
    pub project: String,
    pub active: bool,
}

/// Database request for creating a new key
#[derive(Debug, Clone)]
pub struct KeyCreateDBRequest {
    pub user_id: UserId,
    pub name: String,
    pub project: String,
}

impl KeyCreateDBRequest {
    pub fn new(user_id: UserId, name: String, project: Option<String>) -> Self {
        Self {
            user_id,
            name,
            project: project.unwrap_or_else(|| WILDCARD_SCOPE.to_string()),
        }
    }
}

/// Database request for updating a key
#[derive(Debug, Clone, Default)]
pub struct KeyUpdateDBRequest {
    pub name: Option<String>,
    pub project: Option<String>,
    pub active: Option<bool>,
}
