//! Database models for pushed project versions.

use crate::types::ProjectId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database request for storing a project version
#[derive(Debug, Clone)]
pub struct ProjectCreateDBRequest {
    pub username: String,
    pub name: String,
    pub version: String,
    pub spec: serde_json::Value,
}

/// Database response for a project version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ProjectDBResponse {
    pub id: ProjectId,
    pub username: String,
    pub name: String,
    pub version: String,
    pub spec: serde_json::Value,
}
