//! API request/response models for projects.

use crate::db::models::projects::ProjectDBResponse;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// A pushed project version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProjectResponse {
    pub name: String,
    pub username: String,
    pub version: String,
    /// The project document exactly as it was pushed
    #[schema(value_type = Object)]
    pub spec: serde_json::Value,
}

impl From<ProjectDBResponse> for ProjectResponse {
    fn from(db: ProjectDBResponse) -> Self {
        Self {
            name: db.name,
            username: db.username,
            version: db.version,
            spec: db.spec,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProjectVersionQuery {
    /// Version to fetch. The most recently pushed version is returned when omitted.
    pub version: Option<String>,
}
