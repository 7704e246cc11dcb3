//! In-memory storage implementation.
//!
//! Holds users, keys and projects in process memory behind a single lock. It mirrors the
//! PostgreSQL constraints the handlers rely on (unique usernames and project versions, key
//! cascade on user delete) and is used by the test suite and for local development. Data is lost
//! on restart.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{KeyRecords, Storage};
use crate::db::errors::{DbError, Result};
use crate::db::models::{
    keys::{KeyCreateDBRequest, KeyRecord, KeyUpdateDBRequest},
    projects::{ProjectCreateDBRequest, ProjectDBResponse},
    users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
};
use crate::types::{KeyId, ProjectId, UserId};

#[derive(Debug, Clone)]
struct StoredKey {
    id: KeyId,
    user_id: UserId,
    name: String,
    project: String,
    active: bool,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, UserDBResponse>,
    keys: BTreeMap<KeyId, StoredKey>,
    projects: BTreeMap<ProjectId, ProjectDBResponse>,
    next_key_id: KeyId,
    next_project_id: ProjectId,
}

impl Tables {
    fn key_record(&self, key: &StoredKey) -> Result<KeyRecord> {
        let owner = self.users.get(&key.user_id).ok_or(DbError::NotFound)?;
        Ok(KeyRecord {
            id: key.id,
            user_id: key.user_id,
            owner: owner.username.clone(),
            name: key.name.clone(),
            project: key.project.clone(),
            active: key.active,
        })
    }

    fn insert_key(&mut self, id: KeyId, user_id: UserId, name: &str, project: &str, active: bool) -> Result<KeyRecord> {
        if self.keys.contains_key(&id) {
            return Err(Self::unique_violation("keys", "keys_pkey"));
        }
        if !self.users.contains_key(&user_id) {
            return Err(DbError::ForeignKeyViolation {
                constraint: Some("keys_user_id_fkey".to_string()),
                table: Some("keys".to_string()),
                message: format!("user {user_id} does not exist"),
            });
        }

        let key = StoredKey {
            id,
            user_id,
            name: name.to_string(),
            project: project.to_string(),
            active,
        };
        self.next_key_id = self.next_key_id.max(id);
        self.keys.insert(id, key.clone());
        self.key_record(&key)
    }

    fn unique_violation(table: &str, constraint: &str) -> DbError {
        DbError::UniqueViolation {
            constraint: Some(constraint.to_string()),
            table: Some(table.to_string()),
            message: format!("duplicate key value violates unique constraint \"{constraint}\""),
        }
    }
}

/// In-memory implementation of [`Storage`].
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key with an explicit id, as an external provisioning tool would.
    pub fn insert_key(&self, id: KeyId, user_id: UserId, name: &str, project: &str, active: bool) -> Result<KeyRecord> {
        self.tables.write().insert_key(id, user_id, name, project, active)
    }
}

#[async_trait::async_trait]
impl KeyRecords for InMemoryStorage {
    async fn get_key(&self, id: KeyId) -> Result<Option<KeyRecord>> {
        let tables = self.tables.read();
        tables.keys.get(&id).map(|key| tables.key_record(key)).transpose()
    }
}

#[async_trait::async_trait]
impl Storage for InMemoryStorage {
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let mut tables = self.tables.write();

        if tables.users.contains_key(&request.id) {
            return Err(Tables::unique_violation("users", "users_pkey"));
        }
        if tables.users.values().any(|u| u.username == request.username) {
            return Err(Tables::unique_violation("users", "users_username_key"));
        }

        let user = UserDBResponse {
            id: request.id,
            username: request.username.clone(),
            banned: false,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, username: &str) -> Result<Option<UserDBResponse>> {
        let tables = self.tables.read();
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn update_user(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<UserDBResponse> {
        let mut tables = self.tables.write();

        if let Some(username) = &request.username
            && tables.users.values().any(|u| u.id != id && &u.username == username)
        {
            return Err(Tables::unique_violation("users", "users_username_key"));
        }

        let user = tables.users.get_mut(&id).ok_or(DbError::NotFound)?;
        if let Some(username) = &request.username {
            user.username = username.clone();
        }
        if let Some(banned) = request.banned {
            user.banned = banned;
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let mut tables = self.tables.write();
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.keys.retain(|_, key| key.user_id != id);
        Ok(true)
    }

    async fn create_key(&self, request: &KeyCreateDBRequest) -> Result<KeyRecord> {
        let mut tables = self.tables.write();
        let id = tables
            .next_key_id
            .checked_add(1)
            .ok_or_else(|| DbError::Other(anyhow::anyhow!("key id sequence exhausted")))?;
        tables.insert_key(id, request.user_id, &request.name, &request.project, true)
    }

    async fn list_keys(&self, user_id: UserId) -> Result<Vec<KeyRecord>> {
        let tables = self.tables.read();
        tables
            .keys
            .values()
            .filter(|key| key.user_id == user_id)
            .map(|key| tables.key_record(key))
            .collect()
    }

    async fn get_user_key(&self, user_id: UserId, key_id: KeyId) -> Result<Option<KeyRecord>> {
        let tables = self.tables.read();
        tables
            .keys
            .get(&key_id)
            .filter(|key| key.user_id == user_id)
            .map(|key| tables.key_record(key))
            .transpose()
    }

    async fn update_key(&self, key_id: KeyId, request: &KeyUpdateDBRequest) -> Result<KeyRecord> {
        let mut tables = self.tables.write();
        let key = tables.keys.get_mut(&key_id).ok_or(DbError::NotFound)?;

        if let Some(name) = &request.name {
            key.name = name.clone();
        }
        if let Some(project) = &request.project {
            key.project = project.clone();
        }
        if let Some(active) = request.active {
            key.active = active;
        }

        let key = key.clone();
        tables.key_record(&key)
    }

    async fn delete_key(&self, key_id: KeyId) -> Result<bool> {
        Ok(self.tables.write().keys.remove(&key_id).is_some())
    }

    async fn get_project(&self, username: &str, name: &str, version: Option<&str>) -> Result<Option<ProjectDBResponse>> {
        let tables = self.tables.read();
        // BTreeMap iterates in id order, so the last match is the most recent push
        Ok(tables
            .projects
            .values()
            .rev()
            .find(|p| p.username == username && p.name == name && version.is_none_or(|v| p.version == v))
            .cloned())
    }

    async fn create_project(&self, request: &ProjectCreateDBRequest) -> Result<ProjectDBResponse> {
        let mut tables = self.tables.write();

        if tables
            .projects
            .values()
            .any(|p| p.username == request.username && p.name == request.name && p.version == request.version)
        {
            return Err(Tables::unique_violation("projects", "projects_version_unique"));
        }

        tables.next_project_id += 1;
        let project = ProjectDBResponse {
            id: tables.next_project_id,
            username: request.username.clone(),
            name: request.name.clone(),
            version: request.version.clone(),
            spec: request.spec.clone(),
        };
        tables.projects.insert(project.id, project.clone());
        Ok(project)
    }
}
