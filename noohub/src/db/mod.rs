//! Database layer for data persistence and access.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐      ┌──────────────┐
//! │  Handlers   │      │   KeyStore   │  (auth::key_store, cache-aside)
//! └──────┬──────┘      └──────┬───────┘
//!        │ Storage            │ KeyRecords
//!        ↓                    ↓
//! ┌──────────────────────────────────┐
//! │ PostgresStorage / InMemoryStorage│
//! └──────────────────────────────────┘
//! ```
//!
//! The key lookup used by authentication is split into its own narrow [`KeyRecords`] trait so the
//! auth layer only ever sees a read-by-primary-key capability. Everything else (user, key and
//! project management) goes through [`Storage`].
//!
//! # Modules
//!
//! - [`postgres`]: SQLx/PostgreSQL implementation used in production
//! - [`in_memory`]: Process-local implementation for tests and local development
//! - [`models`]: Database record structures matching table schemas
//! - [`errors`]: Database-specific error types

pub mod errors;
pub mod in_memory;
pub mod models;
pub mod postgres;

pub use in_memory::InMemoryStorage;
pub use postgres::PostgresStorage;

use crate::db::errors::Result;
use crate::db::models::{
    keys::{KeyCreateDBRequest, KeyRecord, KeyUpdateDBRequest},
    projects::{ProjectCreateDBRequest, ProjectDBResponse},
    users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
};
use crate::types::{KeyId, UserId};

/// Read access to key records by primary key.
///
/// Inactive keys are returned as-is; deciding whether a key is usable is the caller's job.
#[async_trait::async_trait]
pub trait KeyRecords: Send + Sync {
    async fn get_key(&self, id: KeyId) -> Result<Option<KeyRecord>>;
}

/// Persistent store for users, keys and project versions.
#[async_trait::async_trait]
pub trait Storage: KeyRecords {
    /// Create a user. Fails with `UniqueViolation` if the id or username is taken.
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse>;

    async fn get_user(&self, username: &str) -> Result<Option<UserDBResponse>>;

    /// Update a user. Fails with `NotFound` if the user does not exist.
    async fn update_user(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<UserDBResponse>;

    /// Delete a user and all of their keys. Returns whether a user was deleted.
    async fn delete_user(&self, id: UserId) -> Result<bool>;

    async fn create_key(&self, request: &KeyCreateDBRequest) -> Result<KeyRecord>;

    async fn list_keys(&self, user_id: UserId) -> Result<Vec<KeyRecord>>;

    /// Get a key only if it belongs to `user_id`.
    async fn get_user_key(&self, user_id: UserId, key_id: KeyId) -> Result<Option<KeyRecord>>;

    /// Update a key. Fails with `NotFound` if the key does not exist.
    async fn update_key(&self, key_id: KeyId, request: &KeyUpdateDBRequest) -> Result<KeyRecord>;

    async fn delete_key(&self, key_id: KeyId) -> Result<bool>;

    /// Get a specific version of a project, or the most recently pushed one when `version` is `None`.
    async fn get_project(&self, username: &str, name: &str, version: Option<&str>) -> Result<Option<ProjectDBResponse>>;

    /// Store a project version. Fails with `UniqueViolation` if that version already exists.
    async fn create_project(&self, request: &ProjectCreateDBRequest) -> Result<ProjectDBResponse>;
}
