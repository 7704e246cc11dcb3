//! PostgreSQL storage implementation.

use sqlx::PgPool;
use tracing::instrument;

use super::{KeyRecords, Storage};
use crate::db::errors::{DbError, Result};
use crate::db::models::{
    keys::{KeyCreateDBRequest, KeyRecord, KeyUpdateDBRequest},
    projects::{ProjectCreateDBRequest, ProjectDBResponse},
    users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
};
use crate::types::{KeyId, UserId};

const KEY_COLUMNS: &str = "k.id, k.user_id, u.username AS owner, k.name, k.project, k.active";

#[derive(Clone)]
pub struct PostgresStorage {
    db: PgPool,
}

impl PostgresStorage {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }

    async fn fetch_key(&self, key_id: KeyId, user_id: Option<UserId>) -> Result<Option<KeyRecord>> {
        let key = sqlx::query_as::<_, KeyRecord>(&format!(
            "SELECT {KEY_COLUMNS} FROM keys k INNER JOIN users u ON k.user_id = u.id \
             WHERE k.id = $1 AND ($2::BIGINT IS NULL OR k.user_id = $2)"
        ))
        .bind(key_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(key)
    }
}

#[async_trait::async_trait]
impl KeyRecords for PostgresStorage {
    #[instrument(skip(self), err)]
    async fn get_key(&self, id: KeyId) -> Result<Option<KeyRecord>> {
        self.fetch_key(id, None).await
    }
}

#[async_trait::async_trait]
impl Storage for PostgresStorage {
    #[instrument(skip(self, request), fields(username = %request.username), err)]
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let user = sqlx::query_as::<_, UserDBResponse>(
            "INSERT INTO users (id, username) VALUES ($1, $2) RETURNING id, username, banned",
        )
        .bind(request.id)
        .bind(&request.username)
        .fetch_one(&self.db)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self), err)]
    async fn get_user(&self, username: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT id, username, banned FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    #[instrument(skip(self, request), err)]
    async fn update_user(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<UserDBResponse> {
        let user = sqlx::query_as::<_, UserDBResponse>(
            r#"
            UPDATE users SET
                username = COALESCE($2, username),
                banned = COALESCE($3, banned)
            WHERE id = $1
            RETURNING id, username, banned
            "#,
        )
        .bind(id)
        .bind(request.username.as_deref())
        .bind(request.banned)
        .fetch_optional(&self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(user)
    }

    #[instrument(skip(self), err)]
    async fn delete_user(&self, id: UserId) -> Result<bool> {
        // Keys go with the user via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(&self.db).await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(user_id = request.user_id, project = %request.project), err)]
    async fn create_key(&self, request: &KeyCreateDBRequest) -> Result<KeyRecord> {
        let key = sqlx::query_as::<_, KeyRecord>(&format!(
            "WITH k AS (INSERT INTO keys (user_id, name, project) VALUES ($1, $2, $3) RETURNING *) \
             SELECT {KEY_COLUMNS} FROM k INNER JOIN users u ON k.user_id = u.id"
        ))
        .bind(request.user_id)
        .bind(&request.name)
        .bind(&request.project)
        .fetch_one(&self.db)
        .await?;

        Ok(key)
    }

    #[instrument(skip(self), err)]
    async fn list_keys(&self, user_id: UserId) -> Result<Vec<KeyRecord>> {
        let keys = sqlx::query_as::<_, KeyRecord>(&format!(
            "SELECT {KEY_COLUMNS} FROM keys k INNER JOIN users u ON k.user_id = u.id WHERE k.user_id = $1 ORDER BY k.id"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(keys)
    }

    #[instrument(skip(self), err)]
    async fn get_user_key(&self, user_id: UserId, key_id: KeyId) -> Result<Option<KeyRecord>> {
        self.fetch_key(key_id, Some(user_id)).await
    }

    #[instrument(skip(self, request), err)]
    async fn update_key(&self, key_id: KeyId, request: &KeyUpdateDBRequest) -> Result<KeyRecord> {
        let key = sqlx::query_as::<_, KeyRecord>(&format!(
            "WITH k AS ( \
                UPDATE keys SET \
                    name = COALESCE($2, name), \
                    project = COALESCE($3, project), \
                    active = COALESCE($4, active) \
                WHERE id = $1 RETURNING * \
             ) \
             SELECT {KEY_COLUMNS} FROM k INNER JOIN users u ON k.user_id = u.id"
        ))
        .bind(key_id)
        .bind(request.name.as_deref())
        .bind(request.project.as_deref())
        .bind(request.active)
        .fetch_optional(&self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(key)
    }

    #[instrument(skip(self), err)]
    async fn delete_key(&self, key_id: KeyId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM keys WHERE id = $1").bind(key_id).execute(&self.db).await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn get_project(&self, username: &str, name: &str, version: Option<&str>) -> Result<Option<ProjectDBResponse>> {
        let project = sqlx::query_as::<_, ProjectDBResponse>(
            r#"
            SELECT id, username, name, version, spec
            FROM projects
            WHERE username = $1 AND name = $2 AND ($3::VARCHAR IS NULL OR version = $3)
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(username)
        .bind(name)
        .bind(version)
        .fetch_optional(&self.db)
        .await?;

        Ok(project)
    }

    #[instrument(skip(self, request), fields(username = %request.username, name = %request.name, version = %request.version), err)]
    async fn create_project(&self, request: &ProjectCreateDBRequest) -> Result<ProjectDBResponse> {
        let project = sqlx::query_as::<_, ProjectDBResponse>(
            r#"
            INSERT INTO projects (username, name, version, spec)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, name, version, spec
            "#,
        )
        .bind(&request.username)
        .bind(&request.name)
        .bind(&request.version)
        .bind(&request.spec)
        .fetch_one(&self.db)
        .await?;

        Ok(project)
    }
}
