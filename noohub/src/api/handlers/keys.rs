use crate::{
    AppState,
    api::handlers::find_user,
    api::models::keys::{KeyCreate, KeyList, KeyResponse, KeyUpdate, KeyWithToken},
    auth::{Identity, scope::require_admin},
    db::models::{
        keys::{KeyCreateDBRequest, KeyRecord, KeyUpdateDBRequest},
        users::UserDBResponse,
    },
    errors::{Error, Result},
    types::KeyId,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

/// Attach a freshly encoded token to a key.
///
/// Encoding is deterministic, so this returns the same token every time for an unchanged key.
fn with_token(state: &AppState, key: KeyRecord) -> Result<KeyWithToken> {
    let token = state
        .gate
        .codec()
        .encode(&key.owner, &key.project, key.id)
        .map_err(|e| Error::Internal {
            operation: format!("sign key token: {e}"),
        })?;

    Ok(KeyWithToken { key: key.into(), token })
}

async fn find_user_key(state: &AppState, user: &UserDBResponse, key_id: KeyId) -> Result<KeyRecord> {
    state.storage.get_user_key(user.id, key_id).await?.ok_or_else(|| Error::NotFound {
        resource: "Key".to_string(),
        id: key_id.to_string(),
    })
}

/// Create a key for a user.
///
/// The response carries the token a client presents to authenticate as this key.
#[utoipa::path(
    post,
    path = "/users/{username}/keys",
    tag = "keys",
    summary = "Create key",
    params(("username" = String, Path, description = "Username")),
    request_body = KeyCreate,
    responses(
        (status = 201, description = "Key created", body = KeyWithToken),
        (status = 400, description = "Invalid key data"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires the master credential"),
        (status = 404, description = "User not found"),
    ),
    security(("Authorization" = []))
)]
pub async fn create_key(
    State(state): State<AppState>,
    Path(username): Path<String>,
    identity: Identity,
    Json(data): Json<KeyCreate>,
) -> Result<(StatusCode, Json<KeyWithToken>)> {
    require_admin(&identity)?;
    if data.name.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Key name cannot be empty".to_string(),
        });
    }

    let user = find_user(&state, &username).await?;
    let key = state
        .storage
        .create_key(&KeyCreateDBRequest::new(user.id, data.name, data.project))
        .await?;

    Ok((StatusCode::CREATED, Json(with_token(&state, key)?)))
}

#[utoipa::path(
    get,
    path = "/users/{username}/keys",
    tag = "keys",
    summary = "List keys",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "The user's keys", body = KeyList),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires the master credential"),
        (status = 404, description = "User not found"),
    ),
    security(("Authorization" = []))
)]
pub async fn list_keys(State(state): State<AppState>, Path(username): Path<String>, identity: Identity) -> Result<Json<KeyList>> {
    require_admin(&identity)?;

    let user = find_user(&state, &username).await?;
    let keys = state.storage.list_keys(user.id).await?;

    Ok(Json(KeyList {
        keys: keys.into_iter().map(KeyResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/users/{username}/keys/{key_id}",
    tag = "keys",
    summary = "Get key",
    params(
        ("username" = String, Path, description = "Username"),
        ("key_id" = i64, Path, description = "Key id"),
    ),
    responses(
        (status = 200, description = "The key and its token", body = KeyWithToken),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires the master credential"),
        (status = 404, description = "User or key not found"),
    ),
    security(("Authorization" = []))
)]
pub async fn get_key(
    State(state): State<AppState>,
    Path((username, key_id)): Path<(String, KeyId)>,
    identity: Identity,
) -> Result<Json<KeyWithToken>> {
    require_admin(&identity)?;

    let user = find_user(&state, &username).await?;
    let key = find_user_key(&state, &user, key_id).await?;

    Ok(Json(with_token(&state, key)?))
}

/// Update a key.
///
/// Changes are not pushed to the key cache: a key that has already been used keeps authorizing
/// with its previous state until its cache entry is evicted.
///
/// The returned token carries the updated project. Tokens issued before the update keep the scope
/// they were signed with, so narrowing `project` does not restrict them. Deactivate the key to
/// revoke them.
#[utoipa::path(
    patch,
    path = "/users/{username}/keys/{key_id}",
    tag = "keys",
    summary = "Update key",
    params(
        ("username" = String, Path, description = "Username"),
        ("key_id" = i64, Path, description = "Key id"),
    ),
    request_body = KeyUpdate,
    responses(
        (status = 200, description = "Key updated", body = KeyWithToken),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires the master credential"),
        (status = 404, description = "User or key not found"),
    ),
    security(("Authorization" = []))
)]
pub async fn update_key(
    State(state): State<AppState>,
    Path((username, key_id)): Path<(String, KeyId)>,
    identity: Identity,
    Json(data): Json<KeyUpdate>,
) -> Result<Json<KeyWithToken>> {
    require_admin(&identity)?;

    let user = find_user(&state, &username).await?;
    find_user_key(&state, &user, key_id).await?;

    let key = state
        .storage
        .update_key(
            key_id,
            &KeyUpdateDBRequest {
                name: data.name,
                project: data.project,
                active: data.active,
            },
        )
        .await?;

    Ok(Json(with_token(&state, key)?))
}

#[utoipa::path(
    delete,
    path = "/users/{username}/keys/{key_id}",
    tag = "keys",
    summary = "Delete key",
    params(
        ("username" = String, Path, description = "Username"),
        ("key_id" = i64, Path, description = "Key id"),
    ),
    responses(
        (status = 204, description = "Key deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires the master credential"),
        (status = 404, description = "User or key not found"),
    ),
    security(("Authorization" = []))
)]
pub async fn delete_key(
    State(state): State<AppState>,
    Path((username, key_id)): Path<(String, KeyId)>,
    identity: Identity,
) -> Result<StatusCode> {
    require_admin(&identity)?;

    let user = find_user(&state, &username).await?;
    find_user_key(&state, &user, key_id).await?;
    state.storage.delete_key(key_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::models::keys::{KeyList, KeyWithToken};
    use crate::auth::token::KeyClaims;
    use crate::db::{KeyRecords, Storage, models::keys::KeyCreateDBRequest};
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    #[test_log::test]
    async fn test_create_key_returns_working_token() {
        let (server, storage) = create_test_app();
        create_test_user(&storage, 1, "alice").await;

        let response = server
            .post("/users/alice/keys")
            .add_header("authorization", TEST_MASTER_TOKEN)
            .json(&json!({ "name": "ci", "project": "demo" }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let created: KeyWithToken = response.json();
        assert_eq!(created.key.project, "demo");
        assert!(created.key.active);

        let claims = test_codec().decode(&created.token).unwrap();
        assert_eq!(
            claims,
            KeyClaims {
                username: "alice".to_string(),
                project: "demo".to_string(),
                key_id: created.key.id,
            }
        );
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_create_key_defaults_to_wildcard_scope() {
        let (server, storage) = create_test_app();
        create_test_user(&storage, 1, "alice").await;

        let response = server
            .post("/users/alice/keys")
            .add_header("authorization", TEST_MASTER_TOKEN)
            .json(&json!({ "name": "ci" }))
            .await;

        let created: KeyWithToken = response.json();
        assert_eq!(created.key.project, "*");
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_create_key_for_missing_user_is_not_found() {
        let (server, _storage) = create_test_app();

        let response = server
            .post("/users/nobody/keys")
            .add_header("authorization", TEST_MASTER_TOKEN)
            .json(&json!({ "name": "ci" }))
            .await;

        response.assert_status_not_found();
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_get_key_reissues_identical_token() {
        let (server, storage) = create_test_app();
        let key = create_test_key(&storage, "alice", "demo").await;

        let response = server
            .get(&format!("/users/alice/keys/{}", key.id))
            .add_header("authorization", TEST_MASTER_TOKEN)
            .await;

        response.assert_status_ok();
        let fetched: KeyWithToken = response.json();
        assert_eq!(fetched.token, issue_token(&key));
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_keys_are_scoped_to_their_owner() {
        let (server, storage) = create_test_app();
        let alice_key = create_test_key(&storage, "alice", "demo").await;
        create_test_user(&storage, 2, "bob").await;

        let response = server
            .get(&format!("/users/bob/keys/{}", alice_key.id))
            .add_header("authorization", TEST_MASTER_TOKEN)
            .await;

        response.assert_status_not_found();
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_list_keys() {
        let (server, storage) = create_test_app();
        let first = create_test_key(&storage, "alice", "demo").await;
        let second = storage
            .create_key(&KeyCreateDBRequest::new(first.user_id, "other".to_string(), None))
            .await
            .unwrap();

        let response = server.get("/users/alice/keys").add_header("authorization", TEST_MASTER_TOKEN).await;

        response.assert_status_ok();
        let list: KeyList = response.json();
        let ids: Vec<_> = list.keys.iter().map(|k| k.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_update_key_returns_token_for_new_scope() {
        let (server, storage) = create_test_app();
        let key = create_test_key(&storage, "alice", "demo").await;

        let response = server
            .patch(&format!("/users/alice/keys/{}", key.id))
            .add_header("authorization", TEST_MASTER_TOKEN)
            .json(&json!({ "project": "other", "active": false }))
            .await;

        response.assert_status_ok();
        let updated: KeyWithToken = response.json();
        assert_eq!(updated.key.project, "other");
        assert!(!updated.key.active);
        assert_eq!(test_codec().decode(&updated.token).unwrap().project, "other");
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_delete_key() {
        let (server, storage) = create_test_app();
        let key = create_test_key(&storage, "alice", "demo").await;

        let response = server
            .delete(&format!("/users/alice/keys/{}", key.id))
            .add_header("authorization", TEST_MASTER_TOKEN)
            .await;

        response.assert_status(StatusCode::NO_CONTENT);
        assert!(storage.get_key(key.id).await.unwrap().is_none());
    }
}
