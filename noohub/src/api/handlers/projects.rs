use crate::{
    AppState,
    api::models::projects::{ProjectResponse, ProjectVersionQuery},
    auth::{Identity, scope::check_project_access},
    db::{errors::DbError, models::projects::ProjectCreateDBRequest},
    errors::{Error, Result},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use tracing::info;

#[utoipa::path(
    get,
    path = "/users/{username}/projects/{project}",
    tag = "projects",
    summary = "Get project",
    description = "Get a specific version of a project, or the most recently pushed one",
    params(
        ("username" = String, Path, description = "Namespace owner"),
        ("project" = String, Path, description = "Project name"),
        ProjectVersionQuery,
    ),
    responses(
        (status = 200, description = "The project version", body = ProjectResponse),
        (status = 404, description = "Project not found"),
    )
)]
pub async fn get_project(
    State(state): State<AppState>,
    Path((username, project)): Path<(String, String)>,
    Query(query): Query<ProjectVersionQuery>,
) -> Result<Json<ProjectResponse>> {
    let found = state
        .storage
        .get_project(&username, &project, query.version.as_deref())
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Project".to_string(),
            id: format!("@{username}/{project}"),
        })?;

    Ok(Json(found.into()))
}

/// Publish a new version of a project.
///
/// The key must cover the project and belong to the namespace owner. Published versions are
/// immutable.
#[utoipa::path(
    post,
    path = "/users/{username}/projects/{project}/{version}",
    tag = "projects",
    summary = "Push project version",
    params(
        ("username" = String, Path, description = "Namespace owner"),
        ("project" = String, Path, description = "Project name"),
        ("version" = String, Path, description = "Version being published"),
    ),
    request_body(content = serde_json::Value, description = "Project document, stored as-is"),
    responses(
        (status = 201, description = "Version published", body = ProjectResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "The key does not cover this project or namespace"),
        (status = 409, description = "This version already exists"),
    ),
    security(("Authorization" = []))
)]
pub async fn create_project(
    State(state): State<AppState>,
    Path((username, project, version)): Path<(String, String, String)>,
    identity: Identity,
    Json(spec): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<ProjectResponse>)> {
    check_project_access(&identity, &username, &project)?;

    let conflict = || Error::Conflict {
        message: format!("Project @{username}/{project}#{version} already exists"),
    };

    if state.storage.get_project(&username, &project, Some(&version)).await?.is_some() {
        return Err(conflict());
    }

    let request = ProjectCreateDBRequest {
        username: username.clone(),
        name: project.clone(),
        version: version.clone(),
        spec,
    };
    let created = match state.storage.create_project(&request).await {
        Ok(created) => created,
        // Lost a race with a concurrent push of the same version
        Err(DbError::UniqueViolation { .. }) => return Err(conflict()),
        Err(e) => return Err(e.into()),
    };

    info!(%username, %project, %version, "Published project version");
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[cfg(test)]
mod tests {
    use crate::api::models::projects::ProjectResponse;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    #[test_log::test]
    async fn test_push_and_fetch_project() {
        let (server, storage) = create_test_app();
        let token = issue_token(&create_test_key(&storage, "alice", "demo").await);

        let response = server
            .post("/users/alice/projects/demo/1.0.0")
            .add_header("authorization", &token)
            .json(&json!({ "name": "demo", "commands": {} }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let response = server.get("/users/alice/projects/demo").await;
        response.assert_status_ok();
        let project: ProjectResponse = response.json();
        assert_eq!(project.version, "1.0.0");
        assert_eq!(project.username, "alice");
        assert_eq!(project.spec, json!({ "name": "demo", "commands": {} }));
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_fetch_latest_or_specific_version() {
        let (server, storage) = create_test_app();
        let token = issue_token(&create_test_key(&storage, "alice", "*").await);

        for version in ["1.0.0", "0.9.0"] {
            server
                .post(&format!("/users/alice/projects/demo/{version}"))
                .add_header("authorization", &token)
                .json(&json!({ "version": version }))
                .await
                .assert_status(StatusCode::CREATED);
        }

        // Latest means most recently pushed, not highest version
        let latest: ProjectResponse = server.get("/users/alice/projects/demo").await.json();
        assert_eq!(latest.version, "0.9.0");

        let specific: ProjectResponse = server
            .get("/users/alice/projects/demo")
            .add_query_param("version", "1.0.0")
            .await
            .json();
        assert_eq!(specific.spec, json!({ "version": "1.0.0" }));

        server
            .get("/users/alice/projects/demo")
            .add_query_param("version", "2.0.0")
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_push_requires_credential() {
        let (server, _storage) = create_test_app();

        let response = server.post("/users/alice/projects/demo/1.0.0").json(&json!({})).await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_push_outside_key_scope_is_forbidden() {
        let (server, storage) = create_test_app();
        let token = issue_token(&create_test_key(&storage, "alice", "demo").await);

        let response = server
            .post("/users/alice/projects/other/1.0.0")
            .add_header("authorization", &token)
            .json(&json!({}))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(response.text(), "This key does not have access to push to this project");
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_push_to_other_namespace_is_forbidden() {
        let (server, storage) = create_test_app();
        let token = issue_token(&create_test_key(&storage, "alice", "*").await);

        let response = server
            .post("/users/bob/projects/demo/1.0.0")
            .add_header("authorization", &token)
            .json(&json!({}))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(response.text(), "User alice does not have permission to push to @bob/demo");
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_master_credential_cannot_push() {
        let (server, _storage) = create_test_app();

        let response = server
            .post("/users/alice/projects/demo/1.0.0")
            .add_header("authorization", TEST_MASTER_TOKEN)
            .json(&json!({}))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_duplicate_version_conflicts() {
        let (server, storage) = create_test_app();
        let token = issue_token(&create_test_key(&storage, "alice", "demo").await);

        let push = || {
            server
                .post("/users/alice/projects/demo/1.0.0")
                .add_header("authorization", &token)
                .json(&json!({ "name": "demo" }))
        };

        push().await.assert_status(StatusCode::CREATED);
        let response = push().await;

        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(response.text(), "Project @alice/demo#1.0.0 already exists");
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_inactive_key_cannot_push() {
        let (server, storage) = create_test_app();
        let key = create_test_key(&storage, "alice", "demo").await;
        deactivate_key(&storage, key.id).await;

        let response = server
            .post("/users/alice/projects/demo/1.0.0")
            .add_header("authorization", issue_token(&key))
            .json(&json!({}))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_deactivated_key_keeps_working_while_cached() {
        let (server, storage) = create_test_app();
        let key = create_test_key(&storage, "alice", "demo").await;
        let token = issue_token(&key);

        server
            .post("/users/alice/projects/demo/1.0.0")
            .add_header("authorization", &token)
            .json(&json!({}))
            .await
            .assert_status(StatusCode::CREATED);

        server
            .patch(&format!("/users/alice/keys/{}", key.id))
            .add_header("authorization", TEST_MASTER_TOKEN)
            .json(&json!({ "active": false }))
            .await
            .assert_status_ok();

        // The cached record from the first push is still served
        server
            .post("/users/alice/projects/demo/1.1.0")
            .add_header("authorization", &token)
            .json(&json!({}))
            .await
            .assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_narrowing_key_project_keeps_earlier_token_scope() {
        let (server, storage) = create_test_app();
        let key = create_test_key(&storage, "alice", "*").await;
        let token = issue_token(&key);

        server
            .patch(&format!("/users/alice/keys/{}", key.id))
            .add_header("authorization", TEST_MASTER_TOKEN)
            .json(&json!({ "project": "demo" }))
            .await
            .assert_status_ok();

        // Scope comes from the token, which still says `*`
        server
            .post("/users/alice/projects/other/1.0.0")
            .add_header("authorization", &token)
            .json(&json!({}))
            .await
            .assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    #[test_log::test]
    async fn test_get_missing_project_is_not_found() {
        let (server, _storage) = create_test_app();

        server.get("/users/alice/projects/demo").await.assert_status_not_found();
    }
}
