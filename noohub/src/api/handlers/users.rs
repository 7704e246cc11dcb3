use crate::{
    AppState,
    api::handlers::find_user,
    api::models::users::{UserCreate, UserResponse, UserUpdate},
    auth::{Identity, scope::require_admin},
    db::models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    errors::{Error, Result},
    types::is_valid_username,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

fn validate_username(username: &str) -> Result<()> {
    if is_valid_username(username) {
        Ok(())
    } else {
        Err(Error::BadRequest {
            message: "Invalid username".to_string(),
        })
    }
}

#[utoipa::path(
    get,
    path = "/users/{username}",
    tag = "users",
    summary = "Get user",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires the master credential"),
        (status = 404, description = "User not found"),
    ),
    security(("Authorization" = []))
)]
pub async fn get_user(State(state): State<AppState>, Path(username): Path<String>, identity: Identity) -> Result<Json<UserResponse>> {
    require_admin(&identity)?;

    let user = find_user(&state, &username).await?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    summary = "Create user",
    request_body = UserCreate,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid username"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires the master credential"),
        (status = 409, description = "A user with this id or username already exists"),
    ),
    security(("Authorization" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    identity: Identity,
    Json(data): Json<UserCreate>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    require_admin(&identity)?;
    validate_username(&data.username)?;

    let user = state
        .storage
        .create_user(&UserCreateDBRequest {
            id: data.id,
            username: data.username,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Renaming a user does not move their published projects, which stay under the old namespace.
#[utoipa::path(
    patch,
    path = "/users/{username}",
    tag = "users",
    summary = "Update user",
    params(("username" = String, Path, description = "Username")),
    request_body = UserUpdate,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid username"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires the master credential"),
        (status = 404, description = "User not found"),
        (status = 409, description = "The new username is taken"),
    ),
    security(("Authorization" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    identity: Identity,
    Json(data): Json<UserUpdate>,
) -> Result<Json<UserResponse>> {
    require_admin(&identity)?;
    if let Some(new_username) = &data.username {
        validate_username(new_username)?;
    }

    let user = find_user(&state, &username).await?;
    let updated = state
        .storage
        .update_user(
            user.id,
            &UserUpdateDBRequest {
                username: data.username,
                banned: data.banned,
            },
        )
        .await?;

    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/users/{username}",
    tag = "users",
    summary = "Delete user",
    description = "Delete a user together with all of their keys",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires the master credential"),
        (status = 404, description = "User not found"),
    ),
    security(("Authorization" = []))
)]
pub async fn delete_user(State(state): State<AppState>, Path(username): Path<String>, identity: Identity) -> Result<StatusCode> {
    require_admin(&identity)?;

    let user = find_user(&state, &username).await?;
    if !state.storage.delete_user(user.id).await? {
        return Err(Error::NotFound {
            resource: "User".to_string(),
            id: username,
        });
    }

    Ok(StatusCode::NO_CONTENT)
}
