//! HTTP request handlers for all API endpoints.
//!
//! - [`users`]: user accounts (master credential)
//! - [`keys`]: key issuance and management (master credential)
//! - [`projects`]: project reads (anonymous) and pushes (key token)

pub mod keys;
pub mod projects;
pub mod users;

use crate::{
    AppState,
    db::models::users::UserDBResponse,
    errors::{Error, Result},
};

/// Resolve the user addressed by a `/users/{username}` path.
pub(crate) async fn find_user(state: &AppState, username: &str) -> Result<UserDBResponse> {
    state.storage.get_user(username).await?.ok_or_else(|| Error::NotFound {
        resource: "User".to_string(),
        id: username.to_string(),
    })
}
