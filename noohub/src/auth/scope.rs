//! Project scope and namespace checks for mutating operations.
//!
//! Reads of published projects are anonymous; only writes go through these checks.

use super::Identity;
use crate::errors::{Error, Result};
use crate::types::scope_covers;

/// Check that `identity` may modify `project` in the namespace of `username`.
///
/// The key's project scope is checked before namespace ownership.
pub fn check_project_access(identity: &Identity, username: &str, project: &str) -> Result<()> {
    if !scope_covers(identity.scope(), project) {
        return Err(Error::forbidden("This key does not have access to push to this project"));
    }

    if identity.username() != username {
        return Err(Error::forbidden(format!(
            "User {} does not have permission to push to @{username}/{project}",
            identity.username()
        )));
    }

    Ok(())
}

/// Check that `identity` was resolved from the master credential.
pub fn require_admin(identity: &Identity) -> Result<()> {
    if identity.is_master() {
        Ok(())
    } else {
        Err(Error::forbidden("This endpoint requires the master credential"))
    }
}
