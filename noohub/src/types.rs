//! Common type definitions shared across the auth, storage and API layers.
//!
//! # ID Types
//!
//! Users and keys are identified by externally assigned 64-bit integers, matching the
//! `BIGINT` primary keys in the schema:
//!
//! - [`UserId`]: User account identifier
//! - [`KeyId`]: API key identifier (immutable once issued, embedded in every token)
//! - [`ProjectId`]: Row identifier of a pushed project version
//!
//! # Project scopes
//!
//! A key's project scope is either a literal project name or [`WILDCARD_SCOPE`], which grants
//! every project in the key owner's namespace.

pub type UserId = i64;
pub type KeyId = i64;
pub type ProjectId = i64;

/// Scope value granting access to every project under the owner's namespace.
pub const WILDCARD_SCOPE: &str = "*";

/// Username attached to identities resolved through the master credential.
///
/// Real usernames must be at least three characters long, so this can never collide with one.
pub const MASTER_USERNAME: &str = "_";

/// Whether `scope` grants access to `project`.
pub fn scope_covers(scope: &str, project: &str) -> bool {
    scope == WILDCARD_SCOPE || scope == project
}

/// Validate a username against `^[A-Za-z0-9_]{3,32}$`.
pub fn is_valid_username(username: &str) -> bool {
    (3..=32).contains(&username.len()) && username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
