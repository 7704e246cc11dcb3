//! Authentication and authorization.
//!
//! Every protected request carries a single credential in the `Authorization` header. It is one
//! of two things:
//!
//! - the **master credential**, a static secret from configuration. It resolves to a master
//!   identity with wildcard scope and never touches the key store.
//! - a **key token**, an HS256 JWT carrying `{u, p, k}` (username, project scope, key id). The
//!   signature is verified first and the referenced key must exist and be active.
//!
//! The resolved [`Identity`] is handed to handlers as an axum extractor (see [`current_user`]).
//! Handlers then check it against the resource they touch with the helpers in [`scope`].
//!
//! # Outcomes
//!
//! | Situation                                   | Result                         |
//! |---------------------------------------------|--------------------------------|
//! | No credential                               | 401 Unauthorized               |
//! | Bad signature, malformed token              | 403 Forbidden                  |
//! | Key missing or inactive                     | 403 Forbidden (same message)   |
//! | Scope or namespace mismatch                 | 403 Forbidden                  |
//! | Key cache or store unreachable              | 503 Service Unavailable        |
//!
//! # Modules
//!
//! - [`token`]: Encoding and verification of key tokens
//! - [`master`]: Constant-time comparison against the master credential
//! - [`key_store`]: Cache-aside lookup of key records
//! - [`gate`]: Credential to identity resolution
//! - [`current_user`]: The [`Identity`] extractor
//! - [`scope`]: Project scope and namespace checks
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use noohub::auth::{Identity, scope::check_project_access};
//!
//! async fn push(identity: Identity, Path((username, project)): Path<(String, String)>) -> Result<()> {
//!     check_project_access(&identity, &username, &project)?;
//!     // ...
//! }
//! ```

pub mod current_user;
pub mod gate;
pub mod key_store;
pub mod master;
pub mod scope;
pub mod token;

pub use current_user::BEARER_PREFIX;
pub use gate::AuthorizationGate;

use crate::types::{KeyId, MASTER_USERNAME, WILDCARD_SCOPE};
use token::KeyClaims;

/// The caller a request was authorized as.
///
/// Immutable once resolved. For key tokens the username and scope are the ones the token was
/// issued with, not a fresh read of the key row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    username: String,
    scope: String,
    key_id: Option<KeyId>,
}

impl Identity {
    /// The identity granted to the master credential.
    pub fn master() -> Self {
        Self {
            username: MASTER_USERNAME.to_string(),
            scope: WILDCARD_SCOPE.to_string(),
            key_id: None,
        }
    }

    pub fn from_claims(claims: KeyClaims) -> Self {
        Self {
            username: claims.username,
            scope: claims.project,
            key_id: Some(claims.key_id),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// The key this identity was resolved from, or `None` for the master identity.
    pub fn key_id(&self) -> Option<KeyId> {
        self.key_id
    }

    pub fn is_master(&self) -> bool {
        self.key_id.is_none()
    }
}
