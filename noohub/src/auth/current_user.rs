//! Axum extractor resolving the request's [`Identity`].
//!
//! Declaring an `Identity` argument on a handler makes the route protected: the extractor runs
//! the credential through the [`AuthorizationGate`](super::AuthorizationGate) and rejects the
//! request before the handler body runs if that fails.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{instrument, trace};

use super::Identity;
use crate::{
    AppState,
    errors::{Error, Result},
};

/// Optional scheme prefix on the `Authorization` header. The bare credential is also accepted.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Pull the raw credential out of the request headers.
///
/// Returns `Ok(None)` when the header is absent.
fn credential_from_parts(parts: &Parts) -> Result<Option<&str>> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let value = header.to_str().map_err(|e| {
        trace!("Authorization header is not valid UTF-8: {}", e);
        Error::forbidden("Invalid credential")
    })?;

    Ok(Some(value.strip_prefix(BEARER_PREFIX).unwrap_or(value).trim()))
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = Error;

    #[instrument(skip_all)]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let credential = credential_from_parts(parts)?;
        state.gate.authorize(credential).await
    }
}
