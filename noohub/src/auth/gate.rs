//! Resolution of an inbound credential into an [`Identity`].

use tracing::{debug, instrument};

use super::{Identity, key_store::KeyStore, master::MasterBypass, token::TokenCodec};
use crate::errors::{Error, Result};

const INVALID_CREDENTIAL: &str = "Invalid credential";

/// Turns the raw credential from a request into a verified identity.
///
/// Outcomes:
/// - no credential: [`Error::Unauthenticated`]
/// - the master secret: a master identity with wildcard scope, without consulting any key
/// - a token that fails to decode, or that references a missing or inactive key:
///   [`Error::Forbidden`], with no indication of which check failed
/// - otherwise the username and scope embedded in the token
pub struct AuthorizationGate {
    codec: TokenCodec,
    master: MasterBypass,
    keys: KeyStore,
}

impl AuthorizationGate {
    pub fn new(codec: TokenCodec, master: MasterBypass, keys: KeyStore) -> Self {
        Self { codec, master, keys }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    #[instrument(skip_all)]
    pub async fn authorize(&self, credential: Option<&str>) -> Result<Identity> {
        let credential = match credential {
            Some(credential) if !credential.is_empty() => credential,
            _ => return Err(Error::Unauthenticated { message: None }),
        };

        if self.master.matches(credential) {
            debug!("Authorized with master credential");
            return Ok(Identity::master());
        }

        let claims = self.codec.decode(credential).map_err(|e| {
            debug!("Rejected token: {}", e);
            Error::forbidden(INVALID_CREDENTIAL)
        })?;

        if self.keys.get(claims.key_id).await?.is_none() {
            debug!(key_id = claims.key_id, "Rejected token for missing or inactive key");
            return Err(Error::forbidden(INVALID_CREDENTIAL));
        }

        debug!(key_id = claims.key_id, username = %claims.username, "Authorized with key token");
        Ok(Identity::from_claims(claims))
    }
}
