//! Signed key tokens.
//!
//! A token is an HS256 JWT whose payload is exactly the triple issued with a key:
//!
//! ```json
//! { "u": "<username>", "p": "<project scope>", "k": <key id> }
//! ```
//!
//! Tokens carry no `exp` claim and stay valid for as long as the key they reference is active.
//! Encoding is deterministic, so the same triple always produces the same token and a key's token
//! can be re-issued at any time.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::KeyId;

/// Claims embedded in a key token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyClaims {
    #[serde(rename = "u")]
    pub username: String,
    #[serde(rename = "p")]
    pub project: String,
    #[serde(rename = "k")]
    pub key_id: KeyId,
}

// Every field optional so an absent claim is told apart from a mistyped one
#[derive(Deserialize)]
struct RawClaims {
    u: Option<String>,
    p: Option<String>,
    k: Option<KeyId>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token is malformed")]
    Malformed,

    #[error("token is missing the `{0}` claim")]
    MissingClaim(&'static str),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Encodes and verifies key tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn encode(&self, username: &str, project: &str, key_id: KeyId) -> Result<String, TokenError> {
        let claims = KeyClaims {
            username: username.to_string(),
            project: project.to_string(),
            key_id,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn decode(&self, token: &str) -> Result<KeyClaims, TokenError> {
        let data = decode::<RawClaims>(token, &self.decoding, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        })?;

        let RawClaims { u, p, k } = data.claims;
        Ok(KeyClaims {
            username: u.ok_or(TokenError::MissingClaim("u"))?,
            project: p.ok_or(TokenError::MissingClaim("p"))?,
            key_id: k.ok_or(TokenError::MissingClaim("k"))?,
        })
    }
}
