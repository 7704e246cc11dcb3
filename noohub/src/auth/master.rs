//! Static master credential.

use subtle::ConstantTimeEq;

/// The operator credential configured at startup.
///
/// A request presenting this value verbatim is authorized with full access, independent of any
/// key record.
#[derive(Clone)]
pub struct MasterBypass {
    secret: Vec<u8>,
}

impl MasterBypass {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into().into_bytes(),
        }
    }

    /// Compare `candidate` against the master secret in constant time.
    ///
    /// An empty secret never matches.
    pub fn matches(&self, candidate: &str) -> bool {
        if self.secret.is_empty() {
            return false;
        }
        self.secret.as_slice().ct_eq(candidate.as_bytes()).into()
    }
}

impl std::fmt::Debug for MasterBypass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterBypass([REDACTED])")
    }
}
