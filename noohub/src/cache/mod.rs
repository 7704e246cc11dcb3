//! Key cache backends.
//!
//! The key store only needs two operations from a cache: read the serialized record for a key id
//! and write it back. [`KeyCache`] captures exactly that, so the backend can be swapped without
//! touching the authentication logic:
//!
//! - [`memory::MokaKeyCache`]: process-local, bounded by entry count
//! - [`redis::RedisKeyCache`]: shared across instances
//! - [`NoopCache`]: never stores anything, every lookup goes to the database
//!
//! Entries are written without an expiry and live until evicted or until the backend restarts.
//! Nothing invalidates an entry when the underlying key row changes.

pub mod memory;
pub mod redis;

use crate::types::KeyId;
use thiserror::Error;

pub use self::memory::MokaKeyCache;
pub use self::redis::RedisKeyCache;

#[derive(Error, Debug)]
pub enum CacheError {
    /// The cache backend could not be reached
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with an error
    #[error("cache backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Minimal byte-oriented cache keyed by key id.
#[async_trait::async_trait]
pub trait KeyCache: Send + Sync {
    async fn get(&self, id: KeyId) -> Result<Option<Vec<u8>>>;

    async fn set(&self, id: KeyId, value: Vec<u8>) -> Result<()>;
}

/// Name of the cache entry holding the record for `id`.
pub fn cache_key(id: KeyId) -> String {
    format!("key:{id}")
}

/// A cache that stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait::async_trait]
impl KeyCache for NoopCache {
    async fn get(&self, _id: KeyId) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn set(&self, _id: KeyId, _value: Vec<u8>) -> Result<()> {
        Ok(())
    }
}
