//! In-process key cache backed by moka.

use moka::future::Cache;
use std::sync::Arc;

use super::{KeyCache, Result, cache_key};
use crate::types::KeyId;

/// Bounded in-memory cache. Entries have no time-to-live; they leave only through capacity
/// eviction or [`MokaKeyCache::evict`].
#[derive(Clone)]
pub struct MokaKeyCache {
    entries: Cache<String, Arc<[u8]>>,
}

impl MokaKeyCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            entries: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    /// Drop the entry for `id`, forcing the next lookup back to the database.
    pub async fn evict(&self, id: KeyId) {
        self.entries.invalidate(&cache_key(id)).await;
    }
}

#[async_trait::async_trait]
impl KeyCache for MokaKeyCache {
    async fn get(&self, id: KeyId) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(&cache_key(id)).await.map(|value| value.to_vec()))
    }

    async fn set(&self, id: KeyId, value: Vec<u8>) -> Result<()> {
        self.entries.insert(cache_key(id), Arc::from(value)).await;
        Ok(())
    }
}
