//! Cache-aside key lookup.
//!
//! [`KeyStore::get`] checks the [`KeyCache`] first and only falls back to the [`KeyRecords`]
//! source on a miss, writing whatever it found back into the cache. A cache hit never touches
//! the database.
//!
//! Entries are never invalidated when a key is updated or deactivated. A key that was cached
//! while active keeps authorizing until its entry is evicted or the cache restarts, and a key
//! cached while inactive stays rejected the same way.

use std::sync::Arc;
use tracing::{instrument, trace, warn};

use crate::{
    cache::{CacheError, KeyCache},
    db::{KeyRecords, errors::DbError, models::keys::KeyRecord},
    errors::{Error, Result},
    types::KeyId,
};

#[derive(Clone)]
pub struct KeyStore {
    cache: Arc<dyn KeyCache>,
    records: Arc<dyn KeyRecords>,
}

impl KeyStore {
    pub fn new(cache: Arc<dyn KeyCache>, records: Arc<dyn KeyRecords>) -> Self {
        Self { cache, records }
    }

    /// Look up a usable key.
    ///
    /// Returns `None` both when the key does not exist and when it exists but is inactive.
    #[instrument(skip(self), err)]
    pub async fn get(&self, id: KeyId) -> Result<Option<KeyRecord>> {
        let record = match self.cached(id).await? {
            Some(record) => {
                trace!("Key cache hit");
                record
            }
            None => {
                trace!("Key cache miss");
                let Some(record) = self.records.get_key(id).await.map_err(store_error)? else {
                    return Ok(None);
                };

                let bytes = serde_json::to_vec(&record).map_err(|e| Error::Internal {
                    operation: format!("serialize key record: {e}"),
                })?;
                self.cache.set(id, bytes).await.map_err(cache_error)?;
                record
            }
        };

        Ok(record.active.then_some(record))
    }

    async fn cached(&self, id: KeyId) -> Result<Option<KeyRecord>> {
        let Some(bytes) = self.cache.get(id).await.map_err(cache_error)? else {
            return Ok(None);
        };

        match serde_json::from_slice::<KeyRecord>(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                // Unreadable entries are treated as a miss and overwritten from the database
                warn!(key_id = id, "Discarding unreadable key cache entry: {}", e);
                Ok(None)
            }
        }
    }
}

fn cache_error(e: CacheError) -> Error {
    Error::UpstreamUnavailable {
        service: "key cache",
        detail: e.to_string(),
    }
}

fn store_error(e: DbError) -> Error {
    match e {
        DbError::Unavailable(detail) => Error::UpstreamUnavailable {
            service: "key store",
            detail,
        },
        other => Error::Database(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MokaKeyCache, NoopCache};
    use crate::test_utils::{CountingCache, CountingRecords, FailingCache, sample_key};

    #[tokio::test]
    async fn test_first_lookup_reads_store_and_populates_cache() {
        let records = Arc::new(CountingRecords::with_keys([sample_key(7, true)]));
        let cache = Arc::new(CountingCache::new(MokaKeyCache::new(16)));
        let store = KeyStore::new(cache.clone(), records.clone());

        let key = store.get(7).await.unwrap().unwrap();

        assert_eq!(key, sample_key(7, true));
        assert_eq!(records.reads(), 1);
        assert_eq!(cache.writes(), 1);
    }

    #[tokio::test]
    async fn test_second_lookup_skips_store() {
        let records = Arc::new(CountingRecords::with_keys([sample_key(7, true)]));
        let cache = Arc::new(CountingCache::new(MokaKeyCache::new(16)));
        let store = KeyStore::new(cache.clone(), records.clone());

        store.get(7).await.unwrap();
        let key = store.get(7).await.unwrap();

        assert!(key.is_some());
        assert_eq!(records.reads(), 1);
        assert_eq!(cache.writes(), 1);
    }

    #[tokio::test]
    async fn test_unknown_key_is_absent_and_not_cached() {
        let records = Arc::new(CountingRecords::with_keys([]));
        let cache = Arc::new(CountingCache::new(MokaKeyCache::new(16)));
        let store = KeyStore::new(cache.clone(), records.clone());

        assert!(store.get(7).await.unwrap().is_none());
        assert_eq!(records.reads(), 1);
        assert_eq!(cache.writes(), 0);
    }

    #[tokio::test]
    async fn test_inactive_key_is_absent_but_cached() {
        let records = Arc::new(CountingRecords::with_keys([sample_key(7, false)]));
        let cache = Arc::new(CountingCache::new(MokaKeyCache::new(16)));
        let store = KeyStore::new(cache.clone(), records.clone());

        assert!(store.get(7).await.unwrap().is_none());
        assert!(store.get(7).await.unwrap().is_none());
        assert_eq!(records.reads(), 1);
        assert_eq!(cache.writes(), 1);
    }

    #[tokio::test]
    async fn test_deactivation_is_not_seen_through_stale_entry() {
        let records = Arc::new(CountingRecords::with_keys([sample_key(7, true)]));
        let cache = MokaKeyCache::new(16);
        let store = KeyStore::new(Arc::new(cache.clone()), records.clone());

        assert!(store.get(7).await.unwrap().is_some());
        records.set_active(7, false);

        // Still served from the cache
        assert!(store.get(7).await.unwrap().is_some());

        cache.evict(7).await;
        assert!(store.get(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreadable_entry_is_refreshed_from_store() {
        let records = Arc::new(CountingRecords::with_keys([sample_key(7, true)]));
        let cache = Arc::new(CountingCache::new(MokaKeyCache::new(16)));
        cache.set(7, b"not json".to_vec()).await.unwrap();
        let store = KeyStore::new(cache.clone(), records.clone());

        assert!(store.get(7).await.unwrap().is_some());
        assert_eq!(records.reads(), 1);
        // One write from the setup, one from the refresh
        assert_eq!(cache.writes(), 2);
    }

    #[tokio::test]
    async fn test_noop_cache_always_reads_store() {
        let records = Arc::new(CountingRecords::with_keys([sample_key(7, true)]));
        let store = KeyStore::new(Arc::new(NoopCache), records.clone());

        store.get(7).await.unwrap();
        store.get(7).await.unwrap();

        assert_eq!(records.reads(), 2);
    }

    #[tokio::test]
    async fn test_cache_failure_is_upstream_unavailable() {
        let records = Arc::new(CountingRecords::with_keys([sample_key(7, true)]));
        let store = KeyStore::new(Arc::new(FailingCache), records.clone());

        let err = store.get(7).await.unwrap_err();

        assert!(matches!(err, Error::UpstreamUnavailable { service: "key cache", .. }));
        assert_eq!(records.reads(), 0);
    }

    #[tokio::test]
    async fn test_store_outage_is_upstream_unavailable() {
        let records = Arc::new(CountingRecords::with_keys([]));
        records.set_unavailable(true);
        let store = KeyStore::new(Arc::new(MokaKeyCache::new(16)), records);

        let err = store.get(7).await.unwrap_err();

        assert!(matches!(err, Error::UpstreamUnavailable { service: "key store", .. }));
    }
}
