//! Shared key cache backed by Redis.
//!
//! Entries are stored as plain `SET key:<id> <json>` without an expiry, so every instance of the
//! service sees the same cached records.

use deadpool_redis::{Config as PoolConfig, Pool, Runtime};
use redis::AsyncCommands;
use tracing::{debug, instrument};

use super::{CacheError, KeyCache, Result, cache_key};
use crate::types::KeyId;

pub struct RedisKeyCache {
    pool: Pool,
}

impl RedisKeyCache {
    /// Connect to `url` and verify the connection with a `PING`.
    pub async fn connect(url: &str, pool_size: usize) -> Result<Self> {
        let pool = PoolConfig::from_url(url)
            .builder()
            .map_err(|e| CacheError::Unavailable(e.to_string()))?
            .max_size(pool_size)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        let cache = Self { pool };
        let mut conn = cache.connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut *conn)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        debug!("Connected to redis key cache");
        Ok(cache)
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection> {
        self.pool.get().await.map_err(|e| CacheError::Unavailable(e.to_string()))
    }
}

#[async_trait::async_trait]
impl KeyCache for RedisKeyCache {
    #[instrument(skip(self), err)]
    async fn get(&self, id: KeyId) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<Vec<u8>>>(cache_key(id))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    #[instrument(skip(self, value), fields(len = value.len()), err)]
    async fn set(&self, id: KeyId, value: Vec<u8>) -> Result<()> {
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(cache_key(id), value)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }
}
