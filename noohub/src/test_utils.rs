//! Shared fixtures and test doubles.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use axum_test::TestServer;
use parking_lot::Mutex;

use crate::{
    AppState,
    auth::token::TokenCodec,
    build_app_state, build_router,
    cache::{self, CacheError, KeyCache, MokaKeyCache},
    config::{CacheBackend, CacheConfig, Config},
    db::{
        InMemoryStorage, KeyRecords, Storage,
        errors::DbError,
        models::{
            keys::{KeyCreateDBRequest, KeyRecord, KeyUpdateDBRequest},
            users::{UserCreateDBRequest, UserDBResponse},
        },
    },
    types::KeyId,
};

pub const TEST_SIGNING_SECRET: &str = "test-signing-secret";
pub const TEST_MASTER_TOKEN: &str = "test-master-token";

static NEXT_USER_ID: AtomicI64 = AtomicI64::new(1000);

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: Some("postgres://localhost/noohub_test".to_string()),
        jwt_secret: Some(TEST_SIGNING_SECRET.to_string()),
        master_token: Some(TEST_MASTER_TOKEN.to_string()),
        cache: CacheConfig {
            backend: CacheBackend::Memory,
            max_capacity: 1_000,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// App state over fresh in-memory storage and a moka key cache.
pub fn create_test_state() -> (AppState, InMemoryStorage) {
    let config = create_test_config();
    let storage = InMemoryStorage::new();
    let cache = Arc::new(MokaKeyCache::new(config.cache.max_capacity));
    let state = build_app_state(&config, Arc::new(storage.clone()), cache);
    (state, storage)
}

pub fn create_test_app() -> (TestServer, InMemoryStorage) {
    let (state, storage) = create_test_state();
    let server = TestServer::new(build_router(state)).expect("Failed to create test server");
    (server, storage)
}

pub fn test_codec() -> TokenCodec {
    TokenCodec::new(TEST_SIGNING_SECRET)
}

pub fn issue_token(key: &KeyRecord) -> String {
    test_codec()
        .encode(&key.owner, &key.project, key.id)
        .expect("Failed to sign test token")
}

pub async fn create_test_user(storage: &InMemoryStorage, id: i64, username: &str) -> UserDBResponse {
    storage
        .create_user(&UserCreateDBRequest {
            id,
            username: username.to_string(),
        })
        .await
        .expect("Failed to create test user")
}

/// Create an active key for `username`, creating the user first if needed.
pub async fn create_test_key(storage: &InMemoryStorage, username: &str, project: &str) -> KeyRecord {
    let user = match storage.get_user(username).await.expect("Failed to look up test user") {
        Some(user) => user,
        None => create_test_user(storage, NEXT_USER_ID.fetch_add(1, Ordering::Relaxed), username).await,
    };

    storage
        .create_key(&KeyCreateDBRequest::new(user.id, "test key".to_string(), Some(project.to_string())))
        .await
        .expect("Failed to create test key")
}

pub async fn deactivate_key(storage: &InMemoryStorage, key_id: KeyId) {
    storage
        .update_key(
            key_id,
            &KeyUpdateDBRequest {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to deactivate test key");
}

pub fn sample_key(id: KeyId, active: bool) -> KeyRecord {
    KeyRecord {
        id,
        user_id: 1,
        owner: "alice".to_string(),
        name: "ci".to_string(),
        project: "demo".to_string(),
        active,
    }
}

/// Key source that counts reads and can be flipped into an outage.
#[derive(Default)]
pub struct CountingRecords {
    keys: Mutex<HashMap<KeyId, KeyRecord>>,
    reads: AtomicUsize,
    unavailable: AtomicBool,
}

impl CountingRecords {
    pub fn with_keys(keys: impl IntoIterator<Item = KeyRecord>) -> Self {
        Self {
            keys: Mutex::new(keys.into_iter().map(|key| (key.id, key)).collect()),
            ..Default::default()
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn set_active(&self, id: KeyId, active: bool) {
        if let Some(key) = self.keys.lock().get_mut(&id) {
            key.active = active;
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl KeyRecords for CountingRecords {
    async fn get_key(&self, id: KeyId) -> crate::db::errors::Result<Option<KeyRecord>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("connection refused".to_string()));
        }
        Ok(self.keys.lock().get(&id).cloned())
    }
}

/// Cache wrapper that counts writes.
pub struct CountingCache<C> {
    inner: C,
    writes: AtomicUsize,
}

impl<C: KeyCache> CountingCache<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            writes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl<C: KeyCache> KeyCache for CountingCache<C> {
    async fn get(&self, id: KeyId) -> cache::Result<Option<Vec<u8>>> {
        self.inner.get(id).await
    }

    async fn set(&self, id: KeyId, value: Vec<u8>) -> cache::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(id, value).await
    }
}

/// Cache whose backend is always down.
pub struct FailingCache;

#[async_trait::async_trait]
impl KeyCache for FailingCache {
    async fn get(&self, _id: KeyId) -> cache::Result<Option<Vec<u8>>> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn set(&self, _id: KeyId, _value: Vec<u8>) -> cache::Result<()> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}
