//! # noohub: registry for versioned project specs
//!
//! `noohub` stores project documents published by users under their own namespace
//! (`@username/project#version`) and serves them back to anyone. Reads are anonymous; publishing
//! requires a per-user key.
//!
//! ## Architecture
//!
//! The service is an [Axum](https://github.com/tokio-rs/axum) application over PostgreSQL, with a
//! key cache (redis or in-process moka) in front of key lookups.
//!
//! ### Request Flow
//!
//! A request to a protected route carries either a key token or the operator's master credential
//! in its `Authorization` header. The [`auth::Identity`] extractor hands the credential to the
//! [`auth::AuthorizationGate`], which:
//!
//! 1. grants a master identity if the credential equals the master secret,
//! 2. otherwise verifies the token signature and decodes `{username, project, key id}`,
//! 3. looks the key up through the cache-aside [`auth::key_store::KeyStore`] and rejects it if it
//!    is missing or inactive.
//!
//! Handlers then check the identity against the resource: user and key management require the
//! master identity, and project pushes require a key whose scope covers the project and whose
//! owner is the namespace being written.
//!
//! ### Core Components
//!
//! - [`api`]: HTTP handlers and request/response models
//! - [`auth`]: Token codec, master bypass, key store, gate, and scope checks
//! - [`cache`]: Key cache backends
//! - [`db`]: Storage trait with PostgreSQL and in-memory implementations
//! - [`config`]: CLI arguments and layered configuration
//! - [`telemetry`]: Logging and optional OTLP export
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use noohub::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = noohub::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     noohub::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Database Setup
//!
//! Migrations are embedded and run on startup. They can also be applied directly:
//!
//! ```no_run
//! # use sqlx::PgPool;
//! # async fn example(pool: PgPool) -> Result<(), sqlx::migrate::MigrateError> {
//! noohub::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use bon::Builder;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::{
    auth::{AuthorizationGate, key_store::KeyStore, master::MasterBypass, token::TokenCodec},
    cache::{KeyCache, MokaKeyCache, RedisKeyCache},
    config::CacheBackend,
    db::{KeyRecords, PostgresStorage, Storage},
    openapi::ApiDoc,
};
pub use config::Config;

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .storage(storage)
///     .gate(Arc::new(gate))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub gate: Arc<AuthorizationGate>,
}

/// Get the noohub database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Wire the authorization gate and storage into an [`AppState`].
///
/// The same storage backs both the handlers and the gate's key lookups.
pub fn build_app_state<S>(config: &Config, storage: Arc<S>, cache: Arc<dyn KeyCache>) -> AppState
where
    S: Storage + 'static,
{
    let records: Arc<dyn KeyRecords> = storage.clone();
    let storage: Arc<dyn Storage> = storage;
    let gate = AuthorizationGate::new(
        TokenCodec::new(config.jwt_secret()),
        MasterBypass::new(config.master_token()),
        KeyStore::new(cache, records),
    );

    AppState::builder().storage(storage).gate(Arc::new(gate)).build()
}

/// Build the key cache backend selected in the configuration.
pub async fn build_key_cache(config: &Config) -> anyhow::Result<Arc<dyn KeyCache>> {
    let cache: Arc<dyn KeyCache> = match config.cache.backend {
        CacheBackend::Redis => {
            let url = config
                .cache
                .url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("cache.url is required for the redis cache backend"))?;
            Arc::new(RedisKeyCache::connect(url, config.cache.pool_size).await?)
        }
        CacheBackend::Memory => Arc::new(MokaKeyCache::new(config.cache.max_capacity)),
    };

    info!(backend = ?config.cache.backend, "Key cache ready");
    Ok(cache)
}

/// Build the application router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    use api::handlers::{keys, projects, users};

    let api_routes = Router::new()
        .route("/users", post(users::create_user))
        .route(
            "/users/{username}",
            get(users::get_user).patch(users::update_user).delete(users::delete_user),
        )
        .route("/users/{username}/keys", get(keys::list_keys).post(keys::create_key))
        .route(
            "/users/{username}/keys/{key_id}",
            get(keys::get_key).patch(keys::update_key).delete(keys::delete_key),
        )
        .route("/users/{username}/projects/{project}", get(projects::get_project))
        .route("/users/{username}/projects/{project}/{version}", post(projects::create_project))
        .with_state(state);

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .merge(api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Main application struct that owns all resources.
///
/// 1. **Create**: [`Application::new`] connects to the database, runs migrations and builds the
///    key cache
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting noohub with configuration: {:#?}", config);

        let database_url = config
            .database_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("database_url is not configured"))?;
        let pool_settings = &config.database_pool;
        let pool = PgPoolOptions::new()
            .max_connections(pool_settings.max_connections)
            .min_connections(pool_settings.min_connections)
            .acquire_timeout(pool_settings.acquire_timeout())
            .connect(database_url)
            .await?;

        migrator().run(&pool).await?;
        info!("Database migrations applied");

        let cache = build_key_cache(&config).await?;
        let storage = Arc::new(PostgresStorage::new(pool.clone()));
        let router = build_router(build_app_state(&config, storage, cache));

        Ok(Self { router, config, pool })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("noohub listening on http://{}", bind_addr);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
