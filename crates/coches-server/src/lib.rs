//! HTTP server for the coches service.
//!
//! Exposes CRUD routes over car records under `/api/coches`, backed by any
//! [`CarStore`]. The store is chosen at startup from [`config::Config`].

pub mod api;
pub mod config;

use axum::{extract::DefaultBodyLimit, routing::get, Extension, Json, Router};
use coches_db::{MigrationError, PoolError};
use coches_store::{seed_cars, CarStore, MemoryStore, SqliteStore, StoreError};
use config::{Config, StoreBackend};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The record store backing every `/api/coches` route.
    pub store: Arc<dyn CarStore>,
    /// Whether `POST /api/coches` rejects bodies without `anio`.
    pub require_anio: bool,
}

impl AppState {
    pub fn new(store: Arc<dyn CarStore>, require_anio: bool) -> Self {
        Self {
            store,
            require_anio,
        }
    }
}

/// Errors that prevent the server from building its store.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error("failed to prepare store: {0}")]
    Store(#[from] StoreError),
}

/// Builds the configured record store.
///
/// For SQLite this creates the pool, applies pending migrations and, when
/// seeding is enabled, fills an empty table with the seed set.
///
/// # Errors
///
/// Returns [`StartupError`] if the database cannot be opened or migrated.
pub fn build_store(config: &Config) -> Result<Arc<dyn CarStore>, StartupError> {
    let seed = config.store.should_seed();

    match config.store.backend {
        StoreBackend::Memory => {
            tracing::info!(seed, "using in-memory car store");
            let store = if seed {
                MemoryStore::seeded()
            } else {
                MemoryStore::new()
            };
            Ok(Arc::new(store))
        }
        StoreBackend::Sqlite => {
            tracing::info!(path = %config.database.path, seed, "using sqlite car store");
            let pool = coches_db::create_pool(
                &config.database.path,
                coches_db::DbRuntimeSettings {
                    busy_timeout_ms: config.database.busy_timeout_ms,
                    pool_max_size: config.database.pool_max_size,
                },
            )?;

            {
                let conn = pool.get().map_err(StoreError::from)?;
                let applied = coches_db::run_migrations(&conn)?;
                if applied > 0 {
                    tracing::info!(count = applied, "applied database migrations");
                }
            }

            let store = SqliteStore::new(pool);
            if seed {
                store.seed_if_empty(&seed_cars())?;
            }
            Ok(Arc::new(store))
        }
    }
}

/// Maximum request body size (64 KiB). Car bodies are a few dozen bytes.
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::index_handler))
        .route("/marcas", get(api::marcas_handler))
        .route("/health", get(health))
        .route(
            "/api/coches",
            get(api::list_coches_handler).post(api::create_coche_handler),
        )
        .route(
            "/api/coches/{id}",
            get(api::get_coche_handler)
                .put(api::update_coche_handler)
                .delete(api::delete_coche_handler),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
