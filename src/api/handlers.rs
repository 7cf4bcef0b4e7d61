//! API Handlers
//!
//! HTTP request handlers for the `/put` and `/get` endpoints.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use tracing::debug;

use crate::cache::{CacheEngine, EngineConfig};
use crate::error::{CacheError, Result};
use crate::models::{ApiResponse, GetQuery, PutRequest};

/// Application state shared across all handlers.
///
/// The engine synchronizes internally, so handlers only need a shared handle.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CacheEngine>,
}

impl AppState {
    /// Creates a new AppState around an existing engine.
    pub fn new(engine: CacheEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Starts the engine's sweeper if the configuration enables eviction.
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::with_engine_config(config.engine_config())
    }

    pub fn with_engine_config(config: EngineConfig) -> Self {
        Self::new(CacheEngine::new(config))
    }
}

/// Handler for POST /put
///
/// Stores a key-value pair, reporting whether the key was inserted or updated.
pub async fn put_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PutRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>> {
    let Json(req) = payload.map_err(|rejection| {
        debug!("Rejected put body: {}", rejection.body_text());
        CacheError::InvalidRequest("Invalid request format".to_string())
    })?;

    let existed = state.engine.put(req.key, req.value).await?;

    Ok(Json(ApiResponse::stored(existed)))
}

/// Handler for GET /get?key=
///
/// Retrieves a value by key. Missing and expired keys both answer 404.
pub async fn get_handler(
    State(state): State<AppState>,
    query: std::result::Result<Query<GetQuery>, QueryRejection>,
) -> Result<Json<ApiResponse>> {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let key = query
        .key()
        .ok_or_else(|| CacheError::InvalidRequest("Key parameter is required".to_string()))?;

    match state.engine.get(key).await {
        Some(value) => Ok(Json(ApiResponse::found(key, value))),
        None => Err(CacheError::NotFound("Key not found.".to_string())),
    }
}
