//! API Handlers
//!
//! HTTP request handlers for each storage endpoint.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::Storage;
use crate::error::{Result, StorageError};
use crate::models::{
    validate_key, DeleteResponse, FlushResponse, GetResponse, HealthResponse, KeysResponse,
    SetRequest, SetResponse, StatsResponse, UpdateRequest,
};

/// Application state shared across all handlers.
///
/// `Storage` is internally synchronized, so handlers share clones of it.
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
}

impl AppState {
    /// Creates a new AppState around an opened storage.
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

fn checked_key(key: &str) -> Result<()> {
    match validate_key(key) {
        Some(error_msg) => Err(StorageError::InvalidRequest(error_msg)),
        None => Ok(()),
    }
}

/// Handler for PUT /items/:key
///
/// Stores a value with optional per-item TTL and description.
pub async fn set_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    checked_key(&key)?;

    let (value, options) = req.into_parts();
    let stored = state.storage.set_item(&key, value, options).await?;

    Ok(Json(SetResponse::new(key, &stored)))
}

/// Handler for PATCH /items/:key
pub async fn update_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<UpdateRequest>,
) -> Result<Json<SetResponse>> {
    checked_key(&key)?;

    let stored = state.storage.update_item(&key, req.value.into()).await?;

    Ok(Json(SetResponse::new(key, &stored)))
}

/// Handler for GET /items/:key
///
/// Missing and outdated keys both answer 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state.storage.get_item(&key).await?;

    Ok(Json(GetResponse::new(key, &value)))
}

/// Handler for DELETE /items/:key
///
/// Removing an absent key succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state.storage.remove_item(&key).await?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for DELETE /items
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<KeysResponse>> {
    state.storage.clear().await?;

    Ok(Json(KeysResponse::new(Vec::new())))
}

/// Handler for GET /keys
pub async fn keys_handler(State(state): State<AppState>) -> Json<KeysResponse> {
    Json(KeysResponse::new(state.storage.keys().await))
}

/// Handler for POST /flush
pub async fn flush_handler(State(state): State<AppState>) -> Result<Json<FlushResponse>> {
    let flushed = state.storage.flush().await?;

    Ok(Json(FlushResponse { flushed }))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let storage = &state.storage;

    Json(StatsResponse {
        name: storage.name().to_string(),
        store_name: storage.store_name().to_string(),
        driver: storage.driver().to_string(),
        length: storage.length().await,
        default_max_age: storage.default_max_age(),
    })
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
