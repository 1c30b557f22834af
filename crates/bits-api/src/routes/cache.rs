//! Cache management routes

use axum::{
    Json, Router,
    extract::State,
    routing::{delete, get},
};
use bits_core::CacheStats;
use tracing::info;

use crate::state::AppState;

/// GET /api/v1/cache/stats
async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.directory.cache().stats())
}

/// DELETE /api/v1/cache
async fn clear_cache(State(state): State<AppState>) -> Json<serde_json::Value> {
    info!("Clearing endpoint cache on request");

    let cleared = state.directory.cache().clear();

    Json(serde_json::json!({
        "cleared": cleared
    }))
}

/// Create cache routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/cache/stats", get(cache_stats))
        .route("/api/v1/cache", delete(clear_cache))
}
