//! Health and statistics endpoints.

use actors::PoolStats;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use genq_core::GenerationStats;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub accepting_jobs: bool,
    pub backend: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub generation_stats: GenerationStats,
    /// Absent once the pool has shut down.
    pub pool: Option<PoolStats>,
    pub pending_jobs: usize,
    pub backend: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        accepting_jobs: state.engine.is_accepting().await,
        backend: state.engine.backend_name().to_string(),
    })
}

async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        generation_stats: state.engine.stats(),
        pool: state.engine.pool_stats().await,
        pending_jobs: state.engine.pending_jobs(),
        backend: state.engine.backend_name().to_string(),
    })
}
