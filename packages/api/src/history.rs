//! Archived generation history.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use db::repositories::{HistoryRecord, HistoryRepository};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub counts: HashMap<String, u64>,
    pub recent: Vec<HistoryRecord>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/history", get(history))
}

async fn history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Json<HistoryResponse>> {
    if !state.history_enabled {
        return Err(ApiError::Unavailable(
            "History archive is disabled".to_string(),
        ));
    }

    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let counts = HistoryRepository::count_by_status().await?;
    let recent = HistoryRepository::recent(limit).await?;

    Ok(Json(HistoryResponse { counts, recent }))
}
