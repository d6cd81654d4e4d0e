//! Job submission and polling endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use genq_core::{JobId, JobView};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Body of `POST /generate`.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub user_input: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub job_id: String,
    pub status: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate))
        .route("/check-result/{job_id}", get(check_result))
}

/// Register a job and return at once; generation runs in the background.
async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<Json<GenerateResponse>> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let job_id = state.engine.submit(&request.user_input).await;

    Ok(Json(GenerateResponse {
        job_id: job_id.to_string(),
        status: "submitted",
    }))
}

async fn check_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobView>> {
    // Ids we could never have issued are simply unknown.
    let id = JobId::parse(&job_id).map_err(|_| ApiError::NotFound("Job not found".to_string()))?;

    let view = state.engine.status(&id).await?;
    Ok(Json(view))
}
