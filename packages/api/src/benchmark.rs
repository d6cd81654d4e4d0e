//! Throughput benchmark over a fixed set of CAD prompts.
//!
//! Prompts go through the running engine and its configured backend, so
//! they are sampled with the server's `MAX_TOKENS` and `TEMPERATURE`
//! (8192 and 0.7 by default), not a short greedy decode. Figures are only
//! comparable between runs with the same settings; the response names the
//! backend they came from.

use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use genq_core::JobState;
use serde::Serialize;

use crate::state::AppState;

pub const BENCHMARK_PROMPTS: [&str; 3] = [
    "Create a simple cube with side length 10mm",
    "Design a cylinder with radius 5mm and height 20mm",
    "Make a rectangular prism 30x20x10mm with a 5mm hole through the center",
];

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Serialize)]
pub struct BenchmarkEntry {
    pub prompt: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_per_second: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_generated: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BenchmarkEntry {
    fn failed(prompt: &'static str, error: String) -> Self {
        Self {
            prompt,
            tokens_per_second: None,
            generation_time: None,
            tokens_generated: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BenchmarkResponse {
    pub benchmark_results: Vec<BenchmarkEntry>,
    /// Mean over all prompts; failed prompts count as zero.
    pub average_tokens_per_second: f64,
    pub total_tests: usize,
    /// Backend that produced the numbers.
    pub backend: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/benchmark", post(benchmark))
}

/// Run each prompt through the engine, one at a time.
async fn benchmark(State(state): State<AppState>) -> Json<BenchmarkResponse> {
    let engine = &state.engine;
    let max_wait = engine.config().job_timeout + Duration::from_secs(1);
    let mut results = Vec::with_capacity(BENCHMARK_PROMPTS.len());

    for (i, prompt) in BENCHMARK_PROMPTS.into_iter().enumerate() {
        tracing::info!("Running benchmark {}/{}", i + 1, BENCHMARK_PROMPTS.len());

        let job_id = engine.submit(prompt).await;
        let entry = match engine.wait_for_terminal(&job_id, POLL_INTERVAL, max_wait).await {
            Ok(view) => match (view.status, view.result, view.error) {
                (JobState::Completed, Some(result), _) => BenchmarkEntry {
                    prompt,
                    tokens_per_second: Some(result.tokens_per_second),
                    generation_time: Some(result.generation_time),
                    tokens_generated: Some(result.tokens_generated),
                    error: None,
                },
                (_, _, error) => BenchmarkEntry::failed(
                    prompt,
                    error.unwrap_or_else(|| "job did not complete".to_string()),
                ),
            },
            Err(e) => BenchmarkEntry::failed(prompt, e.to_string()),
        };
        results.push(entry);
    }

    let total_tps: f64 = results.iter().filter_map(|r| r.tokens_per_second).sum();
    let average_tokens_per_second = if results.is_empty() {
        0.0
    } else {
        total_tps / results.len() as f64
    };

    Json(BenchmarkResponse {
        average_tokens_per_second,
        total_tests: BENCHMARK_PROMPTS.len(),
        benchmark_results: results,
        backend: engine.backend_name().to_string(),
    })
}
