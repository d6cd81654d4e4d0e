//! Shared helpers for HTTP integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use actors::{EngineConfig, FnBackend, Generation, GenerationBackend, GenerationEngine, start_engine};
use api::{AppState, ServerConfig, build_app_router};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use genq_core::{PromptTemplate, WordCountApprox};
use http_body_util::BodyExt;
use tower::ServiceExt;

/// A server config with the archive disabled.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        db_endpoint: None,
        ..Default::default()
    }
}

/// Backend that sleeps for `delay` and returns `output`.
pub fn sleepy_backend(delay: Duration, output: &'static str) -> Arc<dyn GenerationBackend> {
    Arc::new(FnBackend::new("stub", move |_: &str| {
        std::thread::sleep(delay);
        Ok(Generation::new(output))
    }))
}

pub fn engine_config() -> EngineConfig {
    EngineConfig::default()
        .with_workers(2)
        .with_prompt_template(PromptTemplate::raw())
        .with_job_timeout(Duration::from_secs(30))
        .with_drain_timeout(Duration::from_secs(5))
}

/// Build the full application router around a fresh engine.
pub async fn build_test_app(
    backend: Arc<dyn GenerationBackend>,
    engine_config: EngineConfig,
    history_enabled: bool,
) -> (Router, Arc<GenerationEngine>) {
    let engine = start_engine(
        engine_config.with_archive_history(history_enabled),
        backend,
        Arc::new(WordCountApprox::default()),
    )
    .await
    .expect("engine should start");
    let engine = Arc::new(engine);

    let state = AppState {
        engine: engine.clone(),
        history_enabled,
    };

    (build_app_router(state, &test_config()), engine)
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Poll `/check-result` until the job leaves `pending`.
pub async fn poll_until_done(app: &Router, job_id: &str) -> serde_json::Value {
    for _ in 0..500 {
        let response = get(app, &format!("/check-result/{job_id}")).await;
        let json = body_json(response).await;
        if json["status"] != "pending" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never finished");
}
