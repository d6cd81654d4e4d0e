//! Integration tests for the HTTP surface.

mod common;

use std::sync::Arc;
use std::time::Duration;

use actors::{BackendError, FnBackend};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use common::{body_json, build_test_app, engine_config, get, poll_until_done, post_json, sleepy_backend};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn generate_returns_immediately_and_completes() {
    let (app, engine) =
        build_test_app(sleepy_backend(Duration::from_millis(50), "OK"), engine_config(), false)
            .await;

    let response = post_json(&app, "/generate", json!({ "user_input": "Benchmark: say OK." })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let submitted = body_json(response).await;
    assert_eq!(submitted["status"], "submitted");
    let job_id = submitted["job_id"].as_str().expect("job_id is a string").to_string();

    let first = body_json(get(&app, &format!("/check-result/{job_id}")).await).await;
    assert_eq!(first["status"], "pending");
    assert!(first["result"].is_null());
    assert!(first["error"].is_null());

    let done = poll_until_done(&app, &job_id).await;
    assert_eq!(done["job_id"], job_id.as_str());
    assert_eq!(done["status"], "completed");
    assert!(done["error"].is_null());
    assert_eq!(done["result"]["output"], "OK");
    assert_eq!(done["result"]["tokens_generated"], 1);
    assert!(done["result"]["tokens_per_second"].as_f64().unwrap() > 0.0);
    for field in ["generation_time", "prompt_tokens", "total_tokens"] {
        assert!(done["result"][field].is_number(), "missing {field}");
    }

    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_generation_is_reported_with_error() {
    let backend = Arc::new(FnBackend::new("stub", |_: &str| {
        Err(BackendError::Other("model not loaded".into()))
    }));
    let (app, engine) = build_test_app(backend, engine_config(), false).await;

    let submitted = body_json(post_json(&app, "/generate", json!({ "user_input": "x" })).await).await;
    let done = poll_until_done(&app, submitted["job_id"].as_str().unwrap()).await;

    assert_eq!(done["status"], "failed");
    assert!(done["result"].is_null());
    assert_eq!(done["error"], "Generation error: model not loaded");

    engine.shutdown().await;
}

#[tokio::test]
async fn unknown_and_malformed_job_ids_are_404() {
    let (app, engine) =
        build_test_app(sleepy_backend(Duration::ZERO, "OK"), engine_config(), false).await;

    let unknown = get(&app, "/check-result/01ARZ3NDEKTSV4RRFFQ69G5FAV").await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    let json = body_json(unknown).await;
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Job not found");

    let garbage = get(&app, "/check-result/not-a-job").await;
    assert_eq!(garbage.status(), StatusCode::NOT_FOUND);

    engine.shutdown().await;
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let (app, engine) =
        build_test_app(sleepy_backend(Duration::ZERO, "OK"), engine_config(), false).await;

    let response = post_json(&app, "/generate", json!({ "prompt": "wrong field" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");

    let response = app
        .clone()
        .oneshot(
            Request::post("/generate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn health_and_stats_reflect_engine_state() {
    let (app, engine) =
        build_test_app(sleepy_backend(Duration::from_millis(10), "one two"), engine_config(), false)
            .await;

    let health = body_json(get(&app, "/health").await).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["accepting_jobs"], true);
    assert_eq!(health["backend"], "stub");

    let submitted = body_json(post_json(&app, "/generate", json!({ "user_input": "hi" })).await).await;
    poll_until_done(&app, submitted["job_id"].as_str().unwrap()).await;

    let stats = body_json(get(&app, "/stats").await).await;
    assert_eq!(stats["generation_stats"]["total_requests"], 1);
    assert_eq!(stats["generation_stats"]["failed_requests"], 0);
    assert_eq!(stats["generation_stats"]["total_tokens_generated"], 2);
    assert_eq!(stats["pool"]["workers"], 2);
    assert_eq!(stats["pending_jobs"], 0);

    engine.stop_accepting().await;
    let health = body_json(get(&app, "/health").await).await;
    assert_eq!(health["accepting_jobs"], false);

    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn submissions_after_shutdown_fail_fast() {
    let (app, engine) =
        build_test_app(sleepy_backend(Duration::from_millis(10), "OK"), engine_config(), false)
            .await;

    engine.shutdown().await;

    let response = post_json(&app, "/generate", json!({ "user_input": "late" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let submitted = body_json(response).await;

    let view = body_json(
        get(&app, &format!("/check-result/{}", submitted["job_id"].as_str().unwrap())).await,
    )
    .await;
    assert_eq!(view["status"], "failed");
    assert!(view["error"].as_str().unwrap().starts_with("Task submission error: "));
}

#[tokio::test]
async fn history_is_unavailable_without_archive() {
    let (app, engine) =
        build_test_app(sleepy_backend(Duration::ZERO, "OK"), engine_config(), false).await;

    let response = get(&app, "/history").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "UNAVAILABLE");

    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn benchmark_runs_every_prompt() {
    let (app, engine) =
        build_test_app(sleepy_backend(Duration::from_millis(10), "a b c"), engine_config(), false)
            .await;

    let response = app
        .clone()
        .oneshot(Request::post("/benchmark").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let report = body_json(response).await;
    assert_eq!(report["total_tests"], 3);
    assert_eq!(report["backend"], "stub");
    let results = report["benchmark_results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    for entry in results {
        assert_eq!(entry["tokens_generated"], 3);
        assert!(entry.get("error").is_none());
    }
    assert!(report["average_tokens_per_second"].as_f64().unwrap() > 0.0);
    assert_eq!(engine.stats().total_requests, 3);

    engine.shutdown().await;
}

#[tokio::test]
async fn cors_allows_any_origin_by_default() {
    let (app, engine) =
        build_test_app(sleepy_backend(Duration::ZERO, "OK"), engine_config(), false).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/generate")
                .header("Origin", "http://example.test")
                .header("Access-Control-Request-Method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .map(|v| v.to_str().unwrap()),
        Some("*")
    );

    engine.shutdown().await;
}
