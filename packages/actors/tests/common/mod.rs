//! Shared helpers for engine tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use actors::{EngineConfig, FnBackend, Generation, GenerationBackend, GenerationEngine, start_engine};
use genq_core::{JobId, JobView, PromptTemplate, TokenCounter, WordCountApprox};

/// Backend that sleeps for `delay` and returns `output`.
pub fn sleepy_backend(delay: Duration, output: &'static str) -> Arc<dyn GenerationBackend> {
    Arc::new(FnBackend::new("stub", move |_: &str| {
        std::thread::sleep(delay);
        Ok(Generation::new(output))
    }))
}

/// Small, fast configuration with the prompt passed through unchanged.
pub fn test_config() -> EngineConfig {
    EngineConfig::default()
        .with_workers(2)
        .with_prompt_template(PromptTemplate::raw())
        .with_job_timeout(Duration::from_secs(30))
        .with_drain_timeout(Duration::from_secs(5))
}

pub async fn start(config: EngineConfig, backend: Arc<dyn GenerationBackend>) -> GenerationEngine {
    start_with_counter(config, backend, Arc::new(WordCountApprox::default())).await
}

pub async fn start_with_counter(
    config: EngineConfig,
    backend: Arc<dyn GenerationBackend>,
    counter: Arc<dyn TokenCounter>,
) -> GenerationEngine {
    start_engine(config, backend, counter)
        .await
        .expect("engine should start")
}

/// Poll a job until it is terminal.
pub async fn wait(engine: &GenerationEngine, job_id: &JobId) -> JobView {
    engine
        .wait_for_terminal(job_id, Duration::from_millis(10), Duration::from_secs(5))
        .await
        .expect("job should finish")
}
