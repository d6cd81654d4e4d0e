//! Worker actor for executing generations.

use std::sync::Arc;
use std::time::Instant;

use genq_core::JobError;
use ractor::{Actor, ActorProcessingErr, ActorRef};

use crate::backend::GenerationBackend;
use crate::messages::{
    Outcome, PoolMessage, RouterMessage, TaggedOutcome, WorkItem, WorkerMessage,
};
use crate::panic::panic_message;

/// State for the worker actor.
pub struct WorkerActorState {
    /// Unique worker ID.
    pub worker_id: String,
    /// Pool to report back to when idle.
    pub pool: ActorRef<PoolMessage>,
    /// Router that receives outcomes.
    pub router: ActorRef<RouterMessage>,
    pub backend: Arc<dyn GenerationBackend>,
    /// Jobs processed so far.
    pub processed: u64,
}

/// Worker actor arguments.
pub struct WorkerArgs {
    pub worker_id: String,
    pub pool: ActorRef<PoolMessage>,
    pub router: ActorRef<RouterMessage>,
    pub backend: Arc<dyn GenerationBackend>,
}

/// Worker actor that runs one generation at a time.
///
/// Workers never touch the job table. Every job they receive produces
/// exactly one outcome for the router.
pub struct WorkerActor;

impl Actor for WorkerActor {
    type Msg = WorkerMessage;
    type State = WorkerActorState;
    type Arguments = WorkerArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting worker: {}", args.worker_id);

        Ok(WorkerActorState {
            worker_id: args.worker_id,
            pool: args.pool,
            router: args.router,
            backend: args.backend,
            processed: 0,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            WorkerMessage::Process { work } => {
                let WorkItem { job_id, prompt } = *work;
                tracing::info!(job_id = %job_id, worker_id = %state.worker_id, "Start processing job");

                let outcome = run_generation(state.backend.clone(), prompt).await;
                state.processed += 1;

                match &outcome {
                    Outcome::Generated { elapsed, .. } => tracing::info!(
                        job_id = %job_id,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Generation finished"
                    ),
                    Outcome::Failed { error } => {
                        tracing::warn!(job_id = %job_id, %error, "Generation failed")
                    }
                }

                let tagged = TaggedOutcome {
                    job_id,
                    worker_id: state.worker_id.clone(),
                    outcome,
                };
                // Outcome first, then idle: the pool only reports drained
                // after every outcome is already in the router's mailbox.
                if state
                    .router
                    .send_message(RouterMessage::Outcome(Box::new(tagged)))
                    .is_err()
                {
                    tracing::warn!("Result router is gone, dropping outcome for job {}", job_id);
                }

                if state
                    .pool
                    .send_message(PoolMessage::WorkerIdle {
                        worker_id: state.worker_id.clone(),
                    })
                    .is_err()
                {
                    tracing::debug!("Pool is gone, worker {} stays idle", state.worker_id);
                }
            }
        }

        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        tracing::info!(
            "Worker {} stopped after {} jobs",
            state.worker_id,
            state.processed
        );
        Ok(())
    }
}

/// Run the blocking backend call off the actor runtime and package the result.
pub(crate) async fn run_generation(backend: Arc<dyn GenerationBackend>, prompt: String) -> Outcome {
    let started = Instant::now();
    let joined = tokio::task::spawn_blocking(move || backend.generate(&prompt)).await;
    let elapsed = started.elapsed();

    match joined {
        Ok(Ok(generation)) => {
            let text = generation.text.trim();
            if text.is_empty() {
                Outcome::Failed {
                    error: JobError::generation("backend returned empty output"),
                }
            } else {
                Outcome::Generated {
                    text: text.to_string(),
                    elapsed,
                }
            }
        }
        Ok(Err(e)) => Outcome::Failed {
            error: JobError::generation(e.to_string()),
        },
        Err(join_error) => {
            let reason = if join_error.is_panic() {
                format!("backend panicked: {}", panic_message(join_error.into_panic()))
            } else {
                "generation task was cancelled".to_string()
            };
            Outcome::Failed {
                error: JobError::generation(reason),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, FnBackend, Generation};

    #[tokio::test]
    async fn trims_successful_output() {
        let backend = Arc::new(FnBackend::new("stub", |_: &str| Ok(Generation::new("  OK \n"))));
        match run_generation(backend, "say OK".into()).await {
            Outcome::Generated { text, .. } => assert_eq!(text, "OK"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_output_is_a_generation_failure() {
        let backend = Arc::new(FnBackend::new("stub", |_: &str| Ok(Generation::new("   "))));
        match run_generation(backend, "say OK".into()).await {
            Outcome::Failed { error } => {
                assert_eq!(error.to_string(), "Generation error: backend returned empty output")
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn backend_errors_and_panics_become_failures() {
        let failing = Arc::new(FnBackend::new("stub", |_: &str| {
            Err(BackendError::Request("connection refused".into()))
        }));
        match run_generation(failing, "x".into()).await {
            Outcome::Failed { error } => assert_eq!(
                error.to_string(),
                "Generation error: request failed: connection refused"
            ),
            other => panic!("unexpected outcome: {other:?}"),
        }

        let panicking = Arc::new(FnBackend::new("stub", |_: &str| -> crate::BackendResult {
            panic!("model crashed")
        }));
        match run_generation(panicking, "x".into()).await {
            Outcome::Failed { error } => {
                assert!(error.to_string().contains("backend panicked: model crashed"))
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
