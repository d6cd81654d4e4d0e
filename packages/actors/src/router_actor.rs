//! Result router: the only consumer of worker outcomes.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use chrono::Utc;
use db::repositories::HistoryRepository;
use genq_core::{GenerationResult, Job, JobError, TokenCounter};
use ractor::{Actor, ActorProcessingErr, ActorRef};

use crate::messages::{Outcome, RouterMessage, TaggedOutcome};
use crate::panic::panic_message;
use crate::table::{JobTable, Transition};

/// Router actor arguments.
pub struct RouterArgs {
    pub table: Arc<JobTable>,
    pub counter: Arc<dyn TokenCounter>,
    /// Write terminal jobs to the history archive.
    pub archive: bool,
}

/// State for the router actor.
pub struct RouterState {
    table: Arc<JobTable>,
    counter: Arc<dyn TokenCounter>,
    archive: bool,
    /// Outcomes that produced a terminal transition.
    applied: u64,
    /// Outcomes for unknown or already finished jobs.
    discarded: u64,
}

/// Drains the outcome mailbox in FIFO order and applies each outcome to the
/// job table. Processing errors are recorded on the job, never raised, so
/// the router outlives any single bad outcome.
pub struct ResultRouter;

impl Actor for ResultRouter {
    type Msg = RouterMessage;
    type State = RouterState;
    type Arguments = RouterArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting result router (archive: {})", args.archive);

        Ok(RouterState {
            table: args.table,
            counter: args.counter,
            archive: args.archive,
            applied: 0,
            discarded: 0,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            RouterMessage::Outcome(tagged) => {
                let job_id = tagged.job_id;
                match apply_outcome(&state.table, state.counter.as_ref(), *tagged) {
                    Some(job) => {
                        state.applied += 1;
                        if state.archive
                            && let Err(e) = HistoryRepository::archive(&job).await
                        {
                            tracing::warn!("Failed to archive job {}: {}", job_id, e);
                        }
                    }
                    None => state.discarded += 1,
                }
            }

            RouterMessage::Stop { ack } => {
                tracing::info!(
                    "Result router stopping: {} applied, {} discarded",
                    state.applied,
                    state.discarded
                );
                let _ = ack.send(state.applied);
                myself.stop(None);
            }
        }

        Ok(())
    }
}

/// Apply one outcome. Returns the job when it reached a terminal status.
fn apply_outcome(table: &JobTable, counter: &dyn TokenCounter, tagged: TaggedOutcome) -> Option<Job> {
    let TaggedOutcome {
        job_id,
        worker_id,
        outcome,
    } = tagged;

    let Some(job) = table.get(&job_id) else {
        tracing::warn!("Discarding outcome from {} for unknown job {}", worker_id, job_id);
        return None;
    };
    if job.status.is_terminal() {
        tracing::warn!(
            "Discarding late outcome for job {} (already {})",
            job_id,
            job.status.as_str()
        );
        return None;
    }

    let transition = match outcome {
        Outcome::Generated { text, elapsed } => {
            match catch_unwind(AssertUnwindSafe(|| counter.count(&text))) {
                Ok(tokens) => {
                    let generation_time = job.elapsed_secs(Utc::now());
                    tracing::debug!(
                        job_id = %job_id,
                        backend_ms = elapsed.as_millis() as u64,
                        tokens,
                        "Recording result"
                    );
                    table.complete(
                        &job_id,
                        GenerationResult::new(text, generation_time, tokens, job.prompt_tokens),
                    )
                }
                Err(payload) => table.fail(
                    &job_id,
                    JobError::result_processing(format!(
                        "token counting failed: {}",
                        panic_message(payload)
                    )),
                ),
            }
        }
        Outcome::Failed { error } => table.fail(&job_id, error),
    };

    match transition {
        Transition::Applied(job) => {
            tracing::info!(job_id = %job_id, status = job.status.as_str(), "Job finished");
            Some(job)
        }
        // Lost a race with a timeout between the lookup and the transition.
        Transition::AlreadyTerminal(_) => {
            tracing::warn!("Discarding late outcome for job {}", job_id);
            None
        }
        Transition::Missing => None,
    }
}

/// Spawn a standalone result router.
pub async fn spawn_result_router(
    args: RouterArgs,
) -> Result<(ActorRef<RouterMessage>, tokio::task::JoinHandle<()>), ractor::SpawnErr> {
    Actor::spawn(None, ResultRouter, args).await
}
