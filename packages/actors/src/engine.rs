//! Engine facade: submission, status lookups and shutdown.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use db::repositories::HistoryRepository;
use genq_core::{GenerationStats, Job, JobError, JobId, JobView, PromptTemplate, TokenCounter};
use ractor::ActorRef;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::backend::GenerationBackend;
use crate::messages::{EngineError, PoolMessage, PoolStats, RouterMessage, WorkItem};
use crate::panic::panic_message;
use crate::pool_actor::{PoolArgs, spawn_worker_pool};
use crate::router_actor::{RouterArgs, spawn_result_router};
use crate::table::{JobTable, Transition};

/// How long a submission waits for the pool to admit it.
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Worker count used when none is configured.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().min(4))
        .unwrap_or(2)
}

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub workers: usize,
    /// Pending jobs older than this fail on their next status check.
    pub job_timeout: Duration,
    /// Upper bound on waiting for in-flight and queued work at shutdown.
    pub drain_timeout: Duration,
    /// Upper bound on waiting for the router to acknowledge its stop.
    pub router_stop_timeout: Duration,
    pub prompt_template: PromptTemplate,
    /// Archive terminal jobs to the history table.
    pub archive_history: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: default_worker_count(),
            job_timeout: Duration::from_secs(360),
            drain_timeout: Duration::from_secs(300),
            router_stop_timeout: Duration::from_secs(5),
            prompt_template: PromptTemplate::default(),
            archive_history: false,
        }
    }
}

impl EngineConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    pub fn with_router_stop_timeout(mut self, timeout: Duration) -> Self {
        self.router_stop_timeout = timeout;
        self
    }

    pub fn with_prompt_template(mut self, template: PromptTemplate) -> Self {
        self.prompt_template = template;
        self
    }

    pub fn with_archive_history(mut self, archive: bool) -> Self {
        self.archive_history = archive;
        self
    }
}

/// What happened during shutdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    /// Every admitted job finished before the drain timeout.
    pub drained: bool,
    /// The router acknowledged its stop sentinel.
    pub router_stopped: bool,
    /// Outcomes the router applied over its lifetime.
    pub outcomes_applied: u64,
    /// Jobs left pending when shutdown finished.
    pub abandoned_jobs: usize,
    /// Shutdown had already run; nothing was done.
    pub already_shut_down: bool,
}

/// How the pool answered a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Admitted,
    /// The pool has stopped accepting work.
    Refused,
    /// The pool did not answer within `SUBMIT_TIMEOUT`.
    NoReply,
    /// The pool is gone or dropped the reply port.
    Unreachable,
}

impl Admission {
    fn rejection_reason(self) -> Option<&'static str> {
        match self {
            Admission::Admitted => None,
            Admission::Refused => Some("engine is shutting down"),
            Admission::NoReply => Some("worker pool did not respond"),
            Admission::Unreachable => Some("worker pool is unavailable"),
        }
    }
}

struct ActorHandles {
    pool: JoinHandle<()>,
    router: JoinHandle<()>,
}

/// A running generation engine.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct GenerationEngine {
    table: Arc<JobTable>,
    pool: ActorRef<PoolMessage>,
    router: ActorRef<RouterMessage>,
    handles: Mutex<Option<ActorHandles>>,
    counter: Arc<dyn TokenCounter>,
    config: EngineConfig,
    backend_name: String,
}

/// Start the router and the worker pool.
pub async fn start_engine(
    config: EngineConfig,
    backend: Arc<dyn GenerationBackend>,
    counter: Arc<dyn TokenCounter>,
) -> Result<GenerationEngine, EngineError> {
    let table = Arc::new(JobTable::new());

    let (router, router_handle) = spawn_result_router(RouterArgs {
        table: table.clone(),
        counter: counter.clone(),
        archive: config.archive_history,
    })
    .await
    .map_err(|e| EngineError::Spawn(format!("result router: {}", e)))?;

    let (pool, pool_handle) = match spawn_worker_pool(PoolArgs {
        workers: config.workers,
        backend: backend.clone(),
        router: router.clone(),
        table: table.clone(),
    })
    .await
    {
        Ok(spawned) => spawned,
        Err(e) => {
            router.stop(None);
            return Err(EngineError::Spawn(format!("worker pool: {}", e)));
        }
    };

    tracing::info!(
        "Generation engine started (backend: {}, workers: {}, timeout: {}s)",
        backend.name(),
        config.workers.max(1),
        config.job_timeout.as_secs()
    );

    Ok(GenerationEngine {
        table,
        pool,
        router,
        handles: Mutex::new(Some(ActorHandles {
            pool: pool_handle,
            router: router_handle,
        })),
        counter,
        backend_name: backend.name().to_string(),
        config,
    })
}

impl GenerationEngine {
    /// Register a job and hand it to the pool.
    ///
    /// Always returns an id. If the pool refuses the job, is gone, or does
    /// not answer in time, the job is already failed when this returns.
    pub async fn submit(&self, user_input: &str) -> JobId {
        let prompt = self.config.prompt_template.render(user_input);
        let prompt_tokens = match catch_unwind(AssertUnwindSafe(|| self.counter.count(&prompt))) {
            Ok(tokens) => tokens,
            Err(payload) => {
                tracing::warn!("Prompt token count failed: {}", panic_message(payload));
                0
            }
        };

        let job = Job::new(prompt_tokens);
        let job_id = job.id;
        self.table.insert(job);

        let work = WorkItem { job_id, prompt };
        let (tx, rx) = ractor::concurrency::oneshot();
        let admission = if self
            .pool
            .send_message(PoolMessage::Submit {
                work,
                reply: tx.into(),
            })
            .is_ok()
        {
            match tokio::time::timeout(SUBMIT_TIMEOUT, rx).await {
                Ok(Ok(true)) => Admission::Admitted,
                Ok(Ok(false)) => Admission::Refused,
                Ok(Err(_)) => Admission::Unreachable,
                Err(_) => Admission::NoReply,
            }
        } else {
            Admission::Unreachable
        };

        match admission.rejection_reason() {
            None => tracing::info!(job_id = %job_id, prompt_tokens, "Job submitted"),
            Some(reason) => {
                tracing::warn!(job_id = %job_id, "Job rejected: {}", reason);
                self.fail_job(&job_id, JobError::submission_rejected(reason))
                    .await;
            }
        }

        job_id
    }

    /// Poller-facing status of a job.
    ///
    /// A pending job past the job timeout is failed here, so a stuck
    /// generation never leaves its poller waiting forever.
    pub async fn status(&self, job_id: &JobId) -> Result<JobView, EngineError> {
        let job = self
            .table
            .get(job_id)
            .ok_or_else(|| EngineError::NotFound(job_id.to_string()))?;

        if job.is_overdue(Utc::now(), self.config.job_timeout) {
            tracing::warn!(
                "Job {} exceeded {}s, marking it failed",
                job_id,
                self.config.job_timeout.as_secs()
            );
            if let Some(failed) = self
                .fail_job(job_id, JobError::timeout(self.config.job_timeout))
                .await
            {
                return Ok(failed.view());
            }
            // Someone else finished it first; report what they wrote.
            return self
                .table
                .get(job_id)
                .map(|job| job.view())
                .ok_or_else(|| EngineError::NotFound(job_id.to_string()));
        }

        Ok(job.view())
    }

    /// Poll until the job is terminal or `max_wait` runs out.
    pub async fn wait_for_terminal(
        &self,
        job_id: &JobId,
        poll_interval: Duration,
        max_wait: Duration,
    ) -> Result<JobView, EngineError> {
        let deadline = tokio::time::Instant::now() + max_wait;
        loop {
            let view = self.status(job_id).await?;
            if view.status != genq_core::JobState::Pending {
                return Ok(view);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(EngineError::WaitTimeout(job_id.to_string()));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn fail_job(&self, job_id: &JobId, error: JobError) -> Option<Job> {
        match self.table.fail(job_id, error) {
            Transition::Applied(job) => {
                if self.config.archive_history
                    && let Err(e) = HistoryRepository::archive(&job).await
                {
                    tracing::warn!("Failed to archive job {}: {}", job_id, e);
                }
                Some(job)
            }
            Transition::AlreadyTerminal(_) | Transition::Missing => None,
        }
    }

    /// Stop admitting new work. Idempotent.
    pub async fn stop_accepting(&self) {
        let (tx, rx) = ractor::concurrency::oneshot();
        if self
            .pool
            .send_message(PoolMessage::StopAccepting { reply: tx.into() })
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    /// Current pool snapshot, or `None` once the pool is gone.
    pub async fn pool_stats(&self) -> Option<PoolStats> {
        let (tx, rx) = ractor::concurrency::oneshot();
        self.pool
            .send_message(PoolMessage::GetStats { reply: tx.into() })
            .ok()?;
        rx.await.ok()
    }

    pub async fn is_accepting(&self) -> bool {
        self.pool_stats().await.is_some_and(|stats| stats.accepting)
    }

    /// Aggregate generation statistics.
    pub fn stats(&self) -> GenerationStats {
        self.table.stats()
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of jobs still pending.
    pub fn pending_jobs(&self) -> usize {
        self.table.pending_count()
    }

    /// Stop accepting, drain admitted work, then stop the router and the pool.
    ///
    /// Safe to call more than once; later calls return a report with
    /// `already_shut_down` set.
    pub async fn shutdown(&self) -> ShutdownReport {
        let mut guard = self.handles.lock().await;
        let Some(handles) = guard.take() else {
            return ShutdownReport {
                already_shut_down: true,
                abandoned_jobs: self.table.pending_count(),
                ..Default::default()
            };
        };

        tracing::info!("Shutting down generation engine");
        self.stop_accepting().await;

        let (tx, rx) = ractor::concurrency::oneshot();
        let drained = if self
            .pool
            .send_message(PoolMessage::AwaitDrained { reply: tx.into() })
            .is_ok()
        {
            matches!(
                tokio::time::timeout(self.config.drain_timeout, rx).await,
                Ok(Ok(()))
            )
        } else {
            false
        };
        if !drained {
            tracing::warn!(
                "Drain did not finish within {}s",
                self.config.drain_timeout.as_secs()
            );
        }

        // Every outcome of drained work is already queued ahead of this.
        let (tx, rx) = ractor::concurrency::oneshot();
        let applied = if self
            .router
            .send_message(RouterMessage::Stop { ack: tx.into() })
            .is_ok()
        {
            match tokio::time::timeout(self.config.router_stop_timeout, rx).await {
                Ok(Ok(applied)) => Some(applied),
                _ => None,
            }
        } else {
            None
        };

        let router_stopped = applied.is_some();
        if !router_stopped {
            tracing::warn!("Result router did not acknowledge stop, killing it");
            self.router.kill();
        }
        let _ = handles.router.await;

        self.pool.stop(None);
        let _ = handles.pool.await;

        let report = ShutdownReport {
            drained,
            router_stopped,
            outcomes_applied: applied.unwrap_or(0),
            abandoned_jobs: self.table.pending_count(),
            already_shut_down: false,
        };
        tracing::info!(
            drained = report.drained,
            router_stopped = report.router_stopped,
            outcomes_applied = report.outcomes_applied,
            abandoned_jobs = report.abandoned_jobs,
            "Generation engine stopped"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_admitted_submissions_have_no_rejection() {
        assert_eq!(Admission::Admitted.rejection_reason(), None);
        assert_eq!(
            Admission::Refused.rejection_reason(),
            Some("engine is shutting down")
        );
        assert_eq!(
            Admission::NoReply.rejection_reason(),
            Some("worker pool did not respond")
        );
        assert_eq!(
            Admission::Unreachable.rejection_reason(),
            Some("worker pool is unavailable")
        );
    }

    #[test]
    fn test_rejection_reason_carries_submission_prefix() {
        let reason = Admission::NoReply.rejection_reason().unwrap_or_default();
        assert_eq!(
            JobError::submission_rejected(reason).to_string(),
            "Task submission error: worker pool did not respond"
        );
    }
}
