//! The shared job table.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use genq_core::{GenerationResult, GenerationStats, Job, JobError, JobId, JobStatus};

/// Outcome of a terminal-transition attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The job was pending and now holds the new terminal status.
    Applied(Job),
    /// The job had already reached a terminal status; nothing changed.
    AlreadyTerminal(Job),
    /// No job with that id.
    Missing,
}

#[derive(Default)]
struct TableInner {
    jobs: HashMap<JobId, Job>,
    stats: GenerationStats,
}

/// Single source of truth for job status.
///
/// Reads may run concurrently. Terminal transitions take the write lock and
/// only apply to pending jobs, so the first one wins and statistics count
/// every job once.
#[derive(Default)]
pub struct JobTable {
    inner: RwLock<TableInner>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, TableInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TableInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a newly submitted job.
    pub fn insert(&self, job: Job) {
        self.write().jobs.insert(job.id, job);
    }

    pub fn get(&self, id: &JobId) -> Option<Job> {
        self.read().jobs.get(id).cloned()
    }

    /// Mark a pending job completed.
    pub fn complete(&self, id: &JobId, result: GenerationResult) -> Transition {
        self.transition(id, JobStatus::Completed { result })
    }

    /// Mark a pending job failed.
    pub fn fail(&self, id: &JobId, error: JobError) -> Transition {
        self.transition(id, JobStatus::Failed { error })
    }

    fn transition(&self, id: &JobId, status: JobStatus) -> Transition {
        let mut inner = self.write();
        let TableInner { jobs, stats } = &mut *inner;

        let Some(job) = jobs.get_mut(id) else {
            return Transition::Missing;
        };
        if job.status.is_terminal() {
            return Transition::AlreadyTerminal(job.clone());
        }

        match &status {
            JobStatus::Completed { result } => stats.record_completion(result),
            JobStatus::Failed { .. } => stats.record_failure(),
            JobStatus::Pending => {}
        }
        job.status = status;
        job.updated_at = Utc::now();

        Transition::Applied(job.clone())
    }

    pub fn stats(&self) -> GenerationStats {
        self.read().stats.clone()
    }

    /// Number of jobs still waiting for a terminal status.
    pub fn pending_count(&self) -> usize {
        self.read()
            .jobs
            .values()
            .filter(|job| !job.status.is_terminal())
            .count()
    }

    pub fn len(&self) -> usize {
        self.read().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
