//! Message types for actor communication.

use std::time::Duration;

use genq_core::{JobError, JobId};
use ractor::RpcReplyPort;
use serde::Serialize;

/// A unit of work handed to the pool.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub job_id: JobId,
    /// Fully rendered prompt.
    pub prompt: String,
}

/// What a worker produced for one job.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The backend returned usable text.
    Generated { text: String, elapsed: Duration },
    /// The backend failed.
    Failed { error: JobError },
}

/// An outcome tagged with the job it belongs to.
#[derive(Debug, Clone)]
pub struct TaggedOutcome {
    pub job_id: JobId,
    pub worker_id: String,
    pub outcome: Outcome,
}

/// Messages for the ResultRouter.
#[derive(Debug)]
pub enum RouterMessage {
    /// Apply an outcome to the job table.
    Outcome(Box<TaggedOutcome>),

    /// Sentinel: reply with the number of outcomes applied, then stop.
    Stop { ack: RpcReplyPort<u64> },
}

/// Messages for the WorkerPool.
#[derive(Debug)]
pub enum PoolMessage {
    /// Admit work; replies `false` once the pool stopped accepting.
    Submit {
        work: WorkItem,
        reply: RpcReplyPort<bool>,
    },

    /// A worker finished its job and handed off the outcome.
    WorkerIdle { worker_id: String },

    /// Stop admitting work. Replies once the flag is flipped.
    StopAccepting { reply: RpcReplyPort<()> },

    /// Reply once the backlog is empty and every worker is idle.
    AwaitDrained { reply: RpcReplyPort<()> },

    /// Get pool stats.
    GetStats { reply: RpcReplyPort<PoolStats> },
}

/// Messages for the WorkerActor.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Run one generation.
    Process { work: Box<WorkItem> },
}

/// Point-in-time view of the pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub workers: usize,
    pub busy: usize,
    pub queued: usize,
    pub accepting: bool,
}

/// Error type for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Failed to start actor: {0}")]
    Spawn(String),

    #[error("Timed out waiting for job {0}")]
    WaitTimeout(String),
}
