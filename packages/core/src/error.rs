//! Terminal failure reasons for jobs.

use serde::{Deserialize, Serialize};

/// Why a job ended up `Failed`.
///
/// The `Display` form is what pollers see in the `error` field, so each
/// variant carries a distinct prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobError {
    /// The worker pool refused the job (shutdown in progress).
    #[error("Task submission error: {reason}")]
    SubmissionRejected { reason: String },

    /// The backend raised, panicked, or returned an unusable payload.
    #[error("Generation error: {reason}")]
    Generation { reason: String },

    /// Generation succeeded but building the result failed.
    #[error("Result processing error: {reason}")]
    ResultProcessing { reason: String },

    /// The job stayed pending past its deadline.
    #[error("Job timed out after {limit_secs} seconds")]
    Timeout { limit_secs: f64 },
}

impl JobError {
    pub fn submission_rejected(reason: impl Into<String>) -> Self {
        Self::SubmissionRejected {
            reason: reason.into(),
        }
    }

    pub fn generation(reason: impl Into<String>) -> Self {
        Self::Generation {
            reason: reason.into(),
        }
    }

    pub fn result_processing(reason: impl Into<String>) -> Self {
        Self::ResultProcessing {
            reason: reason.into(),
        }
    }

    pub fn timeout(limit: std::time::Duration) -> Self {
        Self::Timeout {
            limit_secs: limit.as_secs_f64(),
        }
    }

    /// Short machine-readable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::SubmissionRejected { .. } => "submission_rejected",
            JobError::Generation { .. } => "generation",
            JobError::ResultProcessing { .. } => "result_processing",
            JobError::Timeout { .. } => "timeout",
        }
    }
}
