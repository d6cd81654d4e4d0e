//! Job domain types for submitted generation work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::JobError;

/// Unique identifier for a job, using ULID for chronological sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Ulid);

impl JobId {
    /// Create a new unique job ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse a job ID from a string.
    pub fn parse(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Measurements of a successful generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Generated text, trimmed.
    pub output: String,
    /// Seconds between submission and completion.
    pub generation_time: f64,
    pub tokens_generated: u64,
    pub tokens_per_second: f64,
    pub prompt_tokens: u64,
    pub total_tokens: u64,
}

impl GenerationResult {
    /// Build a result, deriving throughput and totals.
    ///
    /// A non-positive `generation_time` yields zero tokens per second.
    pub fn new(
        output: impl Into<String>,
        generation_time: f64,
        tokens_generated: u64,
        prompt_tokens: u64,
    ) -> Self {
        let tokens_per_second = if generation_time > 0.0 {
            tokens_generated as f64 / generation_time
        } else {
            0.0
        };

        Self {
            output: output.into(),
            generation_time,
            tokens_generated,
            tokens_per_second,
            prompt_tokens,
            total_tokens: prompt_tokens.saturating_add(tokens_generated),
        }
    }
}

/// Current status of a job in its lifecycle.
///
/// `Pending` moves to exactly one of the terminal variants and never back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is queued or being generated.
    #[default]
    Pending,
    /// Generation finished and the result was recorded.
    Completed { result: GenerationResult },
    /// Job failed; see the error for the cause.
    Failed { error: JobError },
}

impl JobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }

    pub fn state(&self) -> JobState {
        match self {
            JobStatus::Pending => JobState::Pending,
            JobStatus::Completed { .. } => JobState::Completed,
            JobStatus::Failed { .. } => JobState::Failed,
        }
    }

    /// Get a simple status string for display.
    pub fn as_str(&self) -> &'static str {
        self.state().as_str()
    }
}

/// Payload-free status, as reported to pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single generation request and its tracked outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier for this job.
    pub id: JobId,
    /// Current status.
    pub status: JobStatus,
    /// Best-effort token count of the rendered prompt.
    pub prompt_tokens: u64,
    /// When the job was submitted.
    pub created_at: DateTime<Utc>,
    /// When the status last changed.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new pending job.
    pub fn new(prompt_tokens: u64) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            status: JobStatus::Pending,
            prompt_tokens,
            created_at: now,
            updated_at: now,
        }
    }

    /// Seconds elapsed since submission, clamped at zero.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Whether a pending job has outlived `deadline`.
    pub fn is_overdue(&self, now: DateTime<Utc>, deadline: std::time::Duration) -> bool {
        matches!(self.status, JobStatus::Pending)
            && self.elapsed_secs(now) > deadline.as_secs_f64()
    }

    /// Render the poller-facing view of this job.
    pub fn view(&self) -> JobView {
        let (result, error) = match &self.status {
            JobStatus::Pending => (None, None),
            JobStatus::Completed { result } => (Some(result.clone()), None),
            JobStatus::Failed { error } => (None, Some(error.to_string())),
        };

        JobView {
            job_id: self.id.to_string(),
            status: self.status.state(),
            result,
            error,
        }
    }
}

/// What `GET /check-result/{job_id}` returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobView {
    pub job_id: String,
    pub status: JobState,
    pub result: Option<GenerationResult>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn throughput_is_guarded_against_zero_time() {
        let result = GenerationResult::new("OK", 0.0, 1, 10);
        assert_eq!(result.tokens_per_second, 0.0);
        assert_eq!(result.total_tokens, 11);

        let result = GenerationResult::new("OK", 0.5, 1, 10);
        assert_eq!(result.tokens_per_second, 2.0);
    }

    #[test]
    fn view_exposes_exactly_one_of_result_or_error() {
        let mut job = Job::new(3);
        let view = job.view();
        assert_eq!(view.status, JobState::Pending);
        assert!(view.result.is_none() && view.error.is_none());

        job.status = JobStatus::Completed {
            result: GenerationResult::new("OK", 1.0, 1, 3),
        };
        let view = job.view();
        assert_eq!(view.status, JobState::Completed);
        assert!(view.result.is_some() && view.error.is_none());

        job.status = JobStatus::Failed {
            error: JobError::generation("boom"),
        };
        let view = job.view();
        assert_eq!(view.status, JobState::Failed);
        assert!(view.result.is_none());
        assert_eq!(view.error.as_deref(), Some("Generation error: boom"));
    }

    #[test]
    fn view_serializes_nulls_and_lowercase_status() {
        let job = Job::new(0);
        let json = serde_json::to_value(job.view()).unwrap();
        assert_eq!(json["status"], "pending");
        assert!(json["result"].is_null());
        assert!(json["error"].is_null());
        assert_eq!(json["job_id"], job.id.to_string());
    }

    #[test]
    fn only_pending_jobs_become_overdue() {
        let mut job = Job::new(0);
        let later = job.created_at + chrono::Duration::seconds(10);
        assert!(job.is_overdue(later, Duration::from_secs(5)));
        assert!(!job.is_overdue(later, Duration::from_secs(30)));

        job.status = JobStatus::Failed {
            error: JobError::generation("boom"),
        };
        assert!(!job.is_overdue(later, Duration::from_secs(5)));
    }

    #[test]
    fn job_id_round_trips_through_display() {
        let id = JobId::new();
        assert_eq!(JobId::parse(&id.to_string()).unwrap(), id);
        assert!(JobId::parse("not-a-ulid").is_err());
    }
}
