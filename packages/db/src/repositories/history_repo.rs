//! Generation history repository.

use std::collections::HashMap;

use genq_core::{Job, JobStatus};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;

use crate::{DbError, get_db};

/// Repository for archived generation jobs.
pub struct HistoryRepository;

/// Archived view of a terminal job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub job_id: String,
    pub final_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_generated: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_per_second: Option<f64>,
    pub prompt_tokens: u64,
    pub created_at: String,
    pub finished_at: String,
    pub finished_at_ms: i64,
}

impl HistoryRecord {
    /// Build the archive record for a job; `None` while it is still pending.
    pub fn from_job(job: &Job) -> Option<Self> {
        let mut record = Self {
            job_id: job.id.to_string(),
            final_status: job.status.as_str().to_string(),
            output: None,
            error: None,
            error_kind: None,
            generation_time: None,
            tokens_generated: None,
            tokens_per_second: None,
            prompt_tokens: job.prompt_tokens,
            created_at: job.created_at.to_rfc3339(),
            finished_at: job.updated_at.to_rfc3339(),
            finished_at_ms: job.updated_at.timestamp_millis(),
        };

        match &job.status {
            JobStatus::Pending => return None,
            JobStatus::Completed { result } => {
                record.output = Some(result.output.clone());
                record.generation_time = Some(result.generation_time);
                record.tokens_generated = Some(result.tokens_generated);
                record.tokens_per_second = Some(result.tokens_per_second);
            }
            JobStatus::Failed { error } => {
                record.error = Some(error.to_string());
                record.error_kind = Some(error.kind().to_string());
            }
        }

        Some(record)
    }
}

/// Read shape: SurrealDB adds the record id.
#[derive(Debug, Deserialize)]
struct StoredRecord {
    #[allow(dead_code)]
    id: Option<Thing>,
    #[serde(flatten)]
    record: HistoryRecord,
}

impl HistoryRepository {
    /// Archive a terminal job. Pending jobs are skipped.
    pub async fn archive(job: &Job) -> Result<(), DbError> {
        let db = get_db()?;

        let Some(record) = HistoryRecord::from_job(job) else {
            return Ok(());
        };

        let _: Option<StoredRecord> = db
            .create(("generation_history", job.id.to_string()))
            .content(record)
            .await?;

        tracing::debug!("Archived job {}", job.id);
        Ok(())
    }

    /// Get the archive record of a job.
    pub async fn get(job_id: &str) -> Result<HistoryRecord, DbError> {
        let db = get_db()?;

        let stored: Option<StoredRecord> = db
            .select(("generation_history", job_id.to_string()))
            .await?;

        stored
            .map(|s| s.record)
            .ok_or_else(|| DbError::NotFound(format!("Job not archived: {}", job_id)))
    }

    /// Most recently finished jobs, newest first.
    pub async fn recent(limit: usize) -> Result<Vec<HistoryRecord>, DbError> {
        let db = get_db()?;

        let mut result = db
            .query("SELECT * FROM generation_history ORDER BY finished_at_ms DESC LIMIT $limit")
            .bind(("limit", limit as i64))
            .await?;

        let records: Vec<StoredRecord> = result.take(0)?;

        Ok(records.into_iter().map(|s| s.record).collect())
    }

    /// Count archived jobs by final status.
    pub async fn count_by_status() -> Result<HashMap<String, u64>, DbError> {
        let db = get_db()?;

        let mut result = db
            .query(
                r#"
                SELECT final_status, count() AS count
                FROM generation_history
                GROUP BY final_status
                "#,
            )
            .await?;

        #[derive(Deserialize)]
        struct StatusCount {
            final_status: Option<String>,
            count: i64,
        }

        let counts: Vec<StatusCount> = result.take(0)?;

        let mut map = HashMap::new();
        for count in counts {
            if let Some(status) = count.final_status {
                map.insert(status, count.count.max(0) as u64);
            }
        }

        Ok(map)
    }
}
