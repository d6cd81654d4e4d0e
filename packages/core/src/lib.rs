//! Core domain types for the generation job engine.
//!
//! This crate contains shared types used across all packages:
//! - Job, JobStatus and JobView for submitted generation work
//! - JobError for the terminal failure taxonomy
//! - GenerationStats for aggregate throughput numbers
//! - TokenCounter and PromptTemplate, the small collaborators used at submission

mod error;
mod job;
mod prompt;
mod stats;
mod tokens;

pub use error::JobError;
pub use job::{GenerationResult, Job, JobId, JobState, JobStatus, JobView};
pub use prompt::PromptTemplate;
pub use stats::GenerationStats;
pub use tokens::{TokenCounter, WordCountApprox};
