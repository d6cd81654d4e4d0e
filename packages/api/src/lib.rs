//! HTTP API for the generation job engine.
//!
//! This crate contains the axum routes for:
//! - Job submission and polling (`/generate`, `/check-result/{job_id}`)
//! - Monitoring (`/health`, `/stats`, `/history`)
//! - The throughput benchmark (`/benchmark`)
//!
//! It also owns the environment configuration and the concrete
//! generation backends.

pub mod backend;
pub mod benchmark;
pub mod config;
pub mod error;
pub mod history;
mod init;
pub mod jobs;
pub mod monitoring;
pub mod router;
pub mod state;

pub use config::{BackendKind, ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use init::init_engine;
pub use router::build_app_router;
pub use state::AppState;
