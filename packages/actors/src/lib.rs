//! Actor system for the generation engine.
//!
//! # Architecture
//!
//! - `JobTable` - shared job statuses; the only state pollers read
//! - `WorkerPool` - admits submissions and feeds a fixed set of workers
//! - `WorkerActor` - runs one blocking backend call at a time
//! - `ResultRouter` - applies worker outcomes to the table in arrival order
//! - `GenerationEngine` - facade tying them together
//!
//! # Usage
//!
//! ```ignore
//! use actors::{EngineConfig, FnBackend, Generation, start_engine};
//! use genq_core::WordCountApprox;
//!
//! let backend = Arc::new(FnBackend::new("stub", |_: &str| Ok(Generation::new("OK"))));
//! let engine = start_engine(EngineConfig::default(), backend, Arc::new(WordCountApprox::default())).await?;
//!
//! let job_id = engine.submit("Benchmark: say OK.").await;
//! let view = engine.status(&job_id).await?;
//! ```

mod backend;
mod engine;
mod messages;
mod panic;
mod pool_actor;
mod router_actor;
mod table;
mod worker_actor;

pub use backend::{BackendError, BackendResult, FnBackend, Generation, GenerationBackend};
pub use engine::{EngineConfig, GenerationEngine, ShutdownReport, default_worker_count, start_engine};
pub use messages::{
    EngineError, Outcome, PoolMessage, PoolStats, RouterMessage, TaggedOutcome, WorkItem,
    WorkerMessage,
};
pub use pool_actor::{PoolArgs, WorkerPool, spawn_worker_pool};
pub use router_actor::{ResultRouter, RouterArgs, spawn_result_router};
pub use table::{JobTable, Transition};
pub use worker_actor::WorkerActor;

/// Re-export ractor types for convenience.
pub use ractor::{Actor, ActorRef, RpcReplyPort, concurrency};
