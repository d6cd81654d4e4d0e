//! Repository implementations for database operations.

mod history_repo;

pub use history_repo::{HistoryRecord, HistoryRepository};
