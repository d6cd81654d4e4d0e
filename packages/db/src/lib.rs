//! SurrealDB integration for the generation job engine.
//!
//! This crate provides database connectivity and the repository that
//! archives finished generation jobs.
//!
//! # Features
//!
//! - `memory` (default): `mem://` endpoints
//! - `rocksdb`: also accept `rocksdb://<path>` for a persistent archive

mod connection;
pub mod repositories;
mod schema;

pub use connection::{Database, DbConfig, DbError, get_db, init_db};
pub use schema::init_schema;

/// Initialize the database with the given configuration.
///
/// This should be called once at application startup.
pub async fn init(config: DbConfig) -> Result<(), DbError> {
    init_db(config).await?;
    init_schema().await?;
    Ok(())
}
