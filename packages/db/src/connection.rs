//! Process-wide SurrealDB handle for the history archive.

use std::sync::LazyLock;
use surrealdb::Surreal;
use surrealdb::engine::any::{Any, connect};
use thiserror::Error;
use tokio::sync::OnceCell;

const NAMESPACE: &str = "genq";
const DATABASE: &str = "main";

static DB: LazyLock<OnceCell<Database>> = LazyLock::new(OnceCell::new);

/// Handle to the archive database, whatever engine backs it.
pub type Database = Surreal<Any>;

/// Where the history archive lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// `mem://`, or `rocksdb://<path>` when built with the `rocksdb` feature.
    pub endpoint: String,
}

impl DbConfig {
    pub fn memory() -> Self {
        Self::endpoint("mem://")
    }

    pub fn endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    /// The part of the endpoint before `://`.
    pub fn scheme(&self) -> &str {
        self.endpoint
            .split_once("://")
            .map_or("", |(scheme, _)| scheme)
    }

    /// Whether this build links an engine for the endpoint's scheme.
    pub fn is_supported(&self) -> bool {
        supported_schemes().contains(&self.scheme())
    }
}

fn supported_schemes() -> &'static [&'static str] {
    if cfg!(feature = "rocksdb") {
        &["mem", "rocksdb"]
    } else {
        &["mem"]
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database not initialized - call init_db first")]
    NotInitialized,
    #[error("Unsupported database endpoint: {0}")]
    UnsupportedEndpoint(String),
    #[error("Connection error: {0}")]
    Connection(#[from] surrealdb::Error),
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Connect to the archive once; later calls reuse the first connection.
///
/// Endpoints whose engine is not compiled in are refused before any
/// connection attempt, so a bad `DB_ENDPOINT` fails at startup with a
/// readable message.
pub async fn init_db(config: DbConfig) -> Result<&'static Database, DbError> {
    if !config.is_supported() {
        return Err(DbError::UnsupportedEndpoint(config.endpoint));
    }

    DB.get_or_try_init(|| async {
        let db = connect(config.endpoint.as_str()).await?;
        db.use_ns(NAMESPACE).use_db(DATABASE).await?;
        tracing::info!(endpoint = %config.endpoint, "History archive connected");
        Ok(db)
    })
    .await
}

pub fn get_db() -> Result<&'static Database, DbError> {
    DB.get().ok_or(DbError::NotInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_endpoint_is_supported() {
        let config = DbConfig::memory();
        assert_eq!(config.endpoint, "mem://");
        assert_eq!(config.scheme(), "mem");
        assert!(config.is_supported());
    }

    #[test]
    fn test_remote_endpoints_are_not_linked() {
        for endpoint in ["ws://localhost:8000", "http://db:8000", "localhost"] {
            assert!(!DbConfig::endpoint(endpoint).is_supported(), "{endpoint}");
        }
    }

    #[test]
    fn test_rocksdb_follows_feature() {
        let config = DbConfig::endpoint("rocksdb://./history");
        assert_eq!(config.scheme(), "rocksdb");
        assert_eq!(config.is_supported(), cfg!(feature = "rocksdb"));
    }

    #[tokio::test]
    async fn test_unsupported_endpoint_is_refused_before_connecting() {
        let result = init_db(DbConfig::endpoint("ws://localhost:8000")).await;

        match result {
            Err(DbError::UnsupportedEndpoint(endpoint)) => {
                assert_eq!(endpoint, "ws://localhost:8000")
            }
            other => panic!("expected UnsupportedEndpoint, got {other:?}"),
        }
        assert!(matches!(get_db(), Err(DbError::NotInitialized)));
    }
}
