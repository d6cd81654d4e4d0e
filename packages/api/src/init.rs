//! Server initialization for the generation engine.

use std::sync::Arc;

use actors::start_engine;
use db::{DbConfig, init as init_db};
use genq_core::WordCountApprox;

use crate::backend::build_backend;
use crate::config::ServerConfig;
use crate::state::AppState;

/// Initialize the history archive (if configured) and start the engine.
///
/// This should be called once at server startup before handling requests.
pub async fn init_engine(
    config: &ServerConfig,
) -> Result<AppState, Box<dyn std::error::Error + Send + Sync>> {
    tracing::info!("Initializing generation engine...");

    let history_enabled = match &config.db_endpoint {
        Some(endpoint) => {
            init_db(DbConfig::endpoint(endpoint.clone())).await?;
            true
        }
        None => {
            tracing::info!("History archive disabled");
            false
        }
    };

    let mut engine_config = config.engine_config();
    engine_config.archive_history = history_enabled;

    let backend = build_backend(&config.backend);
    let engine = start_engine(
        engine_config,
        backend,
        Arc::new(WordCountApprox::default()),
    )
    .await?;

    Ok(AppState {
        engine: Arc::new(engine),
        history_enabled,
    })
}
