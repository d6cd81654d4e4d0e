use std::sync::Arc;

use actors::GenerationEngine;

/// Shared application state available to all handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<GenerationEngine>,
    /// Whether the SurrealDB history archive is connected.
    pub history_enabled: bool,
}
