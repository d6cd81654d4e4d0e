//! Database schema definitions using SurrealQL.

use crate::{DbError, get_db};

/// Initialize the database schema.
pub async fn init_schema() -> Result<(), DbError> {
    let db = get_db()?;

    tracing::info!("Initializing database schema...");

    db.query(GENERATION_HISTORY_SCHEMA).await?.check()?;

    tracing::info!("Database schema initialized");

    Ok(())
}

/// Archive of jobs that reached a terminal state.
const GENERATION_HISTORY_SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS generation_history SCHEMAFULL;

DEFINE FIELD IF NOT EXISTS job_id ON generation_history TYPE string;
DEFINE FIELD IF NOT EXISTS final_status ON generation_history TYPE string;
DEFINE FIELD IF NOT EXISTS output ON generation_history TYPE option<string>;
DEFINE FIELD IF NOT EXISTS error ON generation_history TYPE option<string>;
DEFINE FIELD IF NOT EXISTS error_kind ON generation_history TYPE option<string>;
DEFINE FIELD IF NOT EXISTS generation_time ON generation_history TYPE option<float>;
DEFINE FIELD IF NOT EXISTS tokens_generated ON generation_history TYPE option<int>;
DEFINE FIELD IF NOT EXISTS tokens_per_second ON generation_history TYPE option<float>;
DEFINE FIELD IF NOT EXISTS prompt_tokens ON generation_history TYPE int DEFAULT 0;
DEFINE FIELD IF NOT EXISTS created_at ON generation_history TYPE string;
DEFINE FIELD IF NOT EXISTS finished_at ON generation_history TYPE string;
DEFINE FIELD IF NOT EXISTS finished_at_ms ON generation_history TYPE int;

DEFINE INDEX IF NOT EXISTS history_job ON generation_history FIELDS job_id UNIQUE;
DEFINE INDEX IF NOT EXISTS history_status ON generation_history FIELDS final_status;
DEFINE INDEX IF NOT EXISTS history_finished ON generation_history FIELDS finished_at_ms;
"#;
