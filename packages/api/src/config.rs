//! Server configuration loaded from environment variables.

use std::time::Duration;

use actors::{EngineConfig, default_worker_count};
use genq_core::PromptTemplate;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Which generation backend to run.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendKind {
    /// llama.cpp HTTP server.
    Llama {
        url: String,
        max_tokens: u32,
        temperature: f32,
    },
    /// Canned output after a fixed delay; no model needed.
    Echo { delay: Duration },
}

/// Server configuration.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
    pub workers: usize,
    pub job_timeout: Duration,
    pub drain_timeout: Duration,
    pub backend: BackendKind,
    pub prompt_template: PromptTemplate,
    /// SurrealDB endpoint for the history archive; `None` disables it.
    pub db_endpoint: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: Vec::new(),
            workers: default_worker_count(),
            job_timeout: Duration::from_secs(360),
            drain_timeout: Duration::from_secs(300),
            backend: BackendKind::Llama {
                url: "http://127.0.0.1:8080".to_string(),
                max_tokens: 8192,
                temperature: 0.7,
            },
            prompt_template: PromptTemplate::cad(),
            db_endpoint: Some("mem://".to_string()),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default                 |
    /// |----------------------|-------------------------|
    /// | `HOST`               | `0.0.0.0`               |
    /// | `PORT`               | `8000`                  |
    /// | `CORS_ORIGINS`       | any origin              |
    /// | `WORKER_COUNT`       | `min(cpus, 4)`          |
    /// | `JOB_TIMEOUT_SECS`   | `360`                   |
    /// | `DRAIN_TIMEOUT_SECS` | `300`                   |
    /// | `BACKEND`            | `llama` (or `echo`)     |
    /// | `LLAMA_SERVER_URL`   | `http://127.0.0.1:8080` |
    /// | `MAX_TOKENS`         | `8192`                  |
    /// | `TEMPERATURE`        | `0.7`                   |
    /// | `ECHO_DELAY_MS`      | `1000`                  |
    /// | `PROMPT_TEMPLATE`    | `cad` (or `raw`)        |
    /// | `DB_ENDPOINT`        | `mem://` (`none` = off) |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("HOST").unwrap_or(defaults.host);
        let port = parse_or(&var, "PORT", defaults.port)?;

        let cors_origins = var("CORS_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let workers: usize = parse_or(&var, "WORKER_COUNT", defaults.workers)?;
        if workers == 0 {
            return Err(invalid("WORKER_COUNT", "0"));
        }

        let job_timeout = Duration::from_secs(parse_or(
            &var,
            "JOB_TIMEOUT_SECS",
            defaults.job_timeout.as_secs(),
        )?);
        let drain_timeout = Duration::from_secs(parse_or(
            &var,
            "DRAIN_TIMEOUT_SECS",
            defaults.drain_timeout.as_secs(),
        )?);

        let backend = match var("BACKEND").as_deref().unwrap_or("llama") {
            "llama" => BackendKind::Llama {
                url: var("LLAMA_SERVER_URL")
                    .unwrap_or_else(|| "http://127.0.0.1:8080".to_string())
                    .trim_end_matches('/')
                    .to_string(),
                max_tokens: parse_or(&var, "MAX_TOKENS", 8192)?,
                temperature: parse_or(&var, "TEMPERATURE", 0.7)?,
            },
            "echo" => BackendKind::Echo {
                delay: Duration::from_millis(parse_or(&var, "ECHO_DELAY_MS", 1000)?),
            },
            other => return Err(invalid("BACKEND", other)),
        };

        let prompt_template = match var("PROMPT_TEMPLATE") {
            Some(name) => {
                PromptTemplate::by_name(&name).ok_or_else(|| invalid("PROMPT_TEMPLATE", &name))?
            }
            None => defaults.prompt_template,
        };

        let db_endpoint = match var("DB_ENDPOINT") {
            Some(endpoint) if endpoint.eq_ignore_ascii_case("none") => None,
            Some(endpoint) => Some(endpoint),
            None => defaults.db_endpoint,
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            workers,
            job_timeout,
            drain_timeout,
            backend,
            prompt_template,
            db_endpoint,
        })
    }

    /// Engine settings derived from this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_workers(self.workers)
            .with_job_timeout(self.job_timeout)
            .with_drain_timeout(self.drain_timeout)
            .with_prompt_template(self.prompt_template.clone())
            .with_archive_history(self.db_endpoint.is_some())
    }
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
    }
}

fn parse_or<T, F>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|_| invalid(key, &raw)),
        None => Ok(default),
    }
}
