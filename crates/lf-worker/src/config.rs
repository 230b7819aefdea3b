//! Configuration for the agent worker pool.
//!
//! The game-wide settings (LLM model, retry schedule, queue host/port) come
//! from the shared [`lf_core::config::GameConfig`] YAML, exactly as every
//! other crate in this workspace loads it. Secrets and deployment-specific
//! connection strings -- the LLM API key, the Postgres URL -- are read from
//! the environment, following the teacher's convention that credentials
//! never live in a checked-in config file.

use std::time::Duration;

use lf_core::config::GameConfig;

use crate::error::RunnerError;

/// Complete worker configuration: the shared [`GameConfig`] plus the
/// environment-sourced secrets and connection strings this process needs.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// The session-wide configuration (spec.md §6.4).
    pub game: GameConfig,
    /// `NATS_URL`, e.g. `nats://localhost:4222`. Falls back to
    /// `game.queue.host`/`game.queue.port` when unset.
    pub nats_url: String,
    /// `DATABASE_URL` for the durable job registry (spec.md §6.3).
    pub database_url: String,
    /// The LLM backend this worker calls.
    pub backend: LlmBackendConfig,
    /// Path to the prompt templates directory (default `templates`).
    pub templates_dir: String,
    /// Maximum number of jobs this process processes concurrently across
    /// all task-kind queues (spec.md §4.4: "1-2 workers per active agent").
    pub max_concurrent_jobs: usize,
    /// How long a job claimed but not updated is considered abandoned
    /// (spec.md §4.4 `recover`).
    pub stale_after: Duration,
}

/// Configuration for the LLM backend this worker calls.
#[derive(Debug, Clone)]
pub struct LlmBackendConfig {
    /// The backend type (`OpenAI`-compatible or Anthropic).
    pub backend_type: BackendType,
    /// Base API URL.
    pub api_url: String,
    /// API key for authentication.
    pub api_key: String,
}

/// Supported LLM backend wire formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible chat completions API (also works with
    /// `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
}

impl WorkerConfig {
    /// Load configuration from a `GameConfig` YAML path plus environment
    /// variables.
    ///
    /// Required environment variables:
    /// - `DATABASE_URL` -- Postgres connection string for the job registry
    /// - `LLM_BACKEND` -- `openai` or `anthropic`
    /// - `LLM_API_URL` -- backend base URL
    /// - `LLM_API_KEY` -- backend API key
    ///
    /// Optional:
    /// - `NATS_URL` -- overrides `game.queue.host`/`game.queue.port`
    /// - `TEMPLATES_DIR` -- default `templates`
    /// - `MAX_CONCURRENT_JOBS` -- default 8
    /// - `JOB_STALE_AFTER_SECS` -- default 180
    ///
    /// # Errors
    /// Returns [`RunnerError::Config`] if a required variable is missing or
    /// a present one fails to parse.
    pub fn from_env(game: GameConfig) -> Result<Self, RunnerError> {
        let database_url = env_var("DATABASE_URL")?;

        let nats_url = std::env::var("NATS_URL")
            .unwrap_or_else(|_| format!("nats://{}:{}", game.queue.host, game.queue.port));

        let backend_str = env_var("LLM_BACKEND")?;
        let backend_type = match backend_str.to_lowercase().as_str() {
            "openai" | "deepseek" | "ollama" => BackendType::OpenAi,
            "anthropic" | "claude" => BackendType::Anthropic,
            other => return Err(RunnerError::Config(format!("unknown LLM_BACKEND: {other}"))),
        };
        let backend = LlmBackendConfig {
            backend_type,
            api_url: env_var("LLM_API_URL")?,
            api_key: env_var("LLM_API_KEY")?,
        };

        let templates_dir = std::env::var("TEMPLATES_DIR").unwrap_or_else(|_| "templates".to_owned());

        let max_concurrent_jobs: usize = std::env::var("MAX_CONCURRENT_JOBS")
            .unwrap_or_else(|_| "8".to_owned())
            .parse()
            .map_err(|err| RunnerError::Config(format!("invalid MAX_CONCURRENT_JOBS: {err}")))?;

        let stale_after_secs: u64 = std::env::var("JOB_STALE_AFTER_SECS")
            .unwrap_or_else(|_| "180".to_owned())
            .parse()
            .map_err(|err| RunnerError::Config(format!("invalid JOB_STALE_AFTER_SECS: {err}")))?;

        Ok(Self {
            game,
            nats_url,
            database_url,
            backend,
            templates_dir,
            max_concurrent_jobs,
            stale_after: Duration::from_secs(stale_after_secs),
        })
    }
}

fn env_var(name: &str) -> Result<String, RunnerError> {
    std::env::var(name).map_err(|err| RunnerError::Config(format!("missing required env var {name}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_type_matches_game_config_model() {
        let config = LlmBackendConfig {
            backend_type: BackendType::Anthropic,
            api_url: "https://api.anthropic.com/v1".to_owned(),
            api_key: "test-key".to_owned(),
        };
        assert_eq!(config.backend_type, BackendType::Anthropic);
    }
}
