//! Engine-process configuration: the shared [`lf_core::config::GameConfig`]
//! plus the environment-sourced connection strings this process needs.
//!
//! Mirrors `lf-worker`'s `WorkerConfig` convention: game-wide settings come
//! from the checked-in YAML, deployment-specific secrets and connection
//! strings come from the environment.

use lf_core::config::GameConfig;

use crate::error::EngineError;

/// Complete engine configuration: the shared [`GameConfig`] plus the
/// environment-sourced connection strings the session runtime needs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// The session-wide configuration (spec.md §6.4).
    pub game: GameConfig,
    /// `DATABASE_URL` for the durable checkpoint/channel/memory/event store.
    pub database_url: String,
    /// `DRAGONFLY_URL` for the hot-state mirror. Optional: when unset the
    /// engine runs without the cache, reading every phase straight from
    /// Postgres.
    pub dragonfly_url: Option<String>,
    /// `NATS_URL`, falling back to `game.queue.host`/`game.queue.port`.
    pub nats_url: String,
    /// Path to the session roster YAML (characters, personalities,
    /// ownership). Default `roster.yaml`.
    pub roster_path: String,
    /// Port the GM command boundary HTTP/`WebSocket` server binds to.
    pub gm_adapter_port: u16,
    /// How long a claimed-but-unfinished job is considered abandoned
    /// before `abort_turn`'s recovery path reaps it.
    pub job_stale_after_secs: u64,
}

impl EngineConfig {
    /// Load configuration from a `GameConfig` plus environment variables.
    ///
    /// Required:
    /// - `DATABASE_URL` -- Postgres connection string
    ///
    /// Optional:
    /// - `DRAGONFLY_URL` -- hot-cache connection string
    /// - `NATS_URL` -- overrides `game.queue.host`/`game.queue.port`
    /// - `ROSTER_PATH` -- default `roster.yaml`
    /// - `GM_ADAPTER_PORT` -- default `8089`
    /// - `JOB_STALE_AFTER_SECS` -- default `180`
    ///
    /// # Errors
    /// Returns [`EngineError::EngineConfig`] if a required variable is
    /// missing or a present one fails to parse.
    pub fn from_env(game: GameConfig) -> Result<Self, EngineError> {
        let database_url = env_var("DATABASE_URL")?;
        let dragonfly_url = std::env::var("DRAGONFLY_URL").ok();
        let nats_url = std::env::var("NATS_URL")
            .unwrap_or_else(|_| format!("nats://{}:{}", game.queue.host, game.queue.port));
        let roster_path = std::env::var("ROSTER_PATH").unwrap_or_else(|_| "roster.yaml".to_owned());

        let gm_adapter_port: u16 = std::env::var("GM_ADAPTER_PORT")
            .unwrap_or_else(|_| "8089".to_owned())
            .parse()
            .map_err(|err| EngineError::EngineConfig {
                message: format!("invalid GM_ADAPTER_PORT: {err}"),
            })?;

        let job_stale_after_secs: u64 = std::env::var("JOB_STALE_AFTER_SECS")
            .unwrap_or_else(|_| "180".to_owned())
            .parse()
            .map_err(|err| EngineError::EngineConfig {
                message: format!("invalid JOB_STALE_AFTER_SECS: {err}"),
            })?;

        Ok(Self {
            game,
            database_url,
            dragonfly_url,
            nats_url,
            roster_path,
            gm_adapter_port,
            job_stale_after_secs,
        })
    }
}

fn env_var(name: &str) -> Result<String, EngineError> {
    std::env::var(name).map_err(|err| EngineError::EngineConfig {
        message: format!("missing required env var {name}: {err}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_database_url_is_reported() {
        // SAFETY: single-threaded test, no concurrent env mutation.
        unsafe {
            std::env::remove_var("DATABASE_URL");
        }
        let result = EngineConfig::from_env(GameConfig::default());
        assert!(matches!(result, Err(EngineError::EngineConfig { .. })));
    }
}
