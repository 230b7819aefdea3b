//! Error types for the session runtime binary.
//!
//! [`EngineError`] is the top-level error type that wraps every subsystem's
//! own error so `main` can propagate with `?` and report a single
//! diagnostic on exit.

/// Top-level error for the session runtime binary.
///
/// Each variant wraps a specific subsystem error, providing a single error
/// type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The session-wide `GameConfig` YAML failed to load or validate.
    #[error("game config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: lf_core::config::ConfigError,
    },

    /// The session roster (characters, personalities, ownership) failed to
    /// load or failed validation.
    #[error("roster error: {message}")]
    Roster {
        /// Description of the roster failure.
        message: String,
    },

    /// A required environment variable was missing or failed to parse.
    #[error("engine config error: {message}")]
    EngineConfig {
        /// Description of the configuration failure.
        message: String,
    },

    /// The data layer (Postgres, Dragonfly, job registry) could not be
    /// reached, migrated, or queried.
    #[error("data layer error: {source}")]
    Db {
        /// The underlying data layer error.
        #[from]
        source: lf_db::DbError,
    },

    /// The NATS job queue connection or a publish/subscribe call failed.
    #[error("NATS error: {message}")]
    Nats {
        /// Description of the NATS failure.
        message: String,
    },

    /// The GM command boundary server failed to start.
    #[error("GM adapter error: {source}")]
    GmAdapter {
        /// The underlying startup error.
        #[from]
        source: lf_gm_adapter::startup::StartupError,
    },

    /// The phase state machine returned an unrecoverable failure.
    #[error("turn machine error: {source}")]
    Phase {
        /// The underlying phase error.
        #[from]
        source: lf_core::error::PhaseError,
    },

    /// Reading a configuration or roster file from disk failed.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
