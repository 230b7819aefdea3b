//! Configuration loading and typed config structures for a game session
//! (spec.md §6.4).
//!
//! The canonical configuration lives in a session's `game-config.yaml`.
//! This module mirrors that structure with strongly-typed, serde-defaulted
//! structs and a loader that reads and validates the file, following the
//! same `from_file`/`parse` shape used throughout this codebase's config
//! loading.

use std::path::Path;

use serde::Deserialize;

use crate::error::PhaseError;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A parsed value failed a semantic check the YAML schema can't express
    /// (spec.md §6.4, e.g. `llm.max_tokens` above the 5000 ceiling).
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

impl From<ConfigError> for PhaseError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

/// The ceiling spec.md §6.4 places on `llm.max_tokens`.
pub const MAX_LLM_TOKENS: u32 = 5000;

/// Top-level session configuration (spec.md §6.4).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GameConfig {
    /// LLM backend settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Temporal knowledge graph connection.
    #[serde(default)]
    pub graph: GraphConfig,
    /// Worker job queue connection.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Memory read-time corruption settings.
    #[serde(default)]
    pub corruption: CorruptionConfig,
    /// Narrative-overreach validation settings.
    #[serde(default)]
    pub validation: ValidationConfig,
    /// GM clarification round settings.
    #[serde(default)]
    pub clarification: ClarificationConfig,
    /// Multi-agent consensus round settings.
    #[serde(default)]
    pub consensus: ConsensusConfig,
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

impl GameConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a parsed value fails [`Self::validate`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a parsed value fails [`Self::validate`].
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field and range invariants the YAML schema itself
    /// can't express (spec.md §6.4).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.max_tokens > MAX_LLM_TOKENS {
            return Err(ConfigError::Invalid(format!(
                "llm.max_tokens {} exceeds the {MAX_LLM_TOKENS} ceiling",
                self.llm.max_tokens
            )));
        }
        if self.llm.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "llm.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.corruption.strength) {
            return Err(ConfigError::Invalid(
                "corruption.strength must be in [0.0, 1.0]".to_string(),
            ));
        }
        if self.validation.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "validation.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            graph: GraphConfig::default(),
            queue: QueueConfig::default(),
            corruption: CorruptionConfig::default(),
            validation: ValidationConfig::default(),
            clarification: ClarificationConfig::default(),
            consensus: ConsensusConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Exponential backoff schedule for worker job retries (spec.md §4.4).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RetryConfig {
    /// Backoff delays in milliseconds, applied in order then held at the last value.
    #[serde(default = "default_retry_delays_ms")]
    pub delays_ms: Vec<u64>,
    /// Maximum number of attempts before a job is marked failed.
    #[serde(default = "default_retry_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delays_ms: default_retry_delays_ms(),
            max_attempts: default_retry_max_attempts(),
        }
    }
}

/// LLM backend configuration (spec.md §6.4 `llm.*`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LlmConfig {
    /// The model identifier passed to the configured backend.
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Maximum tokens per completion; rejected above [`MAX_LLM_TOKENS`].
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Retry/backoff schedule for transient backend failures.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            max_tokens: default_max_tokens(),
            retry: RetryConfig::default(),
        }
    }
}

/// Temporal knowledge graph connection settings (spec.md §6.4 `graph.*`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GraphConfig {
    /// Connection URI.
    #[serde(default = "default_graph_uri")]
    pub uri: String,
    /// Authentication user.
    #[serde(default = "default_graph_user")]
    pub user: String,
    /// Authentication password.
    #[serde(default)]
    pub password: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: default_graph_uri(),
            user: default_graph_user(),
            password: String::new(),
        }
    }
}

/// Worker job queue connection settings (spec.md §6.4 `queue.*`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueueConfig {
    /// NATS host.
    #[serde(default = "default_queue_host")]
    pub host: String,
    /// NATS port.
    #[serde(default = "default_queue_port")]
    pub port: u16,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            host: default_queue_host(),
            port: default_queue_port(),
        }
    }
}

/// Memory read-time corruption settings (spec.md §4.7, §6.4 `corruption.*`).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CorruptionConfig {
    /// Master switch; when false, `search` never corrupts a read.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Global multiplier on corruption probability, in `[0.0, 1.0]`.
    #[serde(default = "default_corruption_strength")]
    pub strength: f64,
}

impl Default for CorruptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strength: default_corruption_strength(),
        }
    }
}

/// Narrative-overreach validation settings (spec.md §4.5, §6.4 `validation.*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ValidationConfig {
    /// Retries granted before auto-correction (mirrors `lf-validation::MAX_RETRY_ATTEMPTS`).
    #[serde(default = "default_validation_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_validation_max_attempts(),
        }
    }
}

/// GM clarification round settings (spec.md §4.1 phases 3-5, §6.4 `clarification.*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ClarificationConfig {
    /// Maximum clarification rounds before the loop is forced to exit.
    #[serde(default = "default_clarification_max_rounds")]
    pub max_rounds: u32,
}

impl Default for ClarificationConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_clarification_max_rounds(),
        }
    }
}

/// Multi-agent consensus round settings (spec.md §4.8, §6.4 `consensus.*`).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ConsensusConfig {
    /// Rounds before a conflicted aggregate is forced to `Timeout`.
    #[serde(default = "default_consensus_max_rounds")]
    pub max_rounds: u32,
    /// Wall-clock seconds before a conflicted aggregate is forced to `Timeout`.
    #[serde(default = "default_consensus_timeout_seconds")]
    pub timeout_seconds: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_consensus_max_rounds(),
            timeout_seconds: default_consensus_timeout_seconds(),
        }
    }
}

/// Logging configuration (spec.md §6.4 `log.*`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_llm_model() -> String {
    "gpt-4o-mini".to_owned()
}

const fn default_max_tokens() -> u32 {
    1024
}

fn default_retry_delays_ms() -> Vec<u64> {
    vec![1000, 2000, 4000, 8000, 10_000]
}

const fn default_retry_max_attempts() -> u32 {
    5
}

fn default_graph_uri() -> String {
    "bolt://localhost:7687".to_owned()
}

fn default_graph_user() -> String {
    "neo4j".to_owned()
}

fn default_queue_host() -> String {
    "localhost".to_owned()
}

const fn default_queue_port() -> u16 {
    4222
}

const fn default_corruption_strength() -> f64 {
    0.3
}

const fn default_validation_max_attempts() -> u32 {
    3
}

const fn default_clarification_max_rounds() -> u32 {
    3
}

const fn default_consensus_max_rounds() -> u32 {
    5
}

const fn default_consensus_timeout_seconds() -> f64 {
    120.0
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.validation.max_attempts, 3);
        assert_eq!(config.clarification.max_rounds, 3);
        assert_eq!(config.consensus.max_rounds, 5);
    }

    #[test]
    fn parse_minimal_yaml_fills_defaults() {
        let config = GameConfig::parse("llm:\n  model: gpt-4o\n").expect("valid");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.max_tokens, 1024);
        assert_eq!(config.queue.port, 4222);
    }

    #[test]
    fn parse_empty_yaml_uses_all_defaults() {
        let config = GameConfig::parse("").expect("valid");
        assert_eq!(config, GameConfig::default());
    }

    #[test]
    fn max_tokens_above_ceiling_is_rejected() {
        let yaml = format!("llm:\n  max_tokens: {}\n", MAX_LLM_TOKENS + 1);
        let result = GameConfig::parse(&yaml);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn corruption_strength_out_of_range_is_rejected() {
        let result = GameConfig::parse("corruption:\n  strength: 1.5\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn full_yaml_round_trips_every_section() {
        let yaml = r"
llm:
  model: claude-3-5-haiku
  max_tokens: 2048
  retry:
    delays_ms: [500, 1000]
    max_attempts: 2
graph:
  uri: bolt://graph.internal:7687
  user: lf_service
  password: hunter2
queue:
  host: nats.internal
  port: 4223
corruption:
  enabled: false
  strength: 0.25
validation:
  max_attempts: 4
clarification:
  max_rounds: 2
consensus:
  max_rounds: 3
  timeout_seconds: 60.0
log:
  level: debug
";
        let config = GameConfig::parse(yaml).expect("valid");
        assert_eq!(config.llm.model, "claude-3-5-haiku");
        assert_eq!(config.llm.retry.max_attempts, 2);
        assert_eq!(config.graph.user, "lf_service");
        assert_eq!(config.queue.port, 4223);
        assert!(!config.corruption.enabled);
        assert_eq!(config.validation.max_attempts, 4);
        assert_eq!(config.clarification.max_rounds, 2);
        assert_eq!(config.consensus.timeout_seconds, 60.0);
        assert_eq!(config.log.level, "debug");
    }
}
