//! Error types for the agent worker pool.
//!
//! Uses `thiserror` for typed errors that surface through the entire worker
//! pipeline: NATS connectivity, the durable job registry, LLM calls, prompt
//! rendering, response parsing.

/// Errors that can occur during worker-pool operation.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Failed to connect to or communicate with the NATS server.
    #[error("NATS error: {0}")]
    Nats(String),

    /// Failed to render a prompt template.
    #[error("template render error: {0}")]
    Template(String),

    /// An LLM backend call failed in a way worth retrying: connection
    /// failure, timeout, HTTP 429 (rate limit), or a 5xx server error
    /// (spec.md §7 `Transient`: "rate limit, timeout, connection").
    #[error("LLM backend error (transient): {0}")]
    LlmBackendTransient(String),

    /// An LLM backend call failed in a way retrying will not fix: a 4xx
    /// response other than 429 (bad request, auth failure, not found) or a
    /// response body that does not match the expected shape.
    #[error("LLM backend error (non-transient): {0}")]
    LlmBackendRejected(String),

    /// The LLM response could not be parsed into the job kind's expected
    /// shape.
    #[error("response parse error: {0}")]
    Parse(String),

    /// The durable job registry (`lf-db::WorkerRegistry`) could not be
    /// read or written.
    #[error("job registry error: {0}")]
    Registry(#[from] lf_db::DbError),

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl RunnerError {
    /// Whether this error is transient in the sense of spec.md §7 --
    /// worth retrying with backoff rather than failing the job outright.
    ///
    /// A backend connection/timeout/429/5xx failure or NATS hiccup is
    /// transient; a non-transient LLM rejection, template, or config error
    /// is not -- retrying would just fail the same way.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::LlmBackendTransient(_) | Self::Nats(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_backend_transient_is_retried() {
        assert!(RunnerError::LlmBackendTransient("rate limited".to_owned()).is_transient());
    }

    #[test]
    fn llm_backend_rejected_is_not_retried() {
        assert!(!RunnerError::LlmBackendRejected("bad request".to_owned()).is_transient());
    }

    #[test]
    fn config_and_template_errors_are_not_retried() {
        assert!(!RunnerError::Config("missing key".to_owned()).is_transient());
        assert!(!RunnerError::Template("bad template".to_owned()).is_transient());
    }
}
