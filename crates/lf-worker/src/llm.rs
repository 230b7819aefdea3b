//! LLM backend abstraction, implementations, and the retry contract
//! (spec.md §4.4, §6.4 `llm.*`, §7 `Transient`).
//!
//! Defines an enum-based dispatch for LLM backends, avoiding the
//! dyn-compatibility issues with async trait methods. Concrete
//! implementations exist for `OpenAI`-compatible APIs and the Anthropic
//! Messages API. All backends communicate over HTTP via `reqwest`.
//!
//! This crate owns only the *retry contract* spec.md §1 reserves to the
//! core (the underlying LLM API client itself is an external collaborator):
//! [`complete_with_retry`] wraps a single [`LlmBackend::complete`] call with
//! the exponential backoff schedule from `llm.retry` in
//! [`lf_core::config::GameConfig`], swallowing transient failures up to the
//! configured attempt budget before surfacing
//! [`RunnerError::LlmBackendTransient`] or, for a non-retryable rejection,
//! [`RunnerError::LlmBackendRejected`] immediately.

use lf_core::config::RetryConfig;
use tokio::time::sleep;
use tracing::warn;

use crate::config::{BackendType, LlmBackendConfig};
use crate::error::RunnerError;
use crate::prompt::RenderedPrompt;

/// An LLM backend that can process a prompt and return a response.
///
/// Uses enum dispatch instead of trait objects because async methods
/// are not dyn-compatible in Rust.
pub enum LlmBackend {
    /// `OpenAI`-compatible chat completions API.
    OpenAi(OpenAiBackend),
    /// Anthropic Messages API.
    Anthropic(AnthropicBackend),
}

impl LlmBackend {
    /// Send a prompt to the LLM and return the response text.
    ///
    /// # Errors
    /// Returns [`RunnerError::LlmBackendTransient`] if the HTTP call fails
    /// or returns 429/5xx, or [`RunnerError::LlmBackendRejected`] if it
    /// returns another 4xx or the response cannot be extracted.
    pub async fn complete(
        &self,
        prompt: &RenderedPrompt,
        model: &str,
        max_tokens: u32,
    ) -> Result<String, RunnerError> {
        match self {
            Self::OpenAi(backend) => backend.complete(prompt, model, max_tokens).await,
            Self::Anthropic(backend) => backend.complete(prompt, model, max_tokens).await,
        }
    }

    /// Human-readable name for logging.
    #[must_use]
    pub const fn name(&self) -> &str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }
}

/// Run `backend.complete` under the exponential backoff schedule spec.md
/// §4.4 requires: delays taken in order from `retry.delays_ms`, held at the
/// last value thereafter, up to `retry.max_attempts` total tries.
///
/// Only [`RunnerError::is_transient`] errors are retried; a non-transient
/// rejection (bad request, auth failure) returns immediately rather than
/// burning the whole backoff schedule on a call that can never succeed.
///
/// # Errors
/// Returns the final attempt's error once the retry budget is exhausted, or
/// immediately on the first non-transient error.
pub async fn complete_with_retry(
    backend: &LlmBackend,
    prompt: &RenderedPrompt,
    model: &str,
    max_tokens: u32,
    retry: &RetryConfig,
) -> Result<String, RunnerError> {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match backend.complete(prompt, model, max_tokens).await {
            Ok(text) => return Ok(text),
            Err(err) if attempt < retry.max_attempts && err.is_transient() => {
                let delay_ms = delay_for_attempt(&retry.delays_ms, attempt);
                warn!(
                    backend = backend.name(),
                    attempt,
                    delay_ms,
                    error = %err,
                    "transient LLM backend failure, retrying"
                );
                sleep(std::time::Duration::from_millis(delay_ms)).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// The backoff delay for a 1-indexed attempt number: `delays[attempt - 1]`
/// when present, otherwise the schedule's last configured delay.
fn delay_for_attempt(delays_ms: &[u64], attempt: u32) -> u64 {
    let index = attempt.saturating_sub(1) as usize;
    delays_ms
        .get(index)
        .copied()
        .or_else(|| delays_ms.last().copied())
        .unwrap_or(10_000)
}

/// Whether an HTTP error status is worth retrying (spec.md §7 `Transient`:
/// "rate limit" and transient backend I/O): 429 and any 5xx. Any other 4xx
/// is a permanent rejection of this particular request.
fn is_transient_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Build the appropriately-classified error for a non-success response.
fn status_error(backend: &str, status: reqwest::StatusCode, error_body: &str) -> RunnerError {
    let message = format!("{backend} returned {status}: {error_body}");
    if is_transient_status(status) {
        RunnerError::LlmBackendTransient(message)
    } else {
        RunnerError::LlmBackendRejected(message)
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for `OpenAI`-compatible chat completions APIs.
///
/// Works with `OpenAI`, `DeepSeek`, and Ollama endpoints. Sends requests to
/// `{api_url}/chat/completions`.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl OpenAiBackend {
    /// Create a new `OpenAI`-compatible backend.
    #[must_use]
    pub fn new(config: &LlmBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    async fn complete(
        &self,
        prompt: &RenderedPrompt,
        model: &str,
        max_tokens: u32,
    ) -> Result<String, RunnerError> {
        let url = format!("{}/chat/completions", self.api_url);

        let body = serde_json::json!({
            "model": model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user}
            ],
            "temperature": 0.7,
            "max_tokens": max_tokens,
            "response_format": {"type": "json_object"}
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RunnerError::LlmBackendTransient(format!("OpenAI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(status_error("OpenAI", status, &error_body));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RunnerError::LlmBackendRejected(format!("OpenAI response parse failed: {e}")))?;

        extract_openai_content(&json)
    }
}

fn extract_openai_content(json: &serde_json::Value) -> Result<String, RunnerError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            RunnerError::LlmBackendRejected("OpenAI response missing choices[0].message.content".to_owned())
        })
}

// ---------------------------------------------------------------------------
// Anthropic Messages API backend
// ---------------------------------------------------------------------------

/// Backend for the Anthropic Messages API.
///
/// Anthropic uses a different request format from `OpenAI`: an `x-api-key`
/// header instead of `Authorization: Bearer`, a top-level `system` field
/// rather than a system message, and `content[0].text` in the response.
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl AnthropicBackend {
    /// Create a new Anthropic Messages API backend.
    #[must_use]
    pub fn new(config: &LlmBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    async fn complete(
        &self,
        prompt: &RenderedPrompt,
        model: &str,
        max_tokens: u32,
    ) -> Result<String, RunnerError> {
        let url = format!("{}/messages", self.api_url);

        let body = serde_json::json!({
            "model": model,
            "max_tokens": max_tokens,
            "system": prompt.system,
            "messages": [
                {"role": "user", "content": prompt.user}
            ]
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RunnerError::LlmBackendTransient(format!("Anthropic request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(status_error("Anthropic", status, &error_body));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RunnerError::LlmBackendRejected(format!("Anthropic response parse failed: {e}")))?;

        extract_anthropic_content(&json)
    }
}

fn extract_anthropic_content(json: &serde_json::Value) -> Result<String, RunnerError> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            RunnerError::LlmBackendRejected("Anthropic response missing content[0].text".to_owned())
        })
}

/// Create an LLM backend from configuration.
#[must_use]
pub fn create_backend(config: &LlmBackendConfig) -> LlmBackend {
    match config.backend_type {
        BackendType::OpenAi => LlmBackend::OpenAi(OpenAiBackend::new(config)),
        BackendType::Anthropic => LlmBackend::Anthropic(AnthropicBackend::new(config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_openai_content_valid() {
        let json = serde_json::json!({
            "choices": [{"message": {"content": "{\"intent\": \"investigate\"}"}}]
        });
        let result = extract_openai_content(&json).expect("extracts");
        assert!(result.contains("investigate"));
    }

    #[test]
    fn extract_openai_content_missing_choices() {
        let json = serde_json::json!({"error": "rate_limit"});
        assert!(extract_openai_content(&json).is_err());
    }

    #[test]
    fn extract_anthropic_content_valid() {
        let json = serde_json::json!({"content": [{"type": "text", "text": "{\"reaction\": \"she nods\"}"}]});
        let result = extract_anthropic_content(&json).expect("extracts");
        assert!(result.contains("she nods"));
    }

    #[test]
    fn extract_anthropic_content_missing() {
        let json = serde_json::json!({"content": []});
        assert!(extract_anthropic_content(&json).is_err());
    }

    #[test]
    fn rate_limit_and_server_errors_are_transient() {
        assert!(is_transient_status(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_transient_status(reqwest::StatusCode::SERVICE_UNAVAILABLE));
    }

    #[test]
    fn other_client_errors_are_not_transient() {
        assert!(!is_transient_status(reqwest::StatusCode::BAD_REQUEST));
        assert!(!is_transient_status(reqwest::StatusCode::UNAUTHORIZED));
        assert!(!is_transient_status(reqwest::StatusCode::NOT_FOUND));
    }

    #[test]
    fn status_error_classifies_401_as_rejected() {
        let err = status_error("OpenAI", reqwest::StatusCode::UNAUTHORIZED, "invalid api key");
        assert!(matches!(err, RunnerError::LlmBackendRejected(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn status_error_classifies_429_as_transient() {
        let err = status_error("OpenAI", reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(matches!(err, RunnerError::LlmBackendTransient(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn delay_schedule_holds_last_value_past_its_length() {
        let delays = vec![1000, 2000, 4000, 8000, 10_000];
        assert_eq!(delay_for_attempt(&delays, 1), 1000);
        assert_eq!(delay_for_attempt(&delays, 5), 10_000);
        assert_eq!(delay_for_attempt(&delays, 9), 10_000);
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_attempts() {
        let config = LlmBackendConfig {
            backend_type: BackendType::OpenAi,
            api_url: "http://127.0.0.1:1".to_owned(),
            api_key: "test".to_owned(),
        };
        let backend = create_backend(&config);
        let prompt = RenderedPrompt {
            system: "sys".to_owned(),
            user: "usr".to_owned(),
        };
        let retry = RetryConfig {
            delays_ms: vec![1, 1],
            max_attempts: 2,
        };
        let result = complete_with_retry(&backend, &prompt, "test-model", 64, &retry).await;
        assert!(result.is_err());
    }
}
