//! LLM response parsing into each job kind's typed result (spec.md §4.4).
//!
//! The LLM returns raw text that is ideally clean JSON but in practice
//! sometimes arrives wrapped in a markdown code fence or carrying a
//! trailing comma. [`parse_json_response`] tries progressively more
//! permissive recovery strategies before giving up, mirroring the
//! teacher's layered `try_parse` approach.

use serde::de::DeserializeOwned;

use crate::error::RunnerError;

/// Parse `raw` into `T`, trying direct deserialization first and falling
/// back to markdown-fence stripping and trailing-comma removal.
///
/// # Errors
/// Returns [`RunnerError::Parse`] if no recovery strategy produces valid
/// JSON matching `T`'s shape.
pub fn parse_json_response<T: DeserializeOwned>(raw: &str) -> Result<T, RunnerError> {
    if let Ok(value) = serde_json::from_str::<T>(raw) {
        return Ok(value);
    }

    let fenced = strip_code_fence(raw);
    if let Ok(value) = serde_json::from_str::<T>(&fenced) {
        return Ok(value);
    }

    let cleaned = strip_trailing_commas(&fenced);
    serde_json::from_str::<T>(&cleaned)
        .map_err(|err| RunnerError::Parse(format!("could not parse LLM response as JSON: {err}; raw={raw}")))
}

/// Strip a leading/trailing markdown code fence (`` ```json `` or `` ``` ``)
/// if present, otherwise return the input unchanged.
fn strip_code_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    let Some(without_open) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let without_lang = without_open
        .strip_prefix("json")
        .unwrap_or(without_open)
        .trim_start_matches('\n');
    without_lang
        .strip_suffix("```")
        .unwrap_or(without_lang)
        .trim()
        .to_string()
}

/// Remove trailing commas before a closing `}` or `]`, a common LLM JSON
/// mistake that a strict parser rejects outright.
fn strip_trailing_commas(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ',' {
            let mut lookahead = chars.clone();
            while let Some(next) = lookahead.peek() {
                if next.is_whitespace() {
                    lookahead.next();
                } else {
                    break;
                }
            }
            if matches!(lookahead.peek(), Some('}') | Some(']')) {
                continue;
            }
        }
        cleaned.push(c);
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Intent {
        intent: String,
    }

    #[test]
    fn parses_clean_json() {
        let parsed: Intent = parse_json_response(r#"{"intent": "investigate"}"#).expect("parses");
        assert_eq!(parsed.intent, "investigate");
    }

    #[test]
    fn parses_fenced_json() {
        let raw = "```json\n{\"intent\": \"retreat\"}\n```";
        let parsed: Intent = parse_json_response(raw).expect("parses");
        assert_eq!(parsed.intent, "retreat");
    }

    #[test]
    fn parses_json_with_trailing_comma() {
        let raw = r#"{"intent": "wait",}"#;
        let parsed: Intent = parse_json_response(raw).expect("parses");
        assert_eq!(parsed.intent, "wait");
    }

    #[test]
    fn rejects_garbage() {
        let result: Result<Intent, RunnerError> = parse_json_response("not json at all");
        assert!(result.is_err());
    }
}
