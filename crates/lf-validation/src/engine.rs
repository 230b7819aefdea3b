//! The validation operation (spec.md §4.5).
//!
//! `validate` is the single entry point the `character_action`/`validation`
//! phases call once per attempt. It runs the deterministic pattern scan
//! first; a scan with no findings is valid immediately, without ever
//! consulting the semantic checker. A scan with findings is given to a
//! [`SemanticChecker`] to suppress matches that are contextually fine (a
//! quote of dialogue, a hypothetical) before deciding whether to ask for a
//! retry, auto-correct, or flag the action for the GM.
//!
//! The semantic check is an LLM call in production, dispatched through
//! `lf-worker`'s `TaskKind::ValidationSemantic`; this crate only depends on
//! the [`SemanticChecker`] port so it stays free of any LLM client.

use lf_types::ValidationResult;

use crate::auto_correct::strip_findings;
use crate::patterns::{scan, Finding};

/// The number of `character_action` retries the validation engine grants
/// before falling back to mechanical auto-correction (spec.md §4.5).
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// A port onto the semantic false-positive suppression step.
///
/// Implementors judge whether a pattern match is actually a narrative
/// overreach in context, or an artifact of the surface-level scan (a
/// quoted NPC line, a character musing about a hypothetical outcome).
pub trait SemanticChecker {
    /// Return the subset of `findings` that are genuine overreach once
    /// `action_text`'s surrounding context is taken into account.
    fn filter_genuine(
        &self,
        action_text: &str,
        findings: &[Finding],
    ) -> impl std::future::Future<Output = Vec<Finding>> + Send;
}

/// A checker that performs no suppression: every pattern match is treated
/// as genuine. Used in tests and as a safe default when no LLM-backed
/// checker is configured.
pub struct NoSuppression;

impl SemanticChecker for NoSuppression {
    async fn filter_genuine(&self, _action_text: &str, findings: &[Finding]) -> Vec<Finding> {
        findings.to_vec()
    }
}

/// Validate one character action draft for the given attempt number.
///
/// `attempt` is 1-indexed: the first call for a given action is attempt 1.
/// Attempts strictly before [`MAX_RETRY_ATTEMPTS`] that still find genuine
/// violations return [`ValidationResult::Retry`]; attempt [`MAX_RETRY_ATTEMPTS`]
/// itself and anything beyond auto-corrects instead of asking for another
/// retry (spec.md §8 Scenario 3: attempt 3 is where auto-correction runs,
/// not a fourth dispatch).
pub async fn validate<C: SemanticChecker>(
    action_text: &str,
    attempt: u32,
    checker: &C,
) -> ValidationResult {
    let findings = scan(action_text);
    if findings.is_empty() {
        return ValidationResult::Valid;
    }

    let genuine = checker.filter_genuine(action_text, &findings).await;
    if genuine.is_empty() {
        return ValidationResult::Valid;
    }

    let violations = describe(&genuine);
    if attempt < MAX_RETRY_ATTEMPTS {
        return ValidationResult::Retry { violations };
    }

    let fixed_text = strip_findings(action_text, &genuine);
    if is_coherent(&fixed_text) {
        ValidationResult::AutoFixed {
            violations,
            fixed_text,
        }
    } else {
        ValidationResult::Flagged {
            violations,
            last_candidate: fixed_text,
        }
    }
}

fn describe(findings: &[Finding]) -> Vec<String> {
    findings
        .iter()
        .map(|f| format!("{:?}: \"{}\"", f.category, f.matched_text))
        .collect()
}

/// Whether auto-corrected text is still a usable action draft.
///
/// Stripping forbidden spans can leave the text empty or strip the only
/// verb out of the sentence; either case is incoherent and must be
/// surfaced to the GM instead of silently substituted.
fn is_coherent(text: &str) -> bool {
    if text.trim().is_empty() {
        return false;
    }
    text.split_whitespace().count() >= 3
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SuppressAll;

    impl SemanticChecker for SuppressAll {
        async fn filter_genuine(&self, _action_text: &str, _findings: &[Finding]) -> Vec<Finding> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn clean_action_is_valid_without_consulting_checker() {
        let result = validate("I study the console for a moment.", 1, &NoSuppression).await;
        assert_eq!(result, ValidationResult::Valid);
    }

    #[tokio::test]
    async fn genuine_violation_on_early_attempt_is_retry() {
        let result = validate("I kill the guard.", 1, &NoSuppression).await;
        assert!(matches!(result, ValidationResult::Retry { .. }));
    }

    #[tokio::test]
    async fn semantic_checker_can_suppress_a_surface_match() {
        let result = validate("I kill the guard.", 1, &SuppressAll).await;
        assert_eq!(result, ValidationResult::Valid);
    }

    #[tokio::test]
    async fn attempt_past_budget_auto_corrects_instead_of_retrying() {
        let result = validate("I kill the guard and duck behind cover.", 4, &NoSuppression).await;
        match result {
            ValidationResult::AutoFixed { fixed_text, .. } => {
                assert!(!fixed_text.contains("kill"));
            }
            other => panic!("expected AutoFixed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn auto_correct_that_guts_the_sentence_is_flagged() {
        let result = validate("I kill.", 4, &NoSuppression).await;
        assert!(matches!(result, ValidationResult::Flagged { .. }));
    }

    #[tokio::test]
    async fn attempt_before_budget_still_retries() {
        let before_budget =
            validate("I kill the guard.", MAX_RETRY_ATTEMPTS - 1, &NoSuppression).await;
        assert!(matches!(before_budget, ValidationResult::Retry { .. }));
    }

    #[tokio::test]
    async fn attempt_at_budget_auto_corrects_not_retries() {
        let at_budget =
            validate("I kill the guard quietly.", MAX_RETRY_ATTEMPTS, &NoSuppression).await;
        assert!(!matches!(at_budget, ValidationResult::Retry { .. }));
        assert!(matches!(at_budget, ValidationResult::AutoFixed { .. }));
    }
}
