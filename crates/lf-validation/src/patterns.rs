//! Narrative-overreach pattern scanning (spec.md §4.5, §4.6).
//!
//! A character action is overreaching when its text asserts an outcome the
//! dice have not yet resolved: that an action *succeeded*, that a
//! third-party NPC died or fell, or that some other irreversible state
//! change already happened. This module is the fast, deterministic first
//! pass; [`crate::engine::validate`] layers a semantic false-positive
//! suppression step on top of it.

use regex::Regex;
use std::sync::OnceLock;

/// Category of a detected narrative-overreach pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverreachCategory {
    /// Action text asserts its own success ("I successfully...", "...and it works").
    SuccessAssertion,
    /// Action text narrates an outcome verb past the point of attempt ("I kill the guard").
    OutcomeVerb,
    /// Action text narrates a third party's death, injury, or fall without a roll.
    ThirdPartyNarration,
}

/// A single pattern match within an action's text.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Finding {
    /// Category of the matched pattern.
    pub category: OverreachCategory,
    /// The substring that triggered the match.
    pub matched_text: String,
    /// Byte offset of the match start within the scanned text.
    pub start: usize,
    /// Byte offset of the match end within the scanned text.
    pub end: usize,
}

/// Patterns asserting that an action has already succeeded.
const SUCCESS_ASSERTION_PATTERNS: &[&str] = &[
    r"(?i)\bI successfully\b",
    r"(?i)\band (?:it|this|that) works\b",
    r"(?i)\bI manage to\b",
    r"(?i)\bmy plan works\b",
    r"(?i)\bwithout (?:any )?(?:problem|issue|trouble|difficulty)\b",
    r"(?i)\beffortlessly\b",
    r"(?i)\bflawlessly\b",
    r"(?i)\bI (?:easily|perfectly) \w+",
];

/// Outcome verbs narrated as already having happened, past the point of
/// attempt. Conjugated present/past tense on a first-person subject.
const OUTCOME_VERB_PATTERNS: &[&str] = &[
    r"(?i)\bI kill\b",
    r"(?i)\bI killed\b",
    r"(?i)\bI destroy\b",
    r"(?i)\bI destroyed\b",
    r"(?i)\bI disable\b",
    r"(?i)\bI disabled\b",
    r"(?i)\bI hack (?:into|through)\b",
    r"(?i)\bI hacked (?:into|through)\b",
    r"(?i)\bI defeat\b",
    r"(?i)\bI defeated\b",
    r"(?i)\bI convince\b",
    r"(?i)\bI convinced\b",
    r"(?i)\bI repair\b",
    r"(?i)\bI repaired\b",
    r"(?i)\bI escape\b",
    r"(?i)\bI escaped\b",
    r"(?i)\bI slay\b",
    r"(?i)\bI slew\b",
];

/// Third-party narration: death, injury, or collapse asserted for an NPC
/// or the ship without a roll having resolved it.
const THIRD_PARTY_PATTERNS: &[&str] = &[
    r"(?i)\b(?:he|she|they|it) dies\b",
    r"(?i)\b(?:he|she|they|it) died\b",
    r"(?i)\bfalls? (?:dead|lifeless|unconscious)\b",
    r"(?i)\bit falls\b",
    r"(?i)\bcollapses? (?:dead|lifeless)\b",
    r"(?i)\bthe guard(?:s)? (?:is|are) dead\b",
    r"(?i)\bthe ship explodes\b",
    r"(?i)\bno longer (?:a threat|breathing|alive)\b",
];

fn compiled(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
}

fn success_assertion_regexes() -> &'static [Regex] {
    static CELL: OnceLock<Vec<Regex>> = OnceLock::new();
    CELL.get_or_init(|| compiled(SUCCESS_ASSERTION_PATTERNS))
}

fn outcome_verb_regexes() -> &'static [Regex] {
    static CELL: OnceLock<Vec<Regex>> = OnceLock::new();
    CELL.get_or_init(|| compiled(OUTCOME_VERB_PATTERNS))
}

fn third_party_regexes() -> &'static [Regex] {
    static CELL: OnceLock<Vec<Regex>> = OnceLock::new();
    CELL.get_or_init(|| compiled(THIRD_PARTY_PATTERNS))
}

/// Scan `text` for narrative-overreach patterns across all categories.
///
/// Findings are returned in match order within each category, categories
/// in the order [`OverreachCategory::SuccessAssertion`],
/// [`OverreachCategory::OutcomeVerb`], [`OverreachCategory::ThirdPartyNarration`].
#[must_use]
pub fn scan(text: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    scan_category(text, OverreachCategory::SuccessAssertion, success_assertion_regexes(), &mut findings);
    scan_category(text, OverreachCategory::OutcomeVerb, outcome_verb_regexes(), &mut findings);
    scan_category(text, OverreachCategory::ThirdPartyNarration, third_party_regexes(), &mut findings);
    findings
}

fn scan_category(text: &str, category: OverreachCategory, regexes: &[Regex], out: &mut Vec<Finding>) {
    for re in regexes {
        for m in re.find_iter(text) {
            out.push(Finding {
                category,
                matched_text: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_success_assertion() {
        let findings = scan("I successfully pick the lock.");
        assert!(findings.iter().any(|f| f.category == OverreachCategory::SuccessAssertion));
    }

    #[test]
    fn detects_outcome_verb() {
        let findings = scan("I kill the guard before he can shout.");
        assert!(findings.iter().any(|f| f.category == OverreachCategory::OutcomeVerb));
    }

    #[test]
    fn detects_third_party_narration() {
        let findings = scan("The guard falls dead before hitting the floor.");
        assert!(findings.iter().any(|f| f.category == OverreachCategory::ThirdPartyNarration));
    }

    #[test]
    fn clean_action_has_no_findings() {
        let findings = scan("I aim my blaster at the console and pull the trigger.");
        assert!(findings.is_empty());
    }

    #[test]
    fn scenario_3_retry_escalation_strings_are_all_flagged() {
        let attempt_1 = scan("I slay the goblin.");
        assert!(attempt_1.iter().any(|f| f.category == OverreachCategory::OutcomeVerb));

        let attempt_2 = scan("I swing my blade; it dies.");
        assert!(attempt_2.iter().any(|f| f.category == OverreachCategory::ThirdPartyNarration));

        let attempt_3 = scan("I attempt to strike the goblin; it falls.");
        assert!(attempt_3.iter().any(|f| f.category == OverreachCategory::ThirdPartyNarration));
    }

    #[test]
    fn finding_spans_point_at_the_match() {
        let text = "After a pause, I kill the guard.";
        let findings = scan(text);
        let hit = findings
            .iter()
            .find(|f| f.category == OverreachCategory::OutcomeVerb)
            .expect("outcome verb finding");
        assert_eq!(&text[hit.start..hit.end], hit.matched_text);
    }
}
