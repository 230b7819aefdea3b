//! Forbidden-token stripping for the auto-correct stage (spec.md §4.5).
//!
//! After the third failed validation attempt the engine stops asking the
//! character-action worker to retry and instead mechanically strips the
//! offending spans out of the text. Whether the result still reads as a
//! coherent action is a separate coherence check performed by the caller.

use crate::patterns::Finding;

/// Remove every matched span from `text`, collapsing the surrounding
/// whitespace left behind by each removal.
///
/// `findings` spans are assumed to be byte offsets into `text` as produced
/// by [`crate::patterns::scan`]; overlapping spans are tolerated by
/// stripping in descending start order so earlier offsets stay valid.
#[must_use]
pub fn strip_findings(text: &str, findings: &[Finding]) -> String {
    let mut spans: Vec<(usize, usize)> = findings.iter().map(|f| (f.start, f.end)).collect();
    spans.sort_by(|a, b| b.0.cmp(&a.0));

    let mut result = text.to_string();
    for (start, end) in spans {
        if start > result.len() || end > result.len() || start > end {
            continue;
        }
        result.replace_range(start..end, "");
    }
    collapse_whitespace(&result)
}

fn collapse_whitespace(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{scan, OverreachCategory};

    #[test]
    fn strips_a_single_match_and_collapses_whitespace() {
        let text = "I kill the guard and move on.";
        let findings = scan(text);
        let stripped = strip_findings(text, &findings);
        assert!(!stripped.contains("kill"));
        assert!(!stripped.contains("  "));
    }

    #[test]
    fn strips_multiple_overlapping_category_matches() {
        let text = "I successfully kill the guard, who falls dead instantly.";
        let findings = scan(text);
        assert!(findings.len() >= 2);
        let stripped = strip_findings(text, &findings);
        assert!(!stripped.contains("successfully"));
        assert!(!stripped.contains("kill"));
        assert!(!stripped.contains("falls dead"));
    }

    #[test]
    fn no_findings_returns_original_text_trimmed() {
        let text = "  I aim my blaster at the console.  ";
        let stripped = strip_findings(text, &[]);
        assert_eq!(stripped, "I aim my blaster at the console.");
    }

    #[test]
    fn out_of_range_span_is_skipped_safely() {
        let text = "short";
        let bogus = Finding {
            category: OverreachCategory::OutcomeVerb,
            matched_text: "bogus".to_string(),
            start: 100,
            end: 120,
        };
        let stripped = strip_findings(text, std::slice::from_ref(&bogus));
        assert_eq!(stripped, "short");
    }
}
