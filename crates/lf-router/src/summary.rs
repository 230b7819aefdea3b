//! Deterministic IC summary derivation (spec.md §4.3).

use lf_types::{CharacterId, IcSummary, Message};

/// Derive an [`IcSummary`] from a published IC [`Message`].
///
/// `character_id` names whose action the summary is about: the message's
/// own author when a character published it, or the acted-upon character
/// when the GM publishes outcome narration to the same IC entry. Pure over
/// its inputs: calling this twice on equal inputs produces equal outputs,
/// satisfying the round-trip property in spec.md §8 ("a summary whose
/// `action_summary` is derivable from the original content by the same
/// summarization function").
#[must_use]
pub fn derive_ic_summary(message: &Message, character_id: &CharacterId) -> IcSummary {
    IcSummary {
        character_id: character_id.clone(),
        action_summary: truncate_summary(&message.content),
        outcome_summary: None,
        turn_number: message.turn_number,
        timestamp: message.timestamp,
    }
}

/// Truncate `text` to a short summary, breaking on a word boundary.
fn truncate_summary(text: &str) -> String {
    const MAX_LEN: usize = 140;
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_LEN {
        return trimmed.to_string();
    }
    let mut summary: String = trimmed.chars().take(MAX_LEN).collect();
    if let Some(last_space) = summary.rfind(' ') {
        summary.truncate(last_space);
    }
    summary.push('\u{2026}');
    summary
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use lf_types::{Channel, MessageId, Sender};

    use super::*;

    fn character_message(content: &str) -> (Message, CharacterId) {
        let character_id = CharacterId::new("char_zara_7").expect("valid");
        let message = Message {
            message_id: MessageId::new(),
            timestamp: Utc::now(),
            channel: Channel::Ic,
            from: Sender::Character(character_id.clone()),
            to: None,
            content: content.to_string(),
            turn_number: 1,
            session_number: 1,
        };
        (message, character_id)
    }

    #[test]
    fn short_content_is_not_truncated() {
        let (message, character_id) = character_message("I attempt to repair the console.");
        let summary = derive_ic_summary(&message, &character_id);
        assert_eq!(summary.action_summary, "I attempt to repair the console.");
    }

    #[test]
    fn summarization_is_pure() {
        let (message, character_id) = character_message("I attempt to repair the console.");
        let first = derive_ic_summary(&message, &character_id);
        let second = derive_ic_summary(&message, &character_id);
        assert_eq!(first, second);
    }

    #[test]
    fn long_content_is_truncated_on_word_boundary() {
        let long = "word ".repeat(60);
        let (message, character_id) = character_message(long.trim());
        let summary = derive_ic_summary(&message, &character_id);
        assert!(summary.action_summary.ends_with('\u{2026}'));
        assert!(summary.action_summary.len() < long.len());
    }
}
