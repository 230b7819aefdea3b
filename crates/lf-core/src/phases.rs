//! Pure helpers shared by the phase state machine (spec.md §4.1).
//!
//! Kept separate from [`crate::machine`] because none of this needs the
//! machine's storage/worker/router generics: it is ordinary data-shuffling
//! over [`GameState`] that the machine's phase methods call into.

use std::collections::BTreeMap;

use lf_types::{CharacterActionDraft, CharacterId, ClarificationQa, Phase, ValidationResult};

/// What a phase method decided should happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepOutcome {
    /// Advance to `Phase` and commit a checkpoint.
    Continue(Phase),
    /// The turn has finished; the driver loop should stop.
    TurnComplete,
}

/// Build the re-query text for `second_memory_retrieval`: the narration plus
/// every clarifying question and its answer, concatenated in the order asked
/// (spec.md §4.1 phase 6).
#[must_use]
pub(crate) fn clarification_query(narration: &str, clarifications: &[ClarificationQa]) -> String {
    let mut query = narration.to_string();
    for qa in clarifications {
        query.push(' ');
        query.push_str(&qa.question);
        if let Some(answer) = &qa.answer {
            query.push(' ');
            query.push_str(answer);
        }
    }
    query
}

/// Characters that still need a `character_action` dispatch: either they
/// have no draft yet, or their latest validation verdict asked for a retry
/// (spec.md §4.1 phases 9-11).
#[must_use]
pub(crate) fn characters_needing_action(
    characters: &BTreeMap<CharacterId, lf_types::CharacterSheet>,
    character_actions: &BTreeMap<CharacterId, CharacterActionDraft>,
    validation_results: &BTreeMap<CharacterId, ValidationResult>,
) -> Vec<CharacterId> {
    characters
        .keys()
        .filter(|character_id| match validation_results.get(*character_id) {
            None => !character_actions.contains_key(*character_id),
            Some(ValidationResult::Retry { .. }) => true,
            Some(_) => false,
        })
        .cloned()
        .collect()
}

/// Whether any character's latest validation verdict still asks for a retry
/// (spec.md §4.1 phase 11 branch).
#[must_use]
pub(crate) fn any_validation_retry(validation_results: &BTreeMap<CharacterId, ValidationResult>) -> bool {
    validation_results
        .values()
        .any(|result| matches!(result, ValidationResult::Retry { .. }))
}

/// The turn's single main actor: the one character action drafted with
/// `is_helping: false` (spec.md §4.1 phase 14, §9: helpers never roll the
/// main pool). `character_actions` is keyed by [`CharacterId`], whose `Ord`
/// gives a stable tie-break if more than one slipped through.
///
/// # Errors
/// Returns [`crate::error::PhaseError::Fatal`] if no non-helping action was
/// drafted, or if more than one was (an invariant the `character_action`
/// phase is expected to uphold).
pub(crate) fn main_actor(
    character_actions: &BTreeMap<CharacterId, CharacterActionDraft>,
) -> Result<(CharacterId, CharacterActionDraft), crate::error::PhaseError> {
    let mut main_actors: Vec<(CharacterId, CharacterActionDraft)> = character_actions
        .iter()
        .filter(|(_, draft)| !draft.is_helping)
        .map(|(id, draft)| (id.clone(), draft.clone()))
        .collect();

    if main_actors.is_empty() {
        return Err(crate::error::PhaseError::Fatal(
            "dice_resolution reached with no non-helping character action drafted".to_string(),
        ));
    }
    if main_actors.len() > 1 {
        tracing::warn!(
            count = main_actors.len(),
            "more than one non-helping character action drafted this turn; using the first by character id"
        );
    }
    Ok(main_actors.remove(0))
}

#[cfg(test)]
mod tests {
    use lf_types::TaskType;

    use super::*;

    fn draft(is_helping: bool) -> CharacterActionDraft {
        CharacterActionDraft {
            text: "I act.".to_string(),
            task_type: TaskType::Lasers,
            is_prepared: false,
            is_expert: false,
            is_helping,
            helping_character_id: None,
            justification: "because".to_string(),
        }
    }

    #[test]
    fn clarification_query_includes_questions_and_answers() {
        let qa = ClarificationQa {
            question_id: "q1".to_string(),
            agent_id: lf_types::AgentId::new("agent_alex").expect("valid"),
            question: "Are there guards?".to_string(),
            answer: Some("Two.".to_string()),
        };
        let query = clarification_query("The corridor is dark.", &[qa]);
        assert!(query.contains("corridor"));
        assert!(query.contains("guards"));
        assert!(query.contains("Two"));
    }

    #[test]
    fn main_actor_picks_the_only_non_helper() {
        let mut actions = BTreeMap::new();
        actions.insert(CharacterId::new("char_helper").expect("valid"), draft(true));
        actions.insert(CharacterId::new("char_hero").expect("valid"), draft(false));
        let (id, chosen) = main_actor(&actions).expect("one main actor");
        assert_eq!(id, CharacterId::new("char_hero").expect("valid"));
        assert!(!chosen.is_helping);
    }

    #[test]
    fn main_actor_errors_when_everyone_is_helping() {
        let mut actions = BTreeMap::new();
        actions.insert(CharacterId::new("char_a").expect("valid"), draft(true));
        assert!(main_actor(&actions).is_err());
    }

    #[test]
    fn any_validation_retry_detects_a_single_retry() {
        let mut results = BTreeMap::new();
        results.insert(CharacterId::new("char_a").expect("valid"), ValidationResult::Valid);
        results.insert(
            CharacterId::new("char_b").expect("valid"),
            ValidationResult::Retry { violations: vec!["x".to_string()] },
        );
        assert!(any_validation_retry(&results));
    }
}
