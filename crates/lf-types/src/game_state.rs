//! The per-session turn state record (spec.md §3 `GameState`).
//!
//! `GameState` is owned by the phase state machine in `lf-core` for the life
//! of a session; it is snapshotted to `lf-db` after every phase transition.
//! Everything else reads isolated projections of it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dice::DiceResult;
use crate::enums::{MemoryType, Outcome, Phase, TaskType};
use crate::ids::{AgentId, CharacterId, JobId};

/// One memory search hit as attached to `GameState` (spec.md §4.7 `search`).
///
/// A projection of the memory client's query result, not the underlying
/// `MemoryEdge` itself: `lf-types` cannot depend on `lf-memory`, so the
/// phase state machine converts `lf_memory::MemoryQueryResult` into this
/// shape when populating `retrieved_memories`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedMemory {
    /// The edge's identifier (the corrupted variant's, if one was returned).
    pub uuid: Uuid,
    /// The fact text as the agent should see it: corrupted if corruption fired.
    pub fact: String,
    /// Whether this result is a corrupted variant.
    pub corrupted: bool,
    /// The provenance/retention class of the underlying edge.
    pub memory_type: MemoryType,
    /// Confidence score in [0,1].
    pub confidence: f64,
    /// Importance score in [0,1].
    pub importance: f64,
}

/// One round's clarifying question and, once answered, the GM's reply
/// (spec.md §4.1 phases 3-5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClarificationQa {
    /// A stable identifier for this question, referenced by the GM's `answer` command.
    pub question_id: String,
    /// The asking agent.
    pub agent_id: AgentId,
    /// The question text.
    pub question: String,
    /// The GM's answer, once given.
    pub answer: Option<String>,
}

/// A character action as produced by the `character_action` phase
/// (spec.md §3, §4.1 phase 9).
///
/// Describes intent only; it must never assert an outcome -- that is what
/// `lf-validation` enforces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterActionDraft {
    /// The action text as produced (and possibly auto-corrected).
    pub text: String,
    /// Which dice success rule applies.
    pub task_type: TaskType,
    /// Whether the character is mechanically prepared for this task.
    pub is_prepared: bool,
    /// Whether the character is an expert at this task.
    pub is_expert: bool,
    /// Whether this action helps another character's main action.
    pub is_helping: bool,
    /// The character being helped, required when `is_helping` is true.
    pub helping_character_id: Option<CharacterId>,
    /// Free-text justification supplied by the acting agent.
    pub justification: String,
}

/// The validation engine's verdict for one character's action
/// (spec.md §4.5, §9: a sealed variant, not a bag of booleans).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ValidationResult {
    /// The action passed the pattern and semantic checks unchanged.
    Valid,
    /// The action failed and should be retried with a stricter prompt.
    Retry {
        /// The detected rule violations.
        violations: Vec<String>,
    },
    /// After the retry budget, the engine auto-corrected the text.
    AutoFixed {
        /// The violations that triggered the correction.
        violations: Vec<String>,
        /// The text after stripping forbidden tokens.
        fixed_text: String,
    },
    /// Auto-correction produced incoherent text; surfaced to GM adjudication.
    Flagged {
        /// The violations that triggered the flag.
        violations: Vec<String>,
        /// The last candidate text, preserved for the GM to see.
        last_candidate: String,
    },
}

impl ValidationResult {
    /// Whether this verdict allows the phase to proceed without another
    /// `character_action` retry.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Retry { .. })
    }
}

/// The full mutable turn record (spec.md §3 `GameState`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// The campaign session this turn belongs to.
    pub session_number: u32,
    /// The turn number within the session.
    pub turn_number: u32,
    /// The phase currently executing or parked at.
    pub current_phase: Phase,
    /// Wall-clock time the current phase began.
    pub phase_start_time: DateTime<Utc>,
    /// Agents participating this turn, in stable tie-break order.
    pub active_agents: Vec<AgentId>,
    /// The GM's narration for this turn.
    pub dm_narration: Option<String>,
    /// Memory search results retrieved for each agent.
    pub retrieved_memories: BTreeMap<AgentId, Vec<RetrievedMemory>>,
    /// The current clarification round, starting at 0.
    pub clarification_round: u32,
    /// All clarification Q&A pairs asked so far this turn.
    pub clarifications: Vec<ClarificationQa>,
    /// Each agent's out-of-character strategic intent.
    pub strategic_intents: BTreeMap<AgentId, String>,
    /// OOC messages published so far this turn.
    pub ooc_message_ids: Vec<crate::ids::MessageId>,
    /// Each character's current action draft.
    pub character_actions: BTreeMap<CharacterId, CharacterActionDraft>,
    /// Number of validation attempts made so far, per character.
    pub validation_attempts: BTreeMap<CharacterId, u32>,
    /// The latest validation verdict, per character.
    pub validation_results: BTreeMap<CharacterId, ValidationResult>,
    /// Each character's in-character reaction to the outcome.
    pub character_reactions: BTreeMap<CharacterId, String>,
    /// The main actor's resolved dice pool, once rolled.
    pub dice_result: Option<DiceResult>,
    /// The auto-generated LASER FEELINGS question, if one was triggered.
    pub gm_question: Option<String>,
    /// The GM's answer to `gm_question`.
    pub laser_feelings_answer: Option<String>,
    /// The GM's outcome narration, set at `dm_outcome`.
    pub outcome_narration: Option<String>,
    /// The tier the GM hinted when narrating the outcome, distinct from
    /// the dice-derived [`crate::enums::Outcome`] the machine computed.
    pub outcome_hint: Option<Outcome>,
    /// A pending dice-spec override from `dm_adjudication`'s `override`
    /// command, applied in place of the computed roll at `dice_resolution`.
    pub gm_override: Option<String>,
    /// Number of helpers who rolled at least one success, per main actor.
    pub successful_helper_counts: BTreeMap<CharacterId, u32>,
    /// Number of phase-level retries performed after a recoverable error.
    pub retry_count: u32,
    /// The most recent phase that was fully persisted.
    pub last_stable_phase: Phase,
    /// Worker job IDs dispatched during the current fan-out phase.
    pub llm_job_ids: Vec<JobId>,
    /// Set when rollback has been exhausted and the session needs operator attention.
    pub requires_dm_intervention: bool,
}

impl GameState {
    /// Create a fresh `GameState` for the start of a session's first turn.
    #[must_use]
    pub fn new(session_number: u32, active_agents: Vec<AgentId>, now: DateTime<Utc>) -> Self {
        Self {
            session_number,
            turn_number: 1,
            current_phase: Phase::DmNarration,
            phase_start_time: now,
            active_agents,
            dm_narration: None,
            retrieved_memories: BTreeMap::new(),
            clarification_round: 0,
            clarifications: Vec::new(),
            strategic_intents: BTreeMap::new(),
            ooc_message_ids: Vec::new(),
            character_actions: BTreeMap::new(),
            validation_attempts: BTreeMap::new(),
            validation_results: BTreeMap::new(),
            character_reactions: BTreeMap::new(),
            dice_result: None,
            gm_question: None,
            laser_feelings_answer: None,
            outcome_narration: None,
            outcome_hint: None,
            gm_override: None,
            successful_helper_counts: BTreeMap::new(),
            retry_count: 0,
            last_stable_phase: Phase::DmNarration,
            llm_job_ids: Vec::new(),
            requires_dm_intervention: false,
        }
    }

    /// Questions asked this round that have not yet been answered.
    #[must_use]
    pub fn unanswered_clarifications(&self) -> Vec<&ClarificationQa> {
        self.clarifications
            .iter()
            .filter(|qa| qa.answer.is_none())
            .collect()
    }

    /// Build the state the next turn starts from: same session and active
    /// roster, `turn_number` incremented, every other per-turn field reset
    /// (spec.md §4.1: each turn's phases start clean at `dm_narration`).
    #[must_use]
    pub fn next_turn(&self, now: DateTime<Utc>) -> Self {
        let mut next = Self::new(self.session_number, self.active_agents.clone(), now);
        next.turn_number = self.turn_number.saturating_add(1);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_game_state_starts_at_dm_narration() {
        let state = GameState::new(1, vec![], Utc::now());
        assert_eq!(state.current_phase, Phase::DmNarration);
        assert_eq!(state.last_stable_phase, Phase::DmNarration);
        assert_eq!(state.turn_number, 1);
        assert!(!state.requires_dm_intervention);
    }

    #[test]
    fn unanswered_clarifications_filters_answered() {
        let mut state = GameState::new(1, vec![], Utc::now());
        state.clarifications.push(ClarificationQa {
            question_id: "q1".to_string(),
            agent_id: AgentId::new("agent_alex").expect("valid"),
            question: "Are there guards?".to_string(),
            answer: Some("Two.".to_string()),
        });
        state.clarifications.push(ClarificationQa {
            question_id: "q2".to_string(),
            agent_id: AgentId::new("agent_alex").expect("valid"),
            question: "How far?".to_string(),
            answer: None,
        });
        assert_eq!(state.unanswered_clarifications().len(), 1);
    }

    #[test]
    fn validation_retry_is_not_terminal() {
        let retry = ValidationResult::Retry {
            violations: vec!["outcome verb".to_string()],
        };
        assert!(!retry.is_terminal());
        assert!(ValidationResult::Valid.is_terminal());
    }

    #[test]
    fn next_turn_increments_turn_number_and_resets_phase_fields() {
        let agents = vec![AgentId::new("agent_alex").expect("valid")];
        let mut state = GameState::new(3, agents.clone(), Utc::now());
        state.turn_number = 5;
        state.dm_narration = Some("A console flickers.".to_string());
        state.clarification_round = 2;

        let next = state.next_turn(Utc::now());

        assert_eq!(next.session_number, 3);
        assert_eq!(next.turn_number, 6);
        assert_eq!(next.active_agents, agents);
        assert_eq!(next.current_phase, Phase::DmNarration);
        assert!(next.dm_narration.is_none());
        assert_eq!(next.clarification_round, 0);
    }
}
