//! Closed-set enumerations used throughout the data model.
//!
//! Per spec.md §9, dynamic/duck typing is replaced with explicit sealed
//! variants: every place the original design would reach for a string tag
//! gets an enum here instead, and cross-variant dispatch uses pattern
//! matching rather than string comparisons.

use serde::{Deserialize, Serialize};

/// The three message channels and their visibility rules (spec.md §3, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// In-character: full body visible to characters, summary-only to players.
    Ic,
    /// Out-of-character: visible to all players, never to characters.
    Ooc,
    /// Player-to-character: one directed message, visible only to the addressee.
    P2c,
}

/// A character action's declared task type, determining the dice success rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Logic/tech-flavored task: succeeds on a roll strictly below the number.
    Lasers,
    /// Intuition/social-flavored task: succeeds on a roll strictly above the number.
    Feelings,
}

/// One of seven character archetypes (spec.md §3 `CharacterSheet.style`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    /// Alien.
    Alien,
    /// Android.
    Android,
    /// Dangerous.
    Dangerous,
    /// Hotshot.
    Hotshot,
    /// Intrepid.
    Intrepid,
    /// Savvy.
    Savvy,
    /// Seasoned.
    Seasoned,
}

/// One of seven crew roles (spec.md §3 `CharacterSheet.role`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Captain.
    Captain,
    /// Doctor.
    Doctor,
    /// Envoy.
    Envoy,
    /// Engineer.
    Engineer,
    /// Explorer.
    Explorer,
    /// Gunner.
    Gunner,
    /// Pilot.
    Pilot,
}

/// One of the seven closed ship strengths (spec.md §3 `ShipConfig`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipStrength {
    /// Faster-than-light capable.
    FasterThanLight,
    /// Heavily armed.
    HeavilyArmed,
    /// Well armored.
    WellArmored,
    /// Advanced sensors.
    AdvancedSensors,
    /// Superior stealth.
    SuperiorStealth,
    /// Elegant design.
    ElegantDesign,
    /// Cheap to maintain.
    CheapToMaintain,
}

/// One of the four closed ship problems (spec.md §3 `ShipConfig`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipProblem {
    /// Fuel hungry.
    FuelHungry,
    /// Easily detected.
    EasilyDetected,
    /// Structurally unsound.
    StructurallyUnsound,
    /// Difficult to control.
    DifficultToControl,
}

/// The provenance/retention class of a memory edge (spec.md §3 `MemoryEdge.memory_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// A recollection of a specific event.
    Episodic,
    /// A general fact or belief.
    Semantic,
    /// Knowledge of how to do something.
    Procedural,
}

/// Which layer may read a memory edge (spec.md §3 `MemoryEdge.knowledge_layer`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeLayer {
    /// Excluded from character-layer reads.
    PlayerOnly,
    /// Excluded from player-layer reads.
    CharacterOnly,
    /// Visible to both layers. Default.
    #[default]
    Both,
}

/// The kind of degradation applied to a corrupted memory edge (spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptionType {
    /// A small numeric, name, or color drift.
    DetailDrift,
    /// Mood recolors emotionally-laden content.
    EmotionalColoring,
    /// Elements of two distinct events blend together.
    Conflation,
    /// Nuance is lost; the fact becomes blunter.
    Simplification,
    /// A specific, unsupported detail is added with misplaced confidence.
    FalseConfidence,
}

/// Dice outcome tier, a pure function of total successes (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Zero successes.
    Failure,
    /// One success.
    Partial,
    /// Two successes.
    Success,
    /// Three or more successes.
    Critical,
}

impl Outcome {
    /// Derive the outcome tier from a total-successes count (spec.md §4.6).
    #[must_use]
    pub const fn from_total_successes(total: u8) -> Self {
        match total {
            0 => Self::Failure,
            1 => Self::Partial,
            2 => Self::Success,
            _ => Self::Critical,
        }
    }
}

/// An active agent's current stance in a consensus round (spec.md §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    /// Agrees with the proposed direction.
    Agree,
    /// Disagrees with the proposed direction.
    Disagree,
    /// Has expressed a view that is neither agreement nor disagreement.
    Neutral,
    /// Has not spoken this round.
    Silent,
}

/// The roll-up of all active agents' stances (spec.md §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusAggregate {
    /// All active agents agree.
    Unanimous,
    /// More than half agree and nobody disagrees.
    Majority,
    /// Active disagreement, or no majority and no timeout yet.
    Conflicted,
    /// The round or wall-clock budget elapsed without resolution.
    Timeout,
}

/// The ordered phase sequence of one turn (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// 1. GM interrupt; accepts narration text.
    DmNarration,
    /// 2. Per-agent memory queries; attaches results to state.
    MemoryRetrieval,
    /// 3. Each player decides whether to ask a clarifying question.
    DmClarificationCollect,
    /// 4. GM interrupt if any questions exist; collects answers.
    DmClarificationWait,
    /// 6. Re-query memories with narration + clarifications.
    SecondMemoryRetrieval,
    /// 7. Per-agent LLM call produces an out-of-character intent.
    StrategicIntent,
    /// 8. Each player emits one P2C message to its character.
    P2cDirective,
    /// 9. Per-character LLM call produces a structured action.
    CharacterAction,
    /// 10. Action validator runs.
    Validation,
    /// 12. GM interrupt; GM may accept, override, or flag.
    DmAdjudication,
    /// 13. Roll helper pre-rolls; count successes per main actor.
    ResolveHelpers,
    /// 14. Compute and roll the main dice pool.
    DiceResolution,
    /// 16. GM interrupt; GM answers the LASER FEELINGS question.
    LaserFeelingsQuestion,
    /// 17. GM interrupt; GM narrates the outcome.
    DmOutcome,
    /// 18. Per-character LLM call produces an in-character reaction.
    CharacterReaction,
    /// 19. Writes episode(s) to memory for all agents and the campaign.
    MemoryConsolidation,
}

impl Phase {
    /// Whether this phase is one of the four GM interrupt points (spec.md §4.1).
    #[must_use]
    pub const fn is_interrupt_point(self) -> bool {
        matches!(
            self,
            Self::DmClarificationWait
                | Self::DmAdjudication
                | Self::LaserFeelingsQuestion
                | Self::DmOutcome
        )
    }

    /// The phase that linearly follows this one, ignoring branches.
    ///
    /// Branch targets (clarification loop, LASER FEELINGS skip, validation
    /// retry) are decided by the state machine in `lf-core`, not here.
    #[must_use]
    pub const fn next_linear(self) -> Option<Self> {
        match self {
            Self::DmNarration => Some(Self::MemoryRetrieval),
            Self::MemoryRetrieval => Some(Self::DmClarificationCollect),
            Self::DmClarificationCollect => Some(Self::DmClarificationWait),
            Self::DmClarificationWait => Some(Self::SecondMemoryRetrieval),
            Self::SecondMemoryRetrieval => Some(Self::StrategicIntent),
            Self::StrategicIntent => Some(Self::P2cDirective),
            Self::P2cDirective => Some(Self::CharacterAction),
            Self::CharacterAction => Some(Self::Validation),
            Self::Validation => Some(Self::DmAdjudication),
            Self::DmAdjudication => Some(Self::ResolveHelpers),
            Self::ResolveHelpers => Some(Self::DiceResolution),
            Self::DiceResolution => Some(Self::DmOutcome),
            Self::LaserFeelingsQuestion => Some(Self::DmOutcome),
            Self::DmOutcome => Some(Self::CharacterReaction),
            Self::CharacterReaction => Some(Self::MemoryConsolidation),
            Self::MemoryConsolidation => None,
        }
    }
}

/// The kind of work a worker-pool job performs (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Strategic intent from a player agent.
    PlayerIntent,
    /// Whether a player wants to ask a clarifying question this round.
    PlayerClarifyDecision,
    /// A player's P2C directive to its character.
    PlayerP2cDirective,
    /// A structured character action.
    CharacterAction,
    /// An in-character reaction to the outcome.
    CharacterReaction,
    /// The validation engine's semantic false-positive check.
    ValidationSemantic,
    /// Rendering a corrupted memory fact.
    MemoryCorruptionRender,
    /// Extracting an agent's stance from OOC chat.
    StanceExtraction,
}

/// The lifecycle status of a worker-pool job (spec.md §6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Enqueued, not yet claimed by a worker.
    Queued,
    /// Claimed by a worker and in progress.
    Started,
    /// Completed successfully.
    Finished,
    /// Exhausted retries or encountered a non-transient error.
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_from_successes_matches_spec_table() {
        assert_eq!(Outcome::from_total_successes(0), Outcome::Failure);
        assert_eq!(Outcome::from_total_successes(1), Outcome::Partial);
        assert_eq!(Outcome::from_total_successes(2), Outcome::Success);
        assert_eq!(Outcome::from_total_successes(3), Outcome::Critical);
        assert_eq!(Outcome::from_total_successes(6), Outcome::Critical);
    }

    #[test]
    fn interrupt_points_are_exactly_four() {
        let phases = [
            Phase::DmNarration,
            Phase::MemoryRetrieval,
            Phase::DmClarificationCollect,
            Phase::DmClarificationWait,
            Phase::SecondMemoryRetrieval,
            Phase::StrategicIntent,
            Phase::P2cDirective,
            Phase::CharacterAction,
            Phase::Validation,
            Phase::DmAdjudication,
            Phase::ResolveHelpers,
            Phase::DiceResolution,
            Phase::LaserFeelingsQuestion,
            Phase::DmOutcome,
            Phase::CharacterReaction,
            Phase::MemoryConsolidation,
        ];
        let count = phases.iter().filter(|p| p.is_interrupt_point()).count();
        assert_eq!(count, 4);
    }

    #[test]
    fn knowledge_layer_defaults_to_both() {
        assert_eq!(KnowledgeLayer::default(), KnowledgeLayer::Both);
    }
}
