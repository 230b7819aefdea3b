//! Temporal memory edges and their scoping (spec.md §3 `MemoryEdge`).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::{CorruptionType, KnowledgeLayer, MemoryType};
use crate::error::TypesError;
use crate::ids::{AgentId, CharacterId};

/// The scope a memory edge or write belongs to (spec.md §3, §4.7).
///
/// Writes addressed to a scope other than the caller's own are rejected by
/// `lf-memory`; this type exists so that check is a match, not a string
/// comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    /// Personal memory for one player's agent.
    Agent(AgentId),
    /// Personal memory for one roleplay character.
    Character(CharacterId),
    /// Party-shared campaign memory.
    CampaignMain,
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // AgentId already carries the `agent_` prefix (spec.md §3).
            Self::Agent(id) => write!(f, "{id}"),
            // CharacterId carries `char_`; the group key namespace is
            // `character_<suffix>` per spec.md's glossary.
            Self::Character(id) => {
                let suffix = id.as_str().strip_prefix("char_").unwrap_or(id.as_str());
                write!(f, "character_{suffix}")
            }
            Self::CampaignMain => write!(f, "campaign_main"),
        }
    }
}

/// A single fact in the temporal knowledge graph (spec.md §3, §4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEdge {
    /// Unique identifier.
    pub uuid: Uuid,
    /// The recorded fact text. Pristine edges hold the true fact; corrupted
    /// edges hold the degraded variant.
    pub fact: String,
    /// In-game time this edge became valid.
    pub valid_at: f64,
    /// In-game time this edge was superseded, if any.
    pub invalid_at: Option<f64>,
    /// The episode(s) this edge derives from.
    pub episode_ids: Vec<Uuid>,
    /// Source node of the underlying graph relationship.
    pub source_node: Uuid,
    /// Target node of the underlying graph relationship.
    pub target_node: Uuid,
    /// The scope this edge is stored and retrieved under.
    pub group_key: GroupKey,
    /// Episodic, semantic, or procedural.
    pub memory_type: MemoryType,
    /// The session this edge was formed during.
    pub session_number: u32,
    /// In-game days elapsed when this edge was formed.
    pub days_elapsed: f64,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Importance in `[0, 1]`; higher importance resists corruption.
    pub importance: f64,
    /// Number of times this edge has been returned by a read, incremented on
    /// each successful retrieval.
    pub rehearsal_count: u32,
    /// Set only on a corrupted edge; names the applied degradation.
    pub corruption_type: Option<CorruptionType>,
    /// Back-reference to the pristine predecessor, set only on a corrupted edge.
    pub original_uuid: Option<Uuid>,
    /// Which layer(s) may read this edge.
    pub knowledge_layer: KnowledgeLayer,
}

impl MemoryEdge {
    /// Validate the temporal ordering invariant: if `invalid_at` is set, it
    /// must be strictly after `valid_at`.
    pub fn validate(&self) -> Result<(), TypesError> {
        if let Some(invalid_at) = self.invalid_at
            && invalid_at <= self.valid_at
        {
            return Err(TypesError::TemporalInvariant(format!(
                "invalid_at ({invalid_at}) must be > valid_at ({})",
                self.valid_at
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(TypesError::OutOfRange {
                field: "confidence",
                value: self.confidence,
                min: 0.0,
                max: 1.0,
            });
        }
        if !(0.0..=1.0).contains(&self.importance) {
            return Err(TypesError::OutOfRange {
                field: "importance",
                value: self.importance,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(())
    }

    /// Whether this edge is a corrupted variant of another.
    #[must_use]
    pub const fn is_corrupted(&self) -> bool {
        self.original_uuid.is_some()
    }

    /// Whether this edge is superseded as of `as_of`.
    #[must_use]
    pub fn is_superseded_at(&self, as_of: f64) -> bool {
        self.invalid_at.is_some_and(|invalid_at| invalid_at <= as_of)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_edge() -> MemoryEdge {
        MemoryEdge {
            uuid: Uuid::now_v7(),
            fact: "Merchant offered 50 gold.".to_string(),
            valid_at: 10.0,
            invalid_at: None,
            episode_ids: vec![],
            source_node: Uuid::now_v7(),
            target_node: Uuid::now_v7(),
            group_key: GroupKey::Agent(AgentId::new("agent_alex").expect("valid")),
            memory_type: MemoryType::Episodic,
            session_number: 1,
            days_elapsed: 10.0,
            confidence: 0.9,
            importance: 0.5,
            rehearsal_count: 0,
            corruption_type: None,
            original_uuid: None,
            knowledge_layer: KnowledgeLayer::Both,
        }
    }

    #[test]
    fn invalid_at_before_valid_at_is_rejected() {
        let mut edge = base_edge();
        edge.invalid_at = Some(5.0);
        assert!(edge.validate().is_err());
    }

    #[test]
    fn invalid_at_equal_to_valid_at_is_rejected() {
        let mut edge = base_edge();
        edge.invalid_at = Some(10.0);
        assert!(edge.validate().is_err());
    }

    #[test]
    fn invalid_at_after_valid_at_is_accepted() {
        let mut edge = base_edge();
        edge.invalid_at = Some(11.0);
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn group_key_display_matches_spec_prefixes() {
        assert_eq!(GroupKey::CampaignMain.to_string(), "campaign_main");
        let agent = GroupKey::Agent(AgentId::new("agent_alex").expect("valid"));
        assert_eq!(agent.to_string(), "agent_alex");
        let character = GroupKey::Character(CharacterId::new("char_zara_7").expect("valid"));
        assert_eq!(character.to_string(), "character_zara_7");
    }
}
