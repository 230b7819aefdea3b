//! Consensus state (spec.md §3, §4.8 `ConsensusState`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::{ConsensusAggregate, Stance};
use crate::ids::AgentId;

/// One agent's classified position in a consensus round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StanceVote {
    /// The classified stance.
    pub stance: Stance,
    /// Classifier confidence in `[0, 1]`.
    pub confidence: f64,
}

/// A derived, recomputed-per-round snapshot of where the table stands
/// (spec.md §3, §4.8).
///
/// This is state, not an owned entity: `lf-consensus` recomputes it fresh
/// each round rather than mutating a stored copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusState {
    /// Each active agent's current stance and confidence.
    pub stances: BTreeMap<AgentId, StanceVote>,
    /// The roll-up of `stances`.
    pub aggregate: ConsensusAggregate,
    /// The current OOC discussion round, starting at 1.
    pub round: u32,
    /// Wall-clock seconds elapsed since the round began.
    pub wall_time_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stance_vote_confidence_is_recorded() {
        let vote = StanceVote {
            stance: Stance::Agree,
            confidence: 0.9,
        };
        assert_eq!(vote.stance, Stance::Agree);
        assert!(vote.confidence > 0.5);
    }
}
