//! Event-sourcing vocabulary for the turn orchestration core.
//!
//! Every phase transition, message publish, dice roll, and memory write is
//! recorded as an immutable [`Event`]. This crate defines only the
//! vocabulary and the append-only store trait; `lf-db` implements the
//! trait against Postgres, and `lf-gm-adapter` replays the tail of a
//! session's event log onto its WebSocket feed.

use chrono::{DateTime, Utc};
use lf_types::{AgentId, CharacterId, JobId, Outcome, Phase, TaskKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One recorded occurrence in a session's history.
///
/// Events are additive only -- nothing in this crate ever mutates or removes
/// a previously appended event. Replaying a session's events in order
/// reconstructs everything observable about its `GameState` history short
/// of the full snapshot payload, which `lf-db`'s checkpoint store carries
/// separately for fast resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// A turn's phase advanced from one value to another.
    PhaseTransitioned {
        /// The phase the turn was in before this event.
        from: Phase,
        /// The phase the turn is in after this event.
        to: Phase,
        /// The turn this transition occurred within.
        turn_number: u32,
    },
    /// The state machine parked at an interrupt point awaiting the GM.
    InterruptParked {
        /// The phase the machine parked at.
        phase: Phase,
    },
    /// The GM resumed a parked session with a command payload.
    InterruptResumed {
        /// The phase the machine resumed from.
        phase: Phase,
    },
    /// A checkpoint was committed for `(session_id, phase_index)`.
    CheckpointCommitted {
        /// Position of the committed checkpoint within the turn's phase sequence.
        phase_index: u32,
        /// Monotonically increasing version for this checkpoint slot.
        version: u64,
    },
    /// A phase failed and the machine restored the last stable checkpoint.
    PhaseRolledBack {
        /// The phase that failed.
        failed_phase: Phase,
        /// The phase state was restored to.
        restored_phase: Phase,
        /// The running retry count after this rollback.
        retry_count: u32,
    },
    /// Rollback was exhausted and the session now needs operator attention.
    DmInterventionRequired {
        /// The phase the session is parked at.
        phase: Phase,
        /// A short diagnostic summary for the GM adapter to surface.
        diagnostic: String,
    },
    /// A message was published to a channel.
    MessagePublished {
        /// The published message's identifier.
        message_id: Uuid,
        /// The channel it was published to, as its serde tag.
        channel: String,
    },
    /// A worker job was enqueued.
    JobEnqueued {
        /// The job's identifier.
        job_id: JobId,
        /// The kind of work the job performs.
        task_kind: TaskKind,
    },
    /// A worker job finished, successfully or not.
    JobCompleted {
        /// The job's identifier.
        job_id: JobId,
        /// Whether the job succeeded.
        succeeded: bool,
    },
    /// The dice engine resolved a roll.
    DiceRolled {
        /// The acting character.
        character_id: CharacterId,
        /// Total dice rolled.
        dice_count: u8,
        /// The resolved outcome tier.
        outcome: Outcome,
        /// Whether a LASER FEELINGS die was rolled.
        laser_feelings: bool,
    },
    /// A memory edge was written.
    MemoryWritten {
        /// The written edge's identifier.
        edge_uuid: Uuid,
        /// Whether the written edge is a corrupted variant.
        corrupted: bool,
    },
    /// A consensus round completed.
    ConsensusResolved {
        /// The round number.
        round: u32,
        /// The resolved aggregate, as its serde tag.
        aggregate: String,
    },
}

impl Event {
    /// The agent this event is most relevant to, if any.
    ///
    /// Used by `lf-gm-adapter` to filter the live feed to a single agent's
    /// activity on request; most event kinds are session-wide and return
    /// `None`.
    #[must_use]
    pub const fn subject_agent(&self) -> Option<&AgentId> {
        None
    }
}

/// An append-only, ordered store of a session's events.
///
/// Implemented against Postgres by `lf-db::event_store`.
pub trait EventStore: Send + Sync {
    /// The error type returned by this store's operations.
    type Error;

    /// Append one event to the given session's log, in emission order.
    fn append(
        &self,
        session_id: Uuid,
        event: Event,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), Self::Error>;

    /// Fetch a session's full event log in publish order.
    fn replay(&self, session_id: Uuid) -> Result<Vec<(DateTime<Utc>, Event)>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_transitioned_roundtrips_serde() {
        let event = Event::PhaseTransitioned {
            from: Phase::DmNarration,
            to: Phase::MemoryRetrieval,
            turn_number: 1,
        };
        let json = serde_json::to_string(&event).expect("serialize");
        let restored: Event = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(event, restored);
    }

    #[test]
    fn dice_rolled_carries_outcome() {
        let event = Event::DiceRolled {
            character_id: CharacterId::new("char_zara_7").expect("valid"),
            dice_count: 1,
            outcome: Outcome::Partial,
            laser_feelings: false,
        };
        match event {
            Event::DiceRolled { outcome, .. } => assert_eq!(outcome, Outcome::Partial),
            _ => panic!("wrong variant"),
        }
    }
}
