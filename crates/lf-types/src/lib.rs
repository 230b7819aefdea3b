//! Shared type definitions for the Laser Feelings turn orchestration core.
//!
//! This crate is the single source of truth for the data model described in
//! spec.md §3: identifiers, personality and character entities, messages,
//! memory edges, consensus state, dice results, and the per-turn
//! `GameState` record. Every other crate in the workspace depends on this
//! one and none of its types carry behavior beyond construction-time
//! validation.
//!
//! # Modules
//!
//! - [`ids`] -- UUID-based internal identifiers and validated string IDs for
//!   agents/characters
//! - [`error`] -- the shared `TypesError` returned by this crate's fallible
//!   constructors
//! - [`enums`] -- closed-set enumerations (channels, phases, task kinds, ...)
//! - [`personality`] -- `PlayerPersonality`
//! - [`character`] -- `CharacterSheet`, `ShipConfig`
//! - [`message`] -- `Message`, `Sender`, `IcSummary`
//! - [`memory_edge`] -- `MemoryEdge`, `GroupKey`
//! - [`consensus`] -- `ConsensusState`, `StanceVote`
//! - [`dice`] -- `DiceResult`
//! - [`game_state`] -- `GameState` and its substructures

pub mod character;
pub mod consensus;
pub mod dice;
pub mod enums;
pub mod error;
pub mod game_state;
pub mod ids;
pub mod memory_edge;
pub mod message;
pub mod personality;

pub use character::{CharacterSheet, ShipConfig};
pub use consensus::{ConsensusState, StanceVote};
pub use dice::DiceResult;
pub use enums::{
    Channel, ConsensusAggregate, CorruptionType, JobStatus, KnowledgeLayer, MemoryType, Outcome,
    Phase, Role, ShipProblem, ShipStrength, Stance, Style, TaskKind, TaskType,
};
pub use error::TypesError;
pub use game_state::{
    CharacterActionDraft, ClarificationQa, GameState, RetrievedMemory, ValidationResult,
};
pub use ids::{AgentId, CharacterId, CheckpointId, JobId, MemoryEdgeId, MessageId};
pub use memory_edge::{GroupKey, MemoryEdge};
pub use message::{IcSummary, Message, Recipient, Sender};
pub use personality::PlayerPersonality;
