//! Multi-agent consensus detector (spec.md §4.8).
//!
//! Stance classification itself is an LLM call dispatched through
//! `lf-worker` (`TaskKind::StanceExtraction`); this crate is the pure
//! roll-up from already-classified per-agent stances to a
//! [`lf_types::ConsensusState`], including the timeout default-decision
//! tie-break.

pub mod aggregate;

pub use aggregate::{aggregate, default_decision};
