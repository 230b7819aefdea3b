//! Temporal memory client with read-time corruption (spec.md §4.7).
//!
//! Facts live in a bitemporal knowledge graph scoped by [`lf_types::GroupKey`].
//! [`client::MemoryClient`] is the sole entry point: it enforces scope on
//! writes, applies the temporal and `knowledge_layer` filters on reads, and
//! probabilistically corrupts what a read returns based on the reading
//! agent's [`lf_types::PlayerPersonality`] -- never the pristine edge
//! itself, always a new superseding one.
//!
//! Deliberately does not consult personality in any of `lf-dice` or
//! `lf-validation`'s sense (spec.md §9): here personality governs memory
//! fidelity, which is the one place the spec asks for it.

pub mod client;
pub mod corruption;
pub mod error;
pub mod renderer;
pub mod store;

pub use client::{MemoryClient, MemoryQueryResult, ReaderLayer, SearchParams};
pub use corruption::{corruption_probability, select_corruption_type, should_corrupt};
pub use error::MemoryError;
pub use renderer::{CorruptionRenderer, IdentityRenderer};
pub use store::{InMemoryMemoryStorage, MemoryStorage};
