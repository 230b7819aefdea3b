//! Memory client error taxonomy (spec.md §7).

use lf_types::GroupKey;
use thiserror::Error;

/// Errors raised by the memory client (spec.md §4.7, §7).
#[derive(Debug, Error)]
pub enum MemoryError {
    /// A write targeted a `group_key` the caller is not scoped to.
    #[error("write to group_key {target} is out of scope for caller {caller}")]
    ScopeViolation {
        /// The scope the caller is permitted to write to.
        caller: GroupKey,
        /// The scope the write targeted.
        target: GroupKey,
    },

    /// The edge referenced by `invalidate` does not exist.
    #[error("no memory edge with uuid {0}")]
    NoSuchEdge(uuid::Uuid),

    /// An edge failed its temporal or range invariants.
    #[error("invalid memory edge: {0}")]
    InvalidEdge(#[from] lf_types::TypesError),

    /// The backing store failed independently of the edge's own validity.
    #[error("memory storage backend error: {0}")]
    Storage(String),
}
