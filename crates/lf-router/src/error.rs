//! Errors raised by the message router.

use thiserror::Error;

/// Failure modes for publish and fetch operations (spec.md §4.2, §7 `Permission`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// A P2C message did not address exactly one character.
    #[error("P2C messages must address exactly one character")]
    P2cRequiresSingleRecipient,

    /// A P2C message addressed a character not controlled by the sending agent.
    #[error("agent {agent} may not direct character {character}")]
    P2cWrongOwner {
        /// The sending agent.
        agent: String,
        /// The addressed character.
        character: String,
    },

    /// A cross-layer read was attempted (spec.md §7 `Permission`: never recovered).
    #[error("permission denied: {0}")]
    Permission(String),

    /// Duplicate publication of the same message was attempted (spec.md §4.3).
    #[error("message {0} was already published")]
    DuplicatePublication(String),

    /// The backing store failed.
    #[error("channel store failure: {0}")]
    Store(String),
}
