//! Errors raised by the dice engine.

use thiserror::Error;

/// Failure modes for dice pool assembly, rolling, and GM override parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiceError {
    /// A character's `number` fell outside the valid 2-5 range.
    #[error("character number {0} is out of the valid 2-5 range")]
    InvalidCharacterNumber(u8),

    /// The GM's override notation (spec.md §6.2) did not parse.
    #[error("invalid dice override notation {0:?}")]
    InvalidOverrideNotation(String),

    /// An explicit override value list contained a die value outside 1-6.
    #[error("override die value {0} is out of the valid 1-6 range")]
    InvalidDieValue(u8),

    /// An override's dice count fell outside the notation's 1-6 range.
    #[error("override dice count {0} is out of the valid 1-6 range")]
    InvalidDiceCount(u8),
}
