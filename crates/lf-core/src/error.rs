//! The phase machine's error taxonomy (spec.md §7).
//!
//! Every fallible operation in [`crate::machine`] resolves to one of these
//! variants. The taxonomy matters because recovery differs by kind:
//! `Transient` failures are retried once against the last stable checkpoint,
//! `Validation` failures are the validator's own business and never trigger
//! rollback, and `Permission` is never recovered automatically.

use thiserror::Error;

use lf_types::Phase;

/// A failure surfaced by the phase state machine.
#[derive(Debug, Error)]
pub enum PhaseError {
    /// A worker job, store call, or other I/O-bound step failed in a way
    /// that is expected to succeed on retry (spec.md §7 `Transient`).
    #[error("transient failure in phase {phase:?}: {message}")]
    Transient {
        /// The phase that was executing when the failure occurred.
        phase: Phase,
        /// A short diagnostic.
        message: String,
    },

    /// The validation engine could not be satisfied within its retry budget
    /// (spec.md §7 `Validation` -- distinct from `Transient`: this is not
    /// retried by rolling back, the engine's own auto-correct/flag path
    /// already ran).
    #[error("validation could not be resolved: {0}")]
    Validation(String),

    /// A phase's own logic failed after its one rollback-and-retry attempt
    /// was exhausted (spec.md §7 `PhaseFailure`).
    #[error("phase {phase:?} failed after rollback: {message}")]
    PhaseFailure {
        /// The phase that failed twice.
        phase: Phase,
        /// A short diagnostic.
        message: String,
    },

    /// A GM command was issued that is not admissible in the current phase,
    /// or addressed a channel/scope the caller does not own (spec.md §7
    /// `Permission`: never recovered automatically, always surfaced as-is).
    #[error("permission denied: {0}")]
    Permission(String),

    /// A configuration value was missing or out of its valid range
    /// (spec.md §7 `ConfigError`).
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// An invariant the machine relies on was violated in a way that no
    /// retry can fix (spec.md §7 `Fatal`): e.g. more than one character
    /// action drafted with `is_helping: false` in the same turn.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl PhaseError {
    /// Whether this error's own kind permits the rollback-and-retry-once
    /// recovery path (spec.md §7): only `Transient` and `PhaseFailure`'s
    /// first occurrence do. `Validation`, `Permission`, `ConfigError`, and
    /// `Fatal` always propagate immediately.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}
