//! Error type shared by the data-model constructors in this crate.

use thiserror::Error;

/// Errors raised while constructing or validating a type-model value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    /// A string-pattern identifier did not match its required prefix/shape.
    #[error("invalid id {value:?}: expected prefix {expected_prefix:?} followed by [a-z0-9_]+")]
    InvalidId {
        /// The raw value that failed validation.
        value: String,
        /// The prefix the value was required to start with.
        expected_prefix: String,
    },

    /// A value outside its required range (used for trait scores, probabilities).
    #[error("value {value} out of range [{min}, {max}] for {field}")]
    OutOfRange {
        /// Field name for diagnostics.
        field: &'static str,
        /// Offending value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },

    /// A required non-empty field was empty.
    #[error("field {field} must not be empty")]
    Empty {
        /// Field name for diagnostics.
        field: &'static str,
    },

    /// A closed-set field held a value outside the set.
    #[error("invalid {field} value: {value:?}")]
    InvalidChoice {
        /// Field name for diagnostics.
        field: &'static str,
        /// Offending value.
        value: String,
    },

    /// A collection field had the wrong cardinality.
    #[error("{field} must have exactly {expected} entries, got {actual}")]
    WrongCardinality {
        /// Field name for diagnostics.
        field: &'static str,
        /// Required count.
        expected: usize,
        /// Actual count.
        actual: usize,
    },

    /// A temporal invariant was violated (e.g. `invalid_at <= valid_at`).
    #[error("temporal invariant violated: {0}")]
    TemporalInvariant(String),
}
