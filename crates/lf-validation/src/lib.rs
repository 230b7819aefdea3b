//! Narrative-overreach validation engine (spec.md §4.5, §4.6).
//!
//! Character actions describe intent, never outcome -- the dice and the GM
//! decide what actually happens. This crate is the gate that enforces that
//! boundary: a fast deterministic pattern scan ([`patterns::scan`]) feeds a
//! pluggable semantic suppression step ([`engine::SemanticChecker`]) before
//! [`engine::validate`] decides whether an action passes, needs a retry, or
//! (past the retry budget) gets mechanically auto-corrected.
//!
//! Deliberately does not consult [`lf_types::PlayerPersonality`] anywhere in
//! this crate (spec.md §9 design note): whether an action overreaches is a
//! property of the text, not of who wrote it.

pub mod auto_correct;
pub mod engine;
pub mod patterns;

pub use auto_correct::strip_findings;
pub use engine::{validate, NoSuppression, SemanticChecker, MAX_RETRY_ATTEMPTS};
pub use patterns::{scan, Finding, OverreachCategory};
