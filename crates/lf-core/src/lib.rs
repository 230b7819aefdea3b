//! The phase state machine that drives one turn of play (spec.md §4.1).
//!
//! [`machine::TurnMachine`] owns the turn cycle end to end: it reads the GM's
//! narration, fans work out to the worker pool and message router, rolls
//! dice, and checkpoints after every phase so a crash resumes exactly where
//! it left off. Every external dependency -- checkpoint storage, worker
//! dispatch, the message router, the memory client, and GM interrupts -- is
//! a port this crate defines and an adapter crate (`lf-db`, `lf-worker`,
//! `lf-gm-adapter`) implements, so the machine itself is testable against
//! in-memory fakes alone.
//!
//! # Modules
//!
//! - [`machine`] -- [`machine::TurnMachine`], the 19-phase driver loop.
//! - [`phases`] -- pure `GameState` helpers the machine's phase methods share.
//! - [`checkpoint`] -- the checkpoint storage port (spec.md §6.3).
//! - [`worker_dispatch`] -- the worker-pool dispatch port (spec.md §4.4).
//! - [`jobs`] -- typed request/response payloads for each worker job kind.
//! - [`gm_command`] -- GM command parsing and phase admissibility (spec.md §6.1).
//! - [`session_control`] -- shared park/resume/abort state for GM interrupts.
//! - [`config`] -- session configuration (spec.md §6.4).
//! - [`error`] -- the machine's error taxonomy (spec.md §7).

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod gm_command;
pub mod jobs;
pub mod machine;
pub mod phases;
pub mod session_control;
pub mod worker_dispatch;
