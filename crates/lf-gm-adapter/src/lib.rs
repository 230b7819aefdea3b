//! GM command boundary server for the turn orchestration core (spec.md §6.1).
//!
//! This crate provides an Axum HTTP + `WebSocket` server that exposes:
//!
//! - **REST endpoints** for listing running sessions, checking whether a
//!   session is parked at a GM interrupt point, and submitting a raw GM
//!   command line against one.
//! - **`WebSocket` endpoint** (`GET /ws/session/{id}`) streaming that
//!   session's phase-transition events as they are published by the turn
//!   machine.
//! - **Minimal HTML status page** (`GET /`) listing running sessions.
//!
//! # Architecture
//!
//! This crate implements only the boundary named in spec.md §6.1: it
//! parses and admits GM commands (via [`lf_core::gm_command`]) and hands
//! them to the matching session's [`lf_core::session_control::SessionControl`].
//! The actual GM-facing CLI/TUI front-end is an external collaborator
//! (spec.md §1) and is out of scope here. `lf-engine` registers each
//! session it starts with [`state::AppState`] and unregisters it when the
//! turn loop exits.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod startup;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{start_server, ServerConfig, ServerError};
pub use startup::spawn_gm_adapter;
pub use state::{AppState, SessionHandle};
