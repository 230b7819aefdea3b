//! Shared session control state for GM-interrupt parking and abort/end
//! signaling.
//!
//! Generalizes the pause/resume/stop pattern of a tick-loop operator to the
//! turn machine's four GM interrupt points (spec.md §4.1): instead of a
//! simple paused flag, the machine parks at a specific [`Phase`] and blocks
//! until the GM adapter delivers a [`GmCommand`] admissible there. Atomic
//! fields keep `is_parked`/`abort_requested` checks lock-free from the
//! adapter's hot path; the command handoff itself uses a [`Notify`] plus a
//! single-slot mailbox, since at most one GM command is ever in flight per
//! session.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, Notify};

use lf_types::Phase;

use crate::gm_command::GmCommand;

/// Shared control state for one running session.
///
/// Wrapped in `Arc` and shared between the turn machine task and the GM
/// adapter's HTTP/WebSocket handlers.
#[derive(Debug)]
pub struct SessionControl {
    /// Whether the machine is currently parked awaiting a GM command.
    parked: AtomicBool,
    /// The phase the machine is parked at, when `parked` is true.
    parked_at: Mutex<Option<Phase>>,
    /// Notified by [`Self::submit`] when a command has been placed in the mailbox.
    command_ready: Notify,
    /// Single-slot mailbox for the next GM command to apply.
    mailbox: Mutex<Option<GmCommand>>,
    /// Set by [`Self::request_abort`]; checked between phases.
    abort_requested: AtomicBool,
    /// Set by [`Self::request_end_session`]; checked between turns.
    end_requested: AtomicBool,
}

impl SessionControl {
    /// Construct fresh control state for a session that has not yet started.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parked: AtomicBool::new(false),
            parked_at: Mutex::new(None),
            command_ready: Notify::new(),
            mailbox: Mutex::new(None),
            abort_requested: AtomicBool::new(false),
            end_requested: AtomicBool::new(false),
        }
    }

    /// Whether the machine is currently parked at a GM interrupt point.
    #[must_use]
    pub fn is_parked(&self) -> bool {
        self.parked.load(Ordering::Acquire)
    }

    /// The phase the machine is parked at, if any.
    pub async fn parked_at(&self) -> Option<Phase> {
        *self.parked_at.lock().await
    }

    /// Mark the machine parked at `phase` (spec.md §4.1 interrupt points).
    pub async fn park(&self, phase: Phase) {
        *self.parked_at.lock().await = Some(phase);
        self.parked.store(true, Ordering::Release);
    }

    /// Submit a GM command for the parked machine to consume.
    ///
    /// Overwrites any command not yet claimed; the GM adapter is expected to
    /// serialize commands per session so this never races in practice.
    pub async fn submit(&self, command: GmCommand) {
        *self.mailbox.lock().await = Some(command);
        self.command_ready.notify_one();
    }

    /// Block until a GM command is available, then clear the parked flag and
    /// return it.
    ///
    /// The caller is responsible for re-parking (calling [`Self::park`]
    /// again) if the command it receives does not actually unpark the
    /// current phase (e.g. a clarification `answer` that still leaves other
    /// questions unanswered).
    pub async fn wait_for_command(&self) -> GmCommand {
        loop {
            if let Some(command) = self.mailbox.lock().await.take() {
                self.parked.store(false, Ordering::Release);
                *self.parked_at.lock().await = None;
                return command;
            }
            self.command_ready.notified().await;
        }
    }

    /// Request that the current turn abort as soon as the executing phase
    /// returns control (spec.md §6.1 `abort_turn`).
    pub fn request_abort(&self) {
        self.abort_requested.store(true, Ordering::Release);
    }

    /// Whether an abort has been requested.
    #[must_use]
    pub fn is_abort_requested(&self) -> bool {
        self.abort_requested.load(Ordering::Acquire)
    }

    /// Clear a previously requested abort once the machine has honored it.
    pub fn clear_abort(&self) {
        self.abort_requested.store(false, Ordering::Release);
    }

    /// Request that the session end once the current turn reaches
    /// `memory_consolidation` (spec.md §6.1 `end_session`).
    pub fn request_end_session(&self) {
        self.end_requested.store(true, Ordering::Release);
    }

    /// Whether the session has been asked to end.
    #[must_use]
    pub fn is_end_requested(&self) -> bool {
        self.end_requested.load(Ordering::Acquire)
    }
}

impl Default for SessionControl {
    fn default() -> Self {
        Self::new()
    }
}
