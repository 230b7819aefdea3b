//! Shared application state for the GM command boundary server.
//!
//! [`AppState`] is a registry of running sessions keyed by `session_id`.
//! `lf-engine` calls [`AppState::register`] when it starts a session's turn
//! loop, handing this crate the session's [`SessionControl`] (so commands
//! can be delivered) and receiving back a broadcast sender (so the turn
//! machine can publish phase events for [`crate::ws::ws_session`] to
//! stream). The session is [`AppState::unregister`]ed once its turn loop
//! exits.

use std::collections::BTreeMap;
use std::sync::Arc;

use lf_core::session_control::SessionControl;
use lf_events::Event;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// Capacity of each session's phase-event broadcast channel.
///
/// A `WebSocket` client that falls behind by more than this many events
/// receives a [`broadcast::error::RecvError::Lagged`] and resumes from the
/// newest event rather than blocking the publisher.
const BROADCAST_CAPACITY: usize = 256;

/// One running session's command and event-feed handle.
#[derive(Clone)]
pub struct SessionHandle {
    /// Shared interrupt/abort/end-session control, owned by the turn loop.
    pub control: Arc<SessionControl>,
    /// Broadcasts this session's phase-transition events to attached
    /// `WebSocket` clients.
    pub events: broadcast::Sender<Event>,
}

/// Shared state for the Axum application: a registry of every currently
/// running session's [`SessionHandle`].
#[derive(Clone)]
pub struct AppState {
    sessions: Arc<RwLock<BTreeMap<Uuid, SessionHandle>>>,
}

impl AppState {
    /// Create an empty session registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Register a freshly started session, returning the broadcast sender
    /// the turn loop should publish phase events through.
    pub async fn register(&self, session_id: Uuid, control: Arc<SessionControl>) -> broadcast::Sender<Event> {
        let (tx, _rx) = broadcast::channel(BROADCAST_CAPACITY);
        let handle = SessionHandle {
            control,
            events: tx.clone(),
        };
        self.sessions.write().await.insert(session_id, handle);
        tx
    }

    /// Remove a session's registration once its turn loop has exited.
    pub async fn unregister(&self, session_id: Uuid) {
        self.sessions.write().await.remove(&session_id);
    }

    /// Look up a running session's handle.
    pub async fn get(&self, session_id: Uuid) -> Option<SessionHandle> {
        self.sessions.read().await.get(&session_id).cloned()
    }

    /// The session IDs currently registered, for the status page.
    pub async fn session_ids(&self) -> Vec<Uuid> {
        self.sessions.read().await.keys().copied().collect()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_get_returns_handle() {
        let state = AppState::new();
        let session_id = Uuid::nil();
        let control = Arc::new(SessionControl::new());
        state.register(session_id, Arc::clone(&control)).await;

        let handle = state.get(session_id).await.expect("registered");
        assert!(!handle.control.is_parked());
    }

    #[tokio::test]
    async fn unregister_removes_session() {
        let state = AppState::new();
        let session_id = Uuid::nil();
        state.register(session_id, Arc::new(SessionControl::new())).await;
        state.unregister(session_id).await;
        assert!(state.get(session_id).await.is_none());
    }

    #[tokio::test]
    async fn unknown_session_returns_none() {
        let state = AppState::new();
        assert!(state.get(Uuid::nil()).await.is_none());
    }
}
