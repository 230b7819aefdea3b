//! The checkpoint storage port and its in-memory reference implementation
//! (spec.md §6.3, §8 "a checkpoint at `p` before any observable side
//! effect of `q`").
//!
//! `lf-db` implements [`CheckpointStore`] against Postgres for production
//! sessions, one record per `(session_id, phase_index)`. The in-memory
//! implementation here backs unit tests and is what [`crate::machine`]
//! exercises directly.

use std::collections::HashMap;

use lf_types::GameState;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::PhaseError;

/// One committed snapshot of a session's turn state.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    /// The session this checkpoint belongs to.
    pub session_id: Uuid,
    /// The index of the phase this checkpoint was taken after, in
    /// execution order within the turn (not the same as `Phase`'s
    /// discriminant, since a turn can revisit phases via the
    /// clarification loop).
    pub phase_index: u64,
    /// The full state as of this checkpoint.
    pub state: GameState,
    /// Monotonic version, strictly increasing per session.
    pub version: u64,
}

/// Storage port for turn checkpoints (spec.md §6.3, §7 `PhaseFailure`
/// recovery, §8 phase-transition invariant).
pub trait CheckpointStore: Send + Sync {
    /// Commit a new checkpoint for `session_id`, superseding the previous
    /// latest. Implementations must make this atomic with respect to
    /// concurrent readers: `latest` never observes a partially written
    /// checkpoint.
    fn commit(
        &self,
        session_id: Uuid,
        phase_index: u64,
        state: GameState,
    ) -> impl Future<Output = Result<Checkpoint, PhaseError>> + Send;

    /// The most recently committed checkpoint for `session_id`, if any.
    fn latest(
        &self,
        session_id: Uuid,
    ) -> impl Future<Output = Result<Option<Checkpoint>, PhaseError>> + Send;

    /// The checkpoint at a specific `phase_index`, if one was committed.
    fn get(
        &self,
        session_id: Uuid,
        phase_index: u64,
    ) -> impl Future<Output = Result<Option<Checkpoint>, PhaseError>> + Send;
}

#[derive(Debug, Default)]
struct SessionCheckpoints {
    by_phase_index: HashMap<u64, Checkpoint>,
    latest_index: Option<u64>,
    version: u64,
}

/// An in-process implementation of [`CheckpointStore`].
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    sessions: RwLock<HashMap<Uuid, SessionCheckpoints>>,
}

impl InMemoryCheckpointStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    async fn commit(
        &self,
        session_id: Uuid,
        phase_index: u64,
        state: GameState,
    ) -> Result<Checkpoint, PhaseError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.entry(session_id).or_default();
        entry.version += 1;
        let checkpoint = Checkpoint {
            session_id,
            phase_index,
            state,
            version: entry.version,
        };
        entry.by_phase_index.insert(phase_index, checkpoint.clone());
        entry.latest_index = Some(phase_index);
        Ok(checkpoint)
    }

    async fn latest(&self, session_id: Uuid) -> Result<Option<Checkpoint>, PhaseError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&session_id).and_then(|entry| {
            entry
                .latest_index
                .and_then(|index| entry.by_phase_index.get(&index).cloned())
        }))
    }

    async fn get(
        &self,
        session_id: Uuid,
        phase_index: u64,
    ) -> Result<Option<Checkpoint>, PhaseError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&session_id)
            .and_then(|entry| entry.by_phase_index.get(&phase_index).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[tokio::test]
    async fn commit_and_latest_round_trip() {
        let store = InMemoryCheckpointStore::new();
        let session_id = Uuid::new_v4();
        let state = GameState::new(1, vec![], Utc::now());

        let committed = store.commit(session_id, 0, state).await.expect("commits");
        assert_eq!(committed.version, 1);

        let latest = store.latest(session_id).await.expect("reads").expect("some");
        assert_eq!(latest.phase_index, 0);
        assert_eq!(latest.version, 1);
    }

    #[tokio::test]
    async fn later_commit_supersedes_latest_but_keeps_history() {
        let store = InMemoryCheckpointStore::new();
        let session_id = Uuid::new_v4();

        store
            .commit(session_id, 0, GameState::new(1, vec![], Utc::now()))
            .await
            .expect("commits");
        store
            .commit(session_id, 1, GameState::new(1, vec![], Utc::now()))
            .await
            .expect("commits");

        let latest = store.latest(session_id).await.expect("reads").expect("some");
        assert_eq!(latest.phase_index, 1);
        assert_eq!(latest.version, 2);

        let first = store.get(session_id, 0).await.expect("reads").expect("some");
        assert_eq!(first.phase_index, 0);
        assert_eq!(first.version, 1);
    }

    #[tokio::test]
    async fn unknown_session_has_no_latest() {
        let store = InMemoryCheckpointStore::new();
        assert!(store
            .latest(Uuid::new_v4())
            .await
            .expect("reads")
            .is_none());
    }
}
