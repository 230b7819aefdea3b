//! Event-emitting decorator around a [`CheckpointStore`] (spec.md §6.3,
//! §8 phase-transition invariant).
//!
//! [`TurnMachine::run_turn`](lf_core::machine::TurnMachine) calls
//! `CheckpointStore::commit` after every successful phase transition and
//! once more at turn completion, making it the single natural hook point
//! for event emission without touching the machine itself. This wrapper
//! intercepts every `commit`, appends the corresponding [`Event`] to the
//! durable [`PostgresEventStore`], publishes it to the session's live
//! broadcast feed for the `WebSocket` stream, and best-effort mirrors the
//! new state into Dragonfly's hot cache.
//!
//! Dragonfly mirroring is best-effort: a cache write failure is logged and
//! swallowed rather than failing the turn, since Postgres remains the
//! source of truth and a stale or missing cache entry only costs an extra
//! read-through on the next lookup.

use chrono::Utc;
use lf_core::checkpoint::{Checkpoint, CheckpointStore};
use lf_core::error::PhaseError;
use lf_events::{Event, EventStore};
use lf_types::GameState;
use tokio::sync::{broadcast, RwLock};
use tracing::warn;
use uuid::Uuid;

use lf_db::{DragonflyPool, PostgresEventStore};

/// Wraps a [`CheckpointStore`] so every commit also durably records an
/// [`Event`], publishes it live, and mirrors state into Dragonfly.
pub struct EventingCheckpointStore<Ckpt> {
    inner: Ckpt,
    events: PostgresEventStore,
    cache: Option<DragonflyPool>,
    feed: broadcast::Sender<Event>,
    last_phase: RwLock<Option<lf_types::Phase>>,
}

impl<Ckpt> EventingCheckpointStore<Ckpt> {
    /// Wrap `inner`, recording through `events`, publishing on `feed`, and
    /// mirroring to `cache` when present.
    #[must_use]
    pub fn new(
        inner: Ckpt,
        events: PostgresEventStore,
        cache: Option<DragonflyPool>,
        feed: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            inner,
            events,
            cache,
            feed,
            last_phase: RwLock::new(None),
        }
    }

    async fn record(&self, session_id: Uuid, checkpoint: &Checkpoint) {
        let mut last_phase = self.last_phase.write().await;
        if let Some(from) = *last_phase {
            if from != checkpoint.state.current_phase {
                self.publish(
                    session_id,
                    Event::PhaseTransitioned {
                        from,
                        to: checkpoint.state.current_phase,
                        turn_number: checkpoint.state.turn_number,
                    },
                );
            }
        }
        *last_phase = Some(checkpoint.state.current_phase);
        drop(last_phase);

        self.publish(
            session_id,
            Event::CheckpointCommitted {
                #[allow(clippy::cast_possible_truncation)]
                phase_index: checkpoint.phase_index as u32,
                version: checkpoint.version,
            },
        );

        if let Some(cache) = &self.cache {
            if let Err(err) = cache.set_session_state(session_id, &checkpoint.state).await {
                warn!(%session_id, error = %err, "failed to mirror session state to Dragonfly");
            }
        }
    }

    fn publish(&self, session_id: Uuid, event: Event) {
        if let Err(err) = self.events.append(session_id, event.clone(), Utc::now()) {
            warn!(%session_id, error = %err, "failed to append event to durable log");
        }
        // No receivers is the normal case between WebSocket attachments.
        let _ = self.feed.send(event);
    }
}

impl<Ckpt: CheckpointStore> CheckpointStore for EventingCheckpointStore<Ckpt> {
    async fn commit(
        &self,
        session_id: Uuid,
        phase_index: u64,
        state: GameState,
    ) -> Result<Checkpoint, PhaseError> {
        let checkpoint = self.inner.commit(session_id, phase_index, state).await?;
        self.record(session_id, &checkpoint).await;
        Ok(checkpoint)
    }

    async fn latest(&self, session_id: Uuid) -> Result<Option<Checkpoint>, PhaseError> {
        self.inner.latest(session_id).await
    }

    async fn get(&self, session_id: Uuid, phase_index: u64) -> Result<Option<Checkpoint>, PhaseError> {
        self.inner.get(session_id, phase_index).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lf_core::checkpoint::InMemoryCheckpointStore;

    fn feed() -> broadcast::Sender<Event> {
        broadcast::channel(16).0
    }

    #[tokio::test]
    #[ignore = "requires a live Postgres database"]
    async fn commit_publishes_checkpoint_committed() {
        let inner = InMemoryCheckpointStore::new();
        let pool = sqlx::PgPool::connect_lazy("postgres://localhost/test").expect("lazy pool");
        let events = PostgresEventStore::new(pool);
        let tx = feed();
        let mut rx = tx.subscribe();
        let store = EventingCheckpointStore::new(inner, events, None, tx);

        let session_id = Uuid::new_v4();
        store
            .commit(session_id, 0, GameState::new(1, vec![], Utc::now()))
            .await
            .expect("commits");

        let event = rx.try_recv().expect("event published");
        assert!(matches!(event, Event::CheckpointCommitted { .. }));
    }
}
