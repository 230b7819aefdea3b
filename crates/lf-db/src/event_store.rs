//! Postgres-backed [`EventStore`].
//!
//! [`lf_events::EventStore`]'s methods are synchronous -- it is meant to be
//! callable from a `tracing::Layer`, which never runs inside an `async fn` --
//! so this implementation bridges into async Postgres calls with
//! `tokio::task::block_in_place` plus the current runtime handle, the same
//! pattern used to call NATS from a sync decision-source trait. This only
//! works on a multi-threaded runtime and when not already inside a `spawn`
//! that holds the only worker thread; `lf-engine` is responsible for running
//! on one.

use chrono::{DateTime, Utc};
use lf_events::{Event, EventStore};
use sqlx::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::error::DbError;

/// An [`EventStore`] implementation backed by a Postgres connection pool.
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Wrap a connection pool as an event store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn append_async(
        &self,
        session_id: Uuid,
        event: Event,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let payload = serde_json::to_value(&event)?;
        sqlx::query(
            "INSERT INTO session_events (session_id, recorded_at, event) VALUES ($1, $2, $3)",
        )
        .bind(session_id)
        .bind(recorded_at)
        .bind(&payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn replay_async(&self, session_id: Uuid) -> Result<Vec<(DateTime<Utc>, Event)>, DbError> {
        let rows = sqlx::query(
            "SELECT recorded_at, event FROM session_events WHERE session_id = $1 ORDER BY id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let recorded_at: DateTime<Utc> = row.try_get("recorded_at")?;
                let payload: serde_json::Value = row.try_get("event")?;
                let event: Event = serde_json::from_value(payload)?;
                Ok((recorded_at, event))
            })
            .collect()
    }
}

impl EventStore for PostgresEventStore {
    type Error = DbError;

    fn append(
        &self,
        session_id: Uuid,
        event: Event,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), Self::Error> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|err| DbError::Config(format!("no tokio runtime available: {err}")))?;
        tokio::task::block_in_place(|| handle.block_on(self.append_async(session_id, event, recorded_at)))
    }

    fn replay(&self, session_id: Uuid) -> Result<Vec<(DateTime<Utc>, Event)>, Self::Error> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|err| DbError::Config(format!("no tokio runtime available: {err}")))?;
        tokio::task::block_in_place(|| handle.block_on(self.replay_async(session_id)))
    }
}
