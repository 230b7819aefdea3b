//! Postgres-backed [`CheckpointStore`].
//!
//! One row per `(session_id, phase_index)`; `latest` is whichever row for a
//! session carries the greatest `version`. Kept as a single `UPSERT` so a
//! retried commit of the same `(session_id, phase_index)` never produces two
//! rows (spec.md §6.3, §8 phase-transition invariant).

use lf_core::checkpoint::{Checkpoint, CheckpointStore};
use lf_core::error::PhaseError;
use lf_types::GameState;
use sqlx::PgPool;
use sqlx::Row;
use uuid::Uuid;

/// A [`CheckpointStore`] implementation backed by a Postgres connection pool.
pub struct PostgresCheckpointStore {
    pool: PgPool,
}

impl PostgresCheckpointStore {
    /// Wrap a connection pool as a checkpoint store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_phase_error(context: &str, err: sqlx::Error) -> PhaseError {
    PhaseError::Fatal(format!("{context}: {err}"))
}

impl CheckpointStore for PostgresCheckpointStore {
    async fn commit(
        &self,
        session_id: Uuid,
        phase_index: u64,
        state: GameState,
    ) -> Result<Checkpoint, PhaseError> {
        let phase_index_i64 =
            i64::try_from(phase_index).map_err(|err| PhaseError::Fatal(err.to_string()))?;
        let state_json = serde_json::to_value(&state)
            .map_err(|err| PhaseError::Fatal(format!("checkpoint state does not serialize: {err}")))?;

        let row = sqlx::query(
            r"
            INSERT INTO checkpoints (session_id, phase_index, state, version)
            VALUES (
                $1, $2, $3,
                COALESCE((SELECT MAX(version) FROM checkpoints WHERE session_id = $1), 0) + 1
            )
            ON CONFLICT (session_id, phase_index)
            DO UPDATE SET state = EXCLUDED.state, version = EXCLUDED.version, committed_at = now()
            RETURNING version
            ",
        )
        .bind(session_id)
        .bind(phase_index_i64)
        .bind(&state_json)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| to_phase_error("checkpoint commit", err))?;

        let version: i64 = row.try_get("version").map_err(|err| to_phase_error("checkpoint commit", err))?;

        Ok(Checkpoint {
            session_id,
            phase_index,
            state,
            #[allow(clippy::cast_sign_loss)]
            version: version as u64,
        })
    }

    async fn latest(&self, session_id: Uuid) -> Result<Option<Checkpoint>, PhaseError> {
        let row = sqlx::query(
            r"
            SELECT phase_index, state, version
            FROM checkpoints
            WHERE session_id = $1
            ORDER BY version DESC
            LIMIT 1
            ",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| to_phase_error("checkpoint latest", err))?;

        row.map(|row| decode_row(session_id, &row)).transpose()
    }

    async fn get(
        &self,
        session_id: Uuid,
        phase_index: u64,
    ) -> Result<Option<Checkpoint>, PhaseError> {
        let phase_index_i64 =
            i64::try_from(phase_index).map_err(|err| PhaseError::Fatal(err.to_string()))?;
        let row = sqlx::query(
            r"
            SELECT phase_index, state, version
            FROM checkpoints
            WHERE session_id = $1 AND phase_index = $2
            ",
        )
        .bind(session_id)
        .bind(phase_index_i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| to_phase_error("checkpoint get", err))?;

        row.map(|row| decode_row(session_id, &row)).transpose()
    }
}

fn decode_row(session_id: Uuid, row: &sqlx::postgres::PgRow) -> Result<Checkpoint, PhaseError> {
    let phase_index: i64 = row
        .try_get("phase_index")
        .map_err(|err| to_phase_error("checkpoint decode", err))?;
    let version: i64 = row
        .try_get("version")
        .map_err(|err| to_phase_error("checkpoint decode", err))?;
    let state_json: serde_json::Value = row
        .try_get("state")
        .map_err(|err| to_phase_error("checkpoint decode", err))?;
    let state: GameState = serde_json::from_value(state_json)
        .map_err(|err| PhaseError::Fatal(format!("stored checkpoint state is malformed: {err}")))?;

    Ok(Checkpoint {
        session_id,
        #[allow(clippy::cast_sign_loss)]
        phase_index: phase_index as u64,
        state,
        #[allow(clippy::cast_sign_loss)]
        version: version as u64,
    })
}
