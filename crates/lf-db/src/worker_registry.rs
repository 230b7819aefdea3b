//! Durable worker-pool job registry (spec.md §4.4, §6.3).
//!
//! `lf-worker` inserts a row when it accepts a job and updates it as the job
//! progresses; `lf-engine`'s [`lf_core::worker_dispatch::WorkerDispatch`]
//! adapter polls this table (or, in production, a push notification keyed
//! off it) to learn when a job reaches a terminal status. Kept separate from
//! `lf-worker`'s NATS transport so recovery after a crash -- `recover`,
//! reaping rows a worker claimed but never finished -- does not depend on
//! the queue having redelivered anything.

use chrono::{DateTime, Utc};
use lf_types::{JobId, JobStatus, TaskKind};
use sqlx::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::error::DbError;

/// A durable record of one worker-pool job.
#[derive(Debug, Clone)]
pub struct WorkerJobRow {
    /// The job's identifier.
    pub job_id: JobId,
    /// The session this job was dispatched for.
    pub session_id: Uuid,
    /// What kind of work this job performs.
    pub task_kind: TaskKind,
    /// The job's current lifecycle status.
    pub status: JobStatus,
    /// The job's input payload.
    pub payload: serde_json::Value,
    /// The job's result payload, once `Finished`.
    pub result: Option<serde_json::Value>,
    /// A diagnostic, once `Failed`.
    pub failure: Option<String>,
    /// How many attempts have been made so far.
    pub attempt: u32,
    /// When this row was last updated.
    pub updated_at: DateTime<Utc>,
}

/// The worker-job registry, backed by a Postgres connection pool.
pub struct WorkerRegistry {
    pool: PgPool,
}

fn task_kind_tag(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::PlayerIntent => "player_intent",
        TaskKind::PlayerClarifyDecision => "player_clarify_decision",
        TaskKind::PlayerP2cDirective => "player_p2c_directive",
        TaskKind::CharacterAction => "character_action",
        TaskKind::CharacterReaction => "character_reaction",
        TaskKind::ValidationSemantic => "validation_semantic",
        TaskKind::MemoryCorruptionRender => "memory_corruption_render",
        TaskKind::StanceExtraction => "stance_extraction",
    }
}

fn parse_task_kind(raw: &str) -> Option<TaskKind> {
    Some(match raw {
        "player_intent" => TaskKind::PlayerIntent,
        "player_clarify_decision" => TaskKind::PlayerClarifyDecision,
        "player_p2c_directive" => TaskKind::PlayerP2cDirective,
        "character_action" => TaskKind::CharacterAction,
        "character_reaction" => TaskKind::CharacterReaction,
        "validation_semantic" => TaskKind::ValidationSemantic,
        "memory_corruption_render" => TaskKind::MemoryCorruptionRender,
        "stance_extraction" => TaskKind::StanceExtraction,
        _ => return None,
    })
}

fn parse_job_status(raw: &str) -> Option<JobStatus> {
    Some(match raw {
        "queued" => JobStatus::Queued,
        "started" => JobStatus::Started,
        "finished" => JobStatus::Finished,
        "failed" => JobStatus::Failed,
        _ => return None,
    })
}

impl WorkerRegistry {
    /// Wrap a connection pool as a worker registry.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a freshly enqueued job in `Queued` status.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert_queued(
        &self,
        job_id: JobId,
        session_id: Uuid,
        task_kind: TaskKind,
        payload: &serde_json::Value,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"
            INSERT INTO worker_jobs (job_id, session_id, task_kind, status, payload)
            VALUES ($1, $2, $3, 'queued', $4)
            ",
        )
        .bind(job_id.into_inner())
        .bind(session_id)
        .bind(task_kind_tag(task_kind))
        .bind(payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mark a job `Started`, incrementing its attempt counter.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn mark_started(&self, job_id: JobId) -> Result<(), DbError> {
        sqlx::query(
            r"
            UPDATE worker_jobs
            SET status = 'started', attempt = attempt + 1, updated_at = now()
            WHERE job_id = $1
            ",
        )
        .bind(job_id.into_inner())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mark a job `Finished` with its result payload.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn mark_finished(
        &self,
        job_id: JobId,
        result: &serde_json::Value,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"
            UPDATE worker_jobs
            SET status = 'finished', result = $2, updated_at = now()
            WHERE job_id = $1
            ",
        )
        .bind(job_id.into_inner())
        .bind(result)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mark a job `Failed` with a diagnostic, either because its retry
    /// budget is exhausted or it hit a non-transient error.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn mark_failed(&self, job_id: JobId, failure: &str) -> Result<(), DbError> {
        sqlx::query(
            r"
            UPDATE worker_jobs
            SET status = 'failed', failure = $2, updated_at = now()
            WHERE job_id = $1
            ",
        )
        .bind(job_id.into_inner())
        .bind(failure)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetch a job's current row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, job_id: JobId) -> Result<Option<WorkerJobRow>, DbError> {
        let row = sqlx::query(
            r"
            SELECT job_id, session_id, task_kind, status, payload, result, failure, attempt, updated_at
            FROM worker_jobs
            WHERE job_id = $1
            ",
        )
        .bind(job_id.into_inner())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| decode_row(&row)).transpose()
    }

    /// Jobs for `session_id` claimed (`Started`) but not updated within
    /// `stale_after`: abandoned by a worker that crashed mid-job, candidates
    /// for `WorkerDispatch::recover` to requeue (spec.md §4.4).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn abandoned(
        &self,
        session_id: Uuid,
        stale_after: chrono::Duration,
    ) -> Result<Vec<WorkerJobRow>, DbError> {
        let cutoff = Utc::now() - stale_after;
        let rows = sqlx::query(
            r"
            SELECT job_id, session_id, task_kind, status, payload, result, failure, attempt, updated_at
            FROM worker_jobs
            WHERE session_id = $1 AND status = 'started' AND updated_at < $2
            ",
        )
        .bind(session_id)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_row).collect()
    }

    /// Reset an abandoned job back to `Queued` so it can be redelivered to
    /// a worker (spec.md §4.4 `recover`).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn reset_to_queued(&self, job_id: JobId) -> Result<(), DbError> {
        sqlx::query(
            r"
            UPDATE worker_jobs
            SET status = 'queued', updated_at = now()
            WHERE job_id = $1
            ",
        )
        .bind(job_id.into_inner())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete `Finished` rows older than `result_retention` and `Failed`
    /// rows older than `failure_retention` (spec.md §6.3).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if either delete fails.
    pub async fn reap_expired(
        &self,
        result_retention: chrono::Duration,
        failure_retention: chrono::Duration,
    ) -> Result<(), DbError> {
        let result_cutoff = Utc::now() - result_retention;
        let failure_cutoff = Utc::now() - failure_retention;

        sqlx::query("DELETE FROM worker_jobs WHERE status = 'finished' AND updated_at < $1")
            .bind(result_cutoff)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM worker_jobs WHERE status = 'failed' AND updated_at < $1")
            .bind(failure_cutoff)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn decode_row(row: &sqlx::postgres::PgRow) -> Result<WorkerJobRow, DbError> {
    let job_id: Uuid = row.try_get("job_id")?;
    let session_id: Uuid = row.try_get("session_id")?;
    let task_kind_raw: String = row.try_get("task_kind")?;
    let status_raw: String = row.try_get("status")?;
    let attempt: i32 = row.try_get("attempt")?;

    let task_kind = parse_task_kind(&task_kind_raw)
        .ok_or_else(|| DbError::Config(format!("unknown task_kind in worker_jobs: {task_kind_raw}")))?;
    let status = parse_job_status(&status_raw)
        .ok_or_else(|| DbError::Config(format!("unknown status in worker_jobs: {status_raw}")))?;

    Ok(WorkerJobRow {
        job_id: JobId::from(job_id),
        session_id,
        task_kind,
        status,
        payload: row.try_get("payload")?,
        result: row.try_get("result")?,
        failure: row.try_get("failure")?,
        #[allow(clippy::cast_sign_loss)]
        attempt: attempt as u32,
        updated_at: row.try_get("updated_at")?,
    })
}
