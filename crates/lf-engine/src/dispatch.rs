//! NATS-backed implementation of [`WorkerDispatch`] (spec.md §4.4, §6.3).
//!
//! `lf-worker` ships as a binary with no library target, so this client
//! side of the job queue is a deliberately independent, small NATS
//! publisher that mirrors the subject conventions documented in
//! `lf-worker`'s own NATS module rather than importing it. See `DESIGN.md`
//! for why the duplication is intentional.

use std::time::Duration;

use futures::StreamExt;
use lf_types::{JobId, JobStatus, TaskKind};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};
use uuid::Uuid;

use lf_core::error::PhaseError;
use lf_core::worker_dispatch::{JobOutcome, JobSpec, WorkerDispatch};
use lf_db::WorkerRegistry;

/// How often `await_result` polls the registry while waiting on a
/// completion notice that may have been dropped.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// The per-job individual timeout (spec.md §4.4, §5): a job that never
/// reaches a terminal registry row within this window is treated as failed
/// rather than blocking its phase forever.
const JOB_TIMEOUT: Duration = Duration::from_secs(120);

/// A `Started` job not updated within this window is considered abandoned
/// by a crashed worker and eligible for `recover` to requeue (spec.md §4.4).
/// Kept numerically equal to [`JOB_TIMEOUT`]: a worker still legitimately
/// running a job only ever holds a row in `Started` for up to that long.
const ABANDONED_STALE_AFTER: chrono::Duration = chrono::Duration::seconds(120);

/// The wire envelope published to a job's subject. Field-for-field
/// equivalent to `lf-worker`'s own `JobEnvelope`, duplicated because that
/// type lives in a binary crate this one cannot depend on.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct JobEnvelope {
    job_id: JobId,
    session_id: Uuid,
    task_kind: TaskKind,
    payload: serde_json::Value,
}

/// The subject a job of this kind is published and subscribed on.
fn job_subject(kind: TaskKind) -> String {
    format!("lf.jobs.{}", tag(kind))
}

/// The subject a job's completion notice is published on.
fn completion_subject(session_id: Uuid, job_id: JobId) -> String {
    format!("lf.jobs.{session_id}.{}.done", job_id.into_inner())
}

fn tag(kind: TaskKind) -> &'static str {
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

/// Dispatches jobs to the worker pool over NATS and tracks their terminal
/// status through the durable [`WorkerRegistry`].
///
/// Publishing and registry insertion both happen in `enqueue`; a worker
/// process picks the envelope off its task-kind queue, runs it, and writes
/// the terminal row the registry polling in `await_result` observes.
///
/// `Clone` is cheap: `async_nats::Client` is an `Arc`-backed handle and
/// [`WorkerRegistry`] wraps a [`sqlx::PgPool`], so the session runtime
/// clones one dispatch into the corruption renderer and semantic checker
/// rather than opening a second NATS connection for each.
#[derive(Clone)]
pub struct NatsWorkerDispatch {
    nats: async_nats::Client,
    registry: WorkerRegistry,
}

impl NatsWorkerDispatch {
    /// Wrap an already-connected NATS client and worker registry.
    #[must_use]
    pub const fn new(nats: async_nats::Client, registry: WorkerRegistry) -> Self {
        Self { nats, registry }
    }

    /// Connect to NATS and wrap it with `registry`.
    ///
    /// # Errors
    /// Returns [`PhaseError::Fatal`] if the NATS connection fails.
    pub async fn connect(url: &str, registry: WorkerRegistry) -> Result<Self, PhaseError> {
        let nats = async_nats::connect(url)
            .await
            .map_err(|err| PhaseError::Fatal(format!("failed to connect to NATS at {url}: {err}")))?;
        Ok(Self::new(nats, registry))
    }
}

impl WorkerDispatch for NatsWorkerDispatch {
    async fn enqueue(&self, session_id: Uuid, job: JobSpec) -> Result<JobId, PhaseError> {
        let job_id = JobId::new();

        self.registry
            .insert_queued(job_id, session_id, job.kind, &job.payload)
            .await
            .map_err(|err| PhaseError::Fatal(format!("failed to record job {job_id}: {err}")))?;

        let envelope = JobEnvelope {
            job_id,
            session_id,
            task_kind: job.kind,
            payload: job.payload,
        };
        let body = serde_json::to_vec(&envelope)
            .map_err(|err| PhaseError::Fatal(format!("failed to encode job envelope: {err}")))?;

        self.nats
            .publish(job_subject(job.kind), body.into())
            .await
            .map_err(|err| PhaseError::Fatal(format!("failed to publish job {job_id}: {err}")))?;

        debug!(%job_id, ?job.kind, "enqueued job");
        Ok(job_id)
    }

    async fn await_result(&self, job_id: JobId) -> Result<JobOutcome, PhaseError> {
        // Subscribe first so a completion notice published between our
        // first poll and the subscribe call is never missed; if a worker
        // finishes before we even subscribe, the fallback poll below still
        // finds the terminal row.
        let mut completion = None;
        if let Some(row) = self
            .registry
            .get(job_id)
            .await
            .map_err(|err| PhaseError::Fatal(format!("failed to read job {job_id}: {err}")))?
        {
            if let Ok(subscriber) = self.nats.subscribe(completion_subject(row.session_id, job_id)).await {
                completion = Some(subscriber);
            }
        }

        let poll = self.poll_until_terminal(job_id, completion.as_mut());
        match tokio::time::timeout(JOB_TIMEOUT, poll).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(%job_id, timeout_secs = JOB_TIMEOUT.as_secs(), "job timed out awaiting terminal status");
                let _ = self
                    .registry
                    .mark_failed(job_id, &format!("job timed out after {}s", JOB_TIMEOUT.as_secs()))
                    .await;
                Ok(JobOutcome {
                    status: JobStatus::Failed,
                    result: None,
                    failure: Some(format!("job timed out after {}s", JOB_TIMEOUT.as_secs())),
                })
            }
        }
    }

    async fn recover(&self, session_id: Uuid) -> Result<Vec<JobId>, PhaseError> {
        let abandoned = self
            .registry
            .abandoned(session_id, ABANDONED_STALE_AFTER)
            .await
            .map_err(|err| PhaseError::Fatal(format!("failed to list abandoned jobs for session {session_id}: {err}")))?;

        let mut requeued = Vec::with_capacity(abandoned.len());
        for row in abandoned {
            let envelope = JobEnvelope {
                job_id: row.job_id,
                session_id: row.session_id,
                task_kind: row.task_kind,
                payload: row.payload.clone(),
            };
            let body = serde_json::to_vec(&envelope)
                .map_err(|err| PhaseError::Fatal(format!("failed to encode job envelope: {err}")))?;

            self.registry
                .reset_to_queued(row.job_id)
                .await
                .map_err(|err| PhaseError::Fatal(format!("failed to requeue job {}: {err}", row.job_id)))?;

            self.nats
                .publish(job_subject(row.task_kind), body.into())
                .await
                .map_err(|err| PhaseError::Fatal(format!("failed to republish job {}: {err}", row.job_id)))?;

            warn!(job_id = %row.job_id, %session_id, "recovered abandoned job");
            requeued.push(row.job_id);
        }
        Ok(requeued)
    }
}

impl NatsWorkerDispatch {
    /// Poll the registry for `job_id`'s terminal status, using the
    /// completion-notice subscription as a wakeup hint where available.
    async fn poll_until_terminal(
        &self,
        job_id: JobId,
        mut completion: Option<&mut async_nats::Subscriber>,
    ) -> Result<JobOutcome, PhaseError> {
        loop {
            let row = self
                .registry
                .get(job_id)
                .await
                .map_err(|err| PhaseError::Fatal(format!("failed to read job {job_id}: {err}")))?
                .ok_or_else(|| PhaseError::Fatal(format!("job {job_id} has no registry row")))?;

            match row.status {
                JobStatus::Finished => {
                    return Ok(JobOutcome {
                        status: JobStatus::Finished,
                        result: row.result,
                        failure: None,
                    });
                }
                JobStatus::Failed => {
                    return Ok(JobOutcome {
                        status: JobStatus::Failed,
                        result: None,
                        failure: row.failure,
                    });
                }
                JobStatus::Queued | JobStatus::Started => {
                    if let Some(subscriber) = completion.as_mut() {
                        let wait = tokio::time::timeout(POLL_INTERVAL, subscriber.next());
                        let _ = wait.await;
                    } else {
                        sleep(POLL_INTERVAL).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_subject_matches_worker_convention() {
        assert_eq!(job_subject(TaskKind::PlayerIntent), "lf.jobs.player_intent");
    }

    #[test]
    fn completion_subject_is_scoped_per_job() {
        let subject = completion_subject(Uuid::nil(), JobId::new());
        assert!(subject.starts_with("lf.jobs."));
        assert!(subject.ends_with(".done"));
    }
}
