//! NATS pub/sub integration for the worker-pool job queue (spec.md §4.4).
//!
//! The state machine's [`lf_core::worker_dispatch::WorkerDispatch`] adapter
//! publishes one job per fanned-out agent/character on the subject
//! `lf.jobs.<task_kind>`; this module subscribes to those subjects under a
//! NATS queue group named after the task kind so that however many worker
//! processes share a deployment, each job is delivered to exactly one of
//! them. Completion is signalled back on `lf.jobs.<session_id>.<job_id>.done`,
//! which the dispatch adapter subscribes to per in-flight job.

use lf_types::{JobId, TaskKind};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::RunnerError;

/// The eight task-kind queue subjects a worker process can subscribe to.
pub const ALL_TASK_KINDS: &[TaskKind] = &[
    TaskKind::PlayerIntent,
    TaskKind::PlayerClarifyDecision,
    TaskKind::PlayerP2cDirective,
    TaskKind::CharacterAction,
    TaskKind::CharacterReaction,
    TaskKind::ValidationSemantic,
    TaskKind::MemoryCorruptionRender,
    TaskKind::StanceExtraction,
];

/// The subject a job of this kind is published and subscribed on.
#[must_use]
pub fn job_subject(kind: TaskKind) -> String {
    format!("lf.jobs.{}", tag(kind))
}

/// The subject a job's completion notice is published on, scoped per
/// session and job so the dispatch adapter's `await_result` can subscribe
/// narrowly instead of filtering a shared stream.
#[must_use]
pub fn completion_subject(session_id: Uuid, job_id: JobId) -> String {
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

/// NATS client wrapper for the worker pool.
///
/// Manages a single NATS connection and provides methods for subscribing
/// to job queues and publishing completion notices.
pub struct NatsClient {
    client: async_nats::Client,
}

impl NatsClient {
    /// Connect to a NATS server.
    ///
    /// # Errors
    /// Returns [`RunnerError::Nats`] if the connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self, RunnerError> {
        info!(url, "connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| RunnerError::Nats(format!("failed to connect to {url}: {e}")))?;
        info!("NATS connection established");
        Ok(Self { client })
    }

    /// Subscribe to `kind`'s job queue under a queue group named after the
    /// task kind, so each published job is claimed by exactly one worker
    /// process sharing this NATS deployment (spec.md §4.4: "multiple
    /// processes concurrently drain a set of named queues keyed by
    /// task_kind").
    ///
    /// # Errors
    /// Returns [`RunnerError::Nats`] if the subscription fails.
    pub async fn subscribe_queue(
        &self,
        kind: TaskKind,
    ) -> Result<async_nats::Subscriber, RunnerError> {
        let subject = job_subject(kind);
        let group = tag(kind).to_string();
        debug!(subject, group, "subscribing to job queue");
        let subscriber = self
            .client
            .queue_subscribe(subject.clone(), group)
            .await
            .map_err(|e| RunnerError::Nats(format!("failed to subscribe to {subject}: {e}")))?;
        info!(subject, "subscribed to job queue");
        Ok(subscriber)
    }

    /// Publish a job's completion notice, fire-and-forget: a subscriber
    /// reconnecting after a miss falls back to polling the durable job
    /// registry for terminal status, so a lost notice never blocks
    /// progress (spec.md §4.4 `await_result`).
    pub fn publish_completion(&self, session_id: Uuid, job_id: JobId) {
        let subject = completion_subject(session_id, job_id);
        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(err) = client.publish(subject.clone(), Vec::new().into()).await {
                warn!(subject, error = %err, "failed to publish job completion notice");
            }
        });
    }
}

impl std::fmt::Debug for NatsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsClient").field("connected", &true).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_subject_is_stable_per_kind() {
        assert_eq!(job_subject(TaskKind::PlayerIntent), "lf.jobs.player_intent");
        assert_eq!(
            job_subject(TaskKind::MemoryCorruptionRender),
            "lf.jobs.memory_corruption_render"
        );
    }

    #[test]
    fn completion_subject_is_scoped_per_job() {
        let session_id = Uuid::nil();
        let job_id = JobId::new();
        let subject = completion_subject(session_id, job_id);
        assert!(subject.starts_with("lf.jobs."));
        assert!(subject.ends_with(".done"));
    }

    #[tokio::test]
    #[ignore = "requires a live NATS server"]
    async fn connect_to_nats() {
        let result = NatsClient::connect("nats://localhost:4222").await;
        assert!(result.is_ok());
    }
}
