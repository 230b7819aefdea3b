//! The per-job pipeline: claim a job, render its prompt, call the LLM under
//! retry, parse the typed response, and record the terminal outcome
//! (spec.md §4.4).
//!
//! `lf-engine`'s [`lf_core::worker_dispatch::WorkerDispatch`] adapter enqueues
//! work by publishing a [`JobEnvelope`] to the subject for its [`TaskKind`]
//! and inserting a matching `Queued` row in [`WorkerRegistry`]. This module
//! is the consumer side: one [`JobRunner`] drains every queue concurrently,
//! bounded by `max_concurrent_jobs`, writing `Started`/`Finished`/`Failed`
//! transitions back to the same registry row as it goes.

use std::sync::Arc;

use futures::StreamExt;
use lf_core::config::GameConfig;
use lf_core::jobs::{
    CharacterReactionResponse, MemoryCorruptionRenderResponse, PlayerClarifyDecisionResponse,
    PlayerIntentResponse, PlayerP2cDirectiveResponse, ValidationSemanticResponse,
};
use lf_db::WorkerRegistry;
use lf_types::{CharacterActionDraft, JobId, StanceVote, TaskKind};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::RunnerError;
use crate::llm::{complete_with_retry, LlmBackend};
use crate::nats::{NatsClient, ALL_TASK_KINDS};
use crate::parse::parse_json_response;
use crate::prompt::PromptEngine;

/// The wire envelope published to a job's subject: enough for the worker to
/// claim, render, and report back without a second round trip to the
/// registry just to learn what kind of job it picked up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEnvelope {
    /// The job's identifier, shared with its [`WorkerRegistry`] row.
    pub job_id: JobId,
    /// The session this job was dispatched for.
    pub session_id: Uuid,
    /// What kind of work this job performs.
    pub task_kind: TaskKind,
    /// The job's request payload, shaped per `task_kind` by
    /// [`lf_core::jobs`].
    pub payload: serde_json::Value,
}

/// Runs the per-job pipeline against one worker process's share of every
/// task-kind queue.
pub struct JobRunner {
    nats: Arc<NatsClient>,
    registry: Arc<WorkerRegistry>,
    prompts: Arc<PromptEngine>,
    backend: Arc<LlmBackend>,
    game: GameConfig,
    concurrency: Arc<Semaphore>,
}

impl JobRunner {
    /// Build a job runner over already-connected dependencies.
    #[must_use]
    pub fn new(
        nats: Arc<NatsClient>,
        registry: Arc<WorkerRegistry>,
        prompts: Arc<PromptEngine>,
        backend: Arc<LlmBackend>,
        game: GameConfig,
        max_concurrent_jobs: usize,
    ) -> Self {
        Self {
            nats,
            registry,
            prompts,
            backend,
            game,
            concurrency: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    /// Subscribe to every task-kind queue and process jobs until the
    /// process is shut down. Each queue's subscriber loop runs on its own
    /// task; job bodies run under the shared concurrency semaphore so one
    /// process never exceeds `max_concurrent_jobs` in-flight LLM calls
    /// across all queues combined.
    ///
    /// # Errors
    /// Returns [`RunnerError::Nats`] if any queue subscription fails to
    /// start.
    pub async fn run(self: Arc<Self>) -> Result<(), RunnerError> {
        let mut handles = Vec::with_capacity(ALL_TASK_KINDS.len());
        for &kind in ALL_TASK_KINDS {
            let subscriber = self.nats.subscribe_queue(kind).await?;
            let runner = Arc::clone(&self);
            handles.push(tokio::spawn(runner.drain_queue(kind, subscriber)));
        }
        for handle in handles {
            if let Err(err) = handle.await {
                error!(error = %err, "job queue task panicked");
            }
        }
        Ok(())
    }

    async fn drain_queue(self: Arc<Self>, kind: TaskKind, mut subscriber: async_nats::Subscriber) {
        info!(?kind, "draining job queue");
        while let Some(message) = subscriber.next().await {
            let permit = match Arc::clone(&self.concurrency).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let runner = Arc::clone(&self);
            tokio::spawn(async move {
                let _permit = permit;
                if let Err(err) = runner.process_message(&message.payload).await {
                    warn!(error = %err, "job processing failed");
                }
            });
        }
        info!(?kind, "job queue subscriber closed");
    }

    async fn process_message(&self, raw: &[u8]) -> Result<(), RunnerError> {
        let envelope: JobEnvelope = serde_json::from_slice(raw)?;
        let job_id = envelope.job_id;

        self.registry.mark_started(job_id).await?;
        info!(job_id = %job_id.into_inner(), task_kind = ?envelope.task_kind, "job started");

        match self.execute(&envelope).await {
            Ok(result) => {
                self.registry.mark_finished(job_id, &result).await?;
            }
            Err(err) => {
                warn!(job_id = %job_id.into_inner(), error = %err, "job failed");
                self.registry.mark_failed(job_id, &err.to_string()).await?;
            }
        }

        self.nats.publish_completion(envelope.session_id, job_id);
        Ok(())
    }

    async fn execute(&self, envelope: &JobEnvelope) -> Result<serde_json::Value, RunnerError> {
        let rendered = self.prompts.render(envelope.task_kind, &envelope.payload)?;
        let raw = complete_with_retry(
            &self.backend,
            &rendered,
            &self.game.llm.model,
            self.game.llm.max_tokens,
            &self.game.llm.retry,
        )
        .await?;

        decode_response(envelope.task_kind, &raw)
    }
}

/// Parse the LLM's raw text into the response shape for `kind`, re-encoding
/// it as a `Value` so [`WorkerRegistry::mark_finished`] stores exactly what
/// `lf_core::jobs::parse_result` later decodes on the dispatch side.
fn decode_response(kind: TaskKind, raw: &str) -> Result<serde_json::Value, RunnerError> {
    let value = match kind {
        TaskKind::PlayerIntent => serde_json::to_value(parse_json_response::<PlayerIntentResponse>(raw)?)?,
        TaskKind::PlayerClarifyDecision => {
            serde_json::to_value(parse_json_response::<PlayerClarifyDecisionResponse>(raw)?)?
        }
        TaskKind::PlayerP2cDirective => {
            serde_json::to_value(parse_json_response::<PlayerP2cDirectiveResponse>(raw)?)?
        }
        TaskKind::CharacterAction => serde_json::to_value(parse_json_response::<CharacterActionDraft>(raw)?)?,
        TaskKind::CharacterReaction => {
            serde_json::to_value(parse_json_response::<CharacterReactionResponse>(raw)?)?
        }
        TaskKind::ValidationSemantic => {
            serde_json::to_value(parse_json_response::<ValidationSemanticResponse>(raw)?)?
        }
        TaskKind::MemoryCorruptionRender => {
            serde_json::to_value(parse_json_response::<MemoryCorruptionRenderResponse>(raw)?)?
        }
        TaskKind::StanceExtraction => serde_json::to_value(parse_json_response::<StanceVote>(raw)?)?,
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_player_intent_response() {
        let raw = r#"{"intent": "investigate the console"}"#;
        let value = decode_response(TaskKind::PlayerIntent, raw).expect("decodes");
        assert_eq!(value["intent"], "investigate the console");
    }

    #[test]
    fn decodes_character_action_response() {
        let raw = r#"{
            "text": "I pry open the panel",
            "task_type": "lasers",
            "is_prepared": true,
            "is_expert": false,
            "is_helping": false,
            "helping_character_id": null,
            "justification": "engineering training"
        }"#;
        let value = decode_response(TaskKind::CharacterAction, raw).expect("decodes");
        assert_eq!(value["task_type"], "lasers");
    }

    #[test]
    fn rejects_malformed_response() {
        let result = decode_response(TaskKind::PlayerIntent, "not json");
        assert!(result.is_err());
    }

    #[test]
    fn envelope_round_trips_through_json() {
        let envelope = JobEnvelope {
            job_id: JobId::new(),
            session_id: Uuid::nil(),
            task_kind: TaskKind::StanceExtraction,
            payload: serde_json::json!({"agent_id": "agent_alex", "ooc_text": "I think we should wait"}),
        };
        let bytes = serde_json::to_vec(&envelope).expect("serializes");
        let restored: JobEnvelope = serde_json::from_slice(&bytes).expect("deserializes");
        assert_eq!(restored.task_kind, TaskKind::StanceExtraction);
    }
}
