//! Typed payload and result shapes for each worker-pool job kind
//! (spec.md §4.4, §6.3).
//!
//! [`crate::worker_dispatch::JobSpec`] carries an untyped `serde_json::Value`
//! payload so `lf-core` never depends on `lf-worker`'s wire format directly.
//! This module is the one place that bridges the two: one request struct and
//! (where the worker's answer isn't already a domain type) one response
//! struct per [`TaskKind`], plus the `build_job`/`parse_result` pair every
//! phase function uses to cross that boundary.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use lf_types::{
    AgentId, CharacterId, ClarificationQa, CorruptionType, Outcome, Phase, RetrievedMemory,
    TaskKind,
};
use lf_validation::Finding;

use crate::error::PhaseError;
use crate::worker_dispatch::{JobOutcome, JobSpec};

/// Context for one player agent's strategic-intent call (`TaskKind::PlayerIntent`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerIntentRequest {
    /// The agent producing the intent.
    pub agent_id: AgentId,
    /// The GM's narration for this turn.
    pub narration: String,
    /// Memories retrieved for this agent so far.
    pub memories: Vec<RetrievedMemory>,
    /// All clarification Q&A pairs asked so far this turn.
    pub clarifications: Vec<ClarificationQa>,
}

/// The worker's answer to a [`PlayerIntentRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerIntentResponse {
    /// The agent's out-of-character strategic intent.
    pub intent: String,
}

/// Context for one player's clarifying-question decision
/// (`TaskKind::PlayerClarifyDecision`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerClarifyDecisionRequest {
    /// The agent deciding whether to ask.
    pub agent_id: AgentId,
    /// The GM's narration for this turn.
    pub narration: String,
    /// Memories retrieved for this agent so far.
    pub memories: Vec<RetrievedMemory>,
    /// The current clarification round, starting at 0.
    pub round: u32,
}

/// The worker's answer to a [`PlayerClarifyDecisionRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerClarifyDecisionResponse {
    /// `Some` if the agent wants to ask a clarifying question this round.
    pub question: Option<String>,
}

/// Context for one player's P2C directive to its character
/// (`TaskKind::PlayerP2cDirective`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerP2cDirectiveRequest {
    /// The directing agent.
    pub agent_id: AgentId,
    /// The character being directed.
    pub character_id: CharacterId,
    /// The agent's strategic intent this directive is derived from.
    pub intent: String,
}

/// The worker's answer to a [`PlayerP2cDirectiveRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerP2cDirectiveResponse {
    /// The directive text published to the character over P2C.
    pub directive: String,
}

/// Context for one character's action draft (`TaskKind::CharacterAction`).
///
/// The response is [`lf_types::CharacterActionDraft`] directly; its fields
/// already match what a worker produces, so no separate response type exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterActionRequest {
    /// The acting character.
    pub character_id: CharacterId,
    /// The P2C directive this action responds to.
    pub directive: String,
    /// Violations flagged on a prior attempt this turn, if this is a retry.
    pub previous_violations: Vec<String>,
}

/// Context for one character's outcome reaction (`TaskKind::CharacterReaction`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterReactionRequest {
    /// The reacting character.
    pub character_id: CharacterId,
    /// The GM's outcome narration.
    pub outcome_narration: String,
    /// The dice-derived outcome tier.
    pub outcome: Outcome,
}

/// The worker's answer to a [`CharacterReactionRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterReactionResponse {
    /// The character's in-character reaction text.
    pub reaction: String,
}

/// Context for the validation engine's semantic false-positive check
/// (`TaskKind::ValidationSemantic`), dispatched by a `SemanticChecker`
/// implementation that delegates to the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSemanticRequest {
    /// The full action text under review.
    pub action_text: String,
    /// The pattern scan's raw findings, for the worker to judge in context.
    pub findings: Vec<Finding>,
}

/// The worker's answer to a [`ValidationSemanticRequest`]: the matched text
/// of findings it judges to be genuine overreach, not a surface artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSemanticResponse {
    /// `matched_text` of each finding judged genuine.
    pub genuine_matched_text: Vec<String>,
}

/// Context for rendering one corrupted memory fact
/// (`TaskKind::MemoryCorruptionRender`), dispatched by a `CorruptionRenderer`
/// implementation that delegates to the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryCorruptionRenderRequest {
    /// The pristine fact text.
    pub fact: String,
    /// The kind of degradation to apply.
    pub kind: CorruptionType,
}

/// The worker's answer to a [`MemoryCorruptionRenderRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryCorruptionRenderResponse {
    /// The rendered, corrupted fact text.
    pub corrupted_fact: String,
}

/// Context for extracting one agent's stance from OOC chat
/// (`TaskKind::StanceExtraction`).
///
/// The response is [`lf_types::StanceVote`] directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StanceExtractionRequest {
    /// The agent whose stance is being extracted.
    pub agent_id: AgentId,
    /// The OOC transcript so far this round.
    pub ooc_text: String,
}

/// Serialize `request` into a [`JobSpec`] tagged `kind`.
///
/// # Errors
/// Returns [`PhaseError::Fatal`] if `request` cannot be serialized, which
/// would indicate a bug in one of the request types above rather than a
/// runtime condition.
pub fn build_job<T: Serialize>(kind: TaskKind, request: &T) -> Result<JobSpec, PhaseError> {
    let payload = serde_json::to_value(request)
        .map_err(|err| PhaseError::Fatal(format!("failed to serialize {kind:?} request: {err}")))?;
    Ok(JobSpec { kind, payload })
}

/// Decode a finished job's result into `T`, or translate a non-`Finished`
/// outcome into the matching [`PhaseError`].
///
/// # Errors
/// Returns [`PhaseError::Transient`] if the job failed (the caller's
/// rollback-and-retry-once path applies), or [`PhaseError::Fatal`] if the
/// outcome is malformed in a way no retry can fix: a `Finished` job with no
/// result payload, a result that doesn't match `T`'s shape, or a
/// `Queued`/`Started` status reaching here at all (the dispatch port's
/// contract is that `await_result` only returns once a job is terminal).
pub fn parse_result<T: DeserializeOwned>(
    outcome: &JobOutcome,
    phase: Phase,
) -> Result<T, PhaseError> {
    use lf_types::JobStatus;

    match outcome.status {
        JobStatus::Finished => {
            let value = outcome.result.clone().ok_or_else(|| {
                PhaseError::Fatal(format!("phase {phase:?}: finished job carried no result"))
            })?;
            serde_json::from_value(value).map_err(|err| {
                PhaseError::Fatal(format!("phase {phase:?}: malformed job result: {err}"))
            })
        }
        JobStatus::Failed => Err(PhaseError::Transient {
            phase,
            message: outcome
                .failure
                .clone()
                .unwrap_or_else(|| "job failed with no diagnostic".to_string()),
        }),
        JobStatus::Queued | JobStatus::Started => Err(PhaseError::Fatal(format!(
            "phase {phase:?}: await_result returned a non-terminal job status {:?}",
            outcome.status
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_job_round_trips_through_json() {
        let request = PlayerIntentRequest {
            agent_id: AgentId::new("agent_alex").expect("valid"),
            narration: "The corridor goes dark.".to_string(),
            memories: Vec::new(),
            clarifications: Vec::new(),
        };
        let job = build_job(TaskKind::PlayerIntent, &request).expect("serializes");
        assert_eq!(job.kind, TaskKind::PlayerIntent);
        let restored: PlayerIntentRequest =
            serde_json::from_value(job.payload).expect("deserializes");
        assert_eq!(restored.narration, request.narration);
    }

    #[test]
    fn parse_result_decodes_a_finished_job() {
        let outcome = JobOutcome {
            status: lf_types::JobStatus::Finished,
            result: Some(serde_json::json!({"intent": "investigate the console"})),
            failure: None,
        };
        let response: PlayerIntentResponse =
            parse_result(&outcome, Phase::StrategicIntent).expect("parses");
        assert_eq!(response.intent, "investigate the console");
    }

    #[test]
    fn parse_result_maps_failed_status_to_transient() {
        let outcome = JobOutcome {
            status: lf_types::JobStatus::Failed,
            result: None,
            failure: Some("backend timeout".to_string()),
        };
        let result: Result<PlayerIntentResponse, PhaseError> =
            parse_result(&outcome, Phase::StrategicIntent);
        assert!(matches!(result, Err(PhaseError::Transient { .. })));
    }

    #[test]
    fn parse_result_rejects_finished_job_with_no_payload() {
        let outcome = JobOutcome {
            status: lf_types::JobStatus::Finished,
            result: None,
            failure: None,
        };
        let result: Result<PlayerIntentResponse, PhaseError> =
            parse_result(&outcome, Phase::StrategicIntent);
        assert!(matches!(result, Err(PhaseError::Fatal(_))));
    }
}
