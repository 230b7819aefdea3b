//! The phase state machine (spec.md §4.1, §7, §8).
//!
//! [`TurnMachine`] drives one session's [`GameState`] through the 19-phase
//! turn cycle, generic over the storage/dispatch/router/memory ports so it
//! can run against in-memory fakes in tests and against `lf-db`/`lf-worker`
//! adapters in production, mirroring the injected-backend pattern the
//! teacher's tick runner used for its decision source.

use std::collections::BTreeMap;

use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

use lf_consensus::{aggregate, default_decision};
use lf_dice::{parse_override, pool_size, reclassify, roll, roll_helper_preroll, OverrideSpec};
use lf_memory::{MemoryClient, MemoryStorage, ReaderLayer, SearchParams};
use lf_router::{ChannelLog, Router};
use lf_types::{
    AgentId, Channel, CharacterId, CharacterSheet, ClarificationQa, GmCommand as _, GroupKey,
    KnowledgeLayer, Message, Outcome, Phase, PlayerPersonality, Recipient, RetrievedMemory,
    Sender, StanceVote, TaskKind,
};
use lf_validation::{validate, SemanticChecker};

use crate::checkpoint::CheckpointStore;
use crate::config::GameConfig;
use crate::error::PhaseError;
use crate::gm_command::GmCommand;
use crate::jobs::{
    self, CharacterReactionRequest, CharacterReactionResponse, MemoryCorruptionRenderRequest,
    PlayerClarifyDecisionRequest, PlayerClarifyDecisionResponse, PlayerIntentRequest,
    PlayerIntentResponse, PlayerP2cDirectiveRequest, PlayerP2cDirectiveResponse,
    StanceExtractionRequest,
};
use crate::phases::{self, StepOutcome};
use crate::session_control::SessionControl;
use crate::worker_dispatch::WorkerDispatch;

use lf_types::GameState;

/// How one call to [`TurnMachine::run_turn`] concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The turn ran all the way through `memory_consolidation`.
    Completed,
    /// The turn completed and the GM had already requested `end_session`.
    SessionEnded,
    /// A GM `abort_turn` rolled the session back to its last checkpoint.
    Aborted,
}

/// Drives one session's [`GameState`] through the turn cycle.
///
/// Generic over every port the cycle touches (spec.md §6.3): a checkpoint
/// store, a worker dispatch client, a message router, a memory client, and a
/// semantic checker for narrative-overreach validation. `lf-engine` supplies
/// the production adapters; tests supply in-memory fakes.
pub struct TurnMachine<'a, Ckpt, Work, Chan, MemStore, Rend, Sem>
where
    Ckpt: CheckpointStore,
    Work: WorkerDispatch,
    Chan: ChannelLog,
    MemStore: MemoryStorage,
    Sem: SemanticChecker,
{
    checkpoints: &'a Ckpt,
    workers: &'a Work,
    router: &'a Router<Chan>,
    memory: &'a MemoryClient<MemStore, Rend>,
    semantic_checker: &'a Sem,
    config: &'a GameConfig,
    session_control: &'a SessionControl,
    characters: &'a BTreeMap<CharacterId, CharacterSheet>,
    personalities: &'a BTreeMap<AgentId, PlayerPersonality>,
}

impl<'a, Ckpt, Work, Chan, MemStore, Rend, Sem> TurnMachine<'a, Ckpt, Work, Chan, MemStore, Rend, Sem>
where
    Ckpt: CheckpointStore,
    Work: WorkerDispatch,
    Chan: ChannelLog,
    MemStore: MemoryStorage,
    Rend: lf_memory::CorruptionRenderer,
    Sem: SemanticChecker,
{
    /// Assemble a machine over the given ports for one session's lifetime.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        checkpoints: &'a Ckpt,
        workers: &'a Work,
        router: &'a Router<Chan>,
        memory: &'a MemoryClient<MemStore, Rend>,
        semantic_checker: &'a Sem,
        config: &'a GameConfig,
        session_control: &'a SessionControl,
        characters: &'a BTreeMap<CharacterId, CharacterSheet>,
        personalities: &'a BTreeMap<AgentId, PlayerPersonality>,
    ) -> Self {
        Self {
            checkpoints,
            workers,
            router,
            memory,
            semantic_checker,
            config,
            session_control,
            characters,
            personalities,
        }
    }

    /// Run `state` forward from its `current_phase` through the end of one
    /// turn (spec.md §4.1), starting with the GM's `narration` for phase 1.
    ///
    /// Only meaningful when `state.current_phase == Phase::DmNarration`;
    /// resuming a turn already in progress (e.g. after a process restart)
    /// should rehydrate `state` from the last checkpoint and call this with
    /// the narration that checkpoint already recorded.
    ///
    /// # Errors
    /// Returns the first [`PhaseError`] a phase raises after its recovery
    /// path (spec.md §7) is exhausted.
    pub async fn run_turn<R: Rng + ?Sized>(
        &self,
        session_id: Uuid,
        state: &mut GameState,
        narration: String,
        rng: &mut R,
    ) -> Result<TurnOutcome, PhaseError> {
        if state.dm_narration.is_none() {
            state.dm_narration = Some(narration);
        }

        let mut phase_index = self
            .checkpoints
            .latest(session_id)
            .await?
            .map_or(0, |checkpoint| checkpoint.phase_index + 1);

        loop {
            if self.session_control.is_abort_requested() {
                self.session_control.clear_abort();
                if let Some(checkpoint) = self.checkpoints.latest(session_id).await? {
                    *state = checkpoint.state;
                }
                return Ok(TurnOutcome::Aborted);
            }

            match self.execute_phase_with_recovery(session_id, state, rng).await? {
                StepOutcome::Continue(next_phase) => {
                    state.current_phase = next_phase;
                    state.phase_start_time = Utc::now();
                    state.last_stable_phase = next_phase;
                    self.checkpoints.commit(session_id, phase_index, state.clone()).await?;
                    phase_index += 1;
                }
                StepOutcome::TurnComplete => {
                    self.checkpoints.commit(session_id, phase_index, state.clone()).await?;
                    return Ok(if self.session_control.is_end_requested() {
                        TurnOutcome::SessionEnded
                    } else {
                        TurnOutcome::Completed
                    });
                }
            }
        }
    }

    /// Execute the current phase, applying the one-rollback-and-retry
    /// recovery path for [`PhaseError::Transient`] failures (spec.md §7
    /// `PhaseFailure`).
    async fn execute_phase_with_recovery<R: Rng + ?Sized>(
        &self,
        session_id: Uuid,
        state: &mut GameState,
        rng: &mut R,
    ) -> Result<StepOutcome, PhaseError> {
        match self.execute_current_phase(session_id, state, rng).await {
            Ok(outcome) => Ok(outcome),
            Err(err) if err.is_recoverable() => {
                tracing::warn!(
                    phase = ?state.current_phase,
                    error = %err,
                    "recoverable phase failure, rolling back to last stable checkpoint and retrying once"
                );
                state.retry_count += 1;
                if let Some(checkpoint) = self.checkpoints.latest(session_id).await? {
                    *state = checkpoint.state;
                }
                self.execute_current_phase(session_id, state, rng)
                    .await
                    .map_err(|second_err| {
                        state.requires_dm_intervention = true;
                        PhaseError::PhaseFailure {
                            phase: state.current_phase,
                            message: second_err.to_string(),
                        }
                    })
            }
            Err(err) => Err(err),
        }
    }

    async fn execute_current_phase<R: Rng + ?Sized>(
        &self,
        session_id: Uuid,
        state: &mut GameState,
        rng: &mut R,
    ) -> Result<StepOutcome, PhaseError> {
        match state.current_phase {
            Phase::DmNarration => self.phase_dm_narration(state),
            Phase::MemoryRetrieval => self.phase_memory_retrieval(state, rng).await,
            Phase::DmClarificationCollect => {
                self.phase_dm_clarification_collect(session_id, state).await
            }
            Phase::DmClarificationWait => self.phase_dm_clarification_wait(state).await,
            Phase::SecondMemoryRetrieval => self.phase_second_memory_retrieval(state, rng).await,
            Phase::StrategicIntent => self.phase_strategic_intent(session_id, state).await,
            Phase::P2cDirective => self.phase_p2c_directive(session_id, state).await,
            Phase::CharacterAction => self.phase_character_action(session_id, state).await,
            Phase::Validation => self.phase_validation(state).await,
            Phase::DmAdjudication => self.phase_dm_adjudication(state).await,
            Phase::ResolveHelpers => self.phase_resolve_helpers(state, rng).await,
            Phase::DiceResolution => self.phase_dice_resolution(state, rng).await,
            Phase::LaserFeelingsQuestion => self.phase_laser_feelings_question(state).await,
            Phase::DmOutcome => self.phase_dm_outcome(state).await,
            Phase::CharacterReaction => self.phase_character_reaction(session_id, state).await,
            Phase::MemoryConsolidation => self.phase_memory_consolidation(session_id, state).await,
        }
    }

    // -- phase 1 -----------------------------------------------------------

    fn phase_dm_narration(&self, state: &GameState) -> Result<StepOutcome, PhaseError> {
        if state.dm_narration.is_none() {
            return Err(PhaseError::Fatal(
                "dm_narration phase reached without narration text".to_string(),
            ));
        }
        Ok(StepOutcome::Continue(Phase::MemoryRetrieval))
    }

    // -- phases 2 and 6 ------------------------------------------------------

    async fn retrieve_memories_for_all<R: Rng + ?Sized>(
        &self,
        state: &mut GameState,
        query: &str,
        rng: &mut R,
    ) -> Result<(), PhaseError> {
        let global_strength = if self.config.corruption.enabled {
            self.config.corruption.strength
        } else {
            0.0
        };

        for agent_id in state.active_agents.clone() {
            let personality = self.personality_for(&agent_id)?;
            let group_keys = [GroupKey::Agent(agent_id.clone()), GroupKey::CampaignMain];
            let params = SearchParams {
                query,
                group_keys: &group_keys,
                as_of: f64::from(state.turn_number),
                min_confidence: 0.0,
                include_corrupted: true,
                limit: 10,
                reader_layer: ReaderLayer::Player,
                global_strength,
            };
            let results = self.memory.search(&params, personality, rng).await;
            let projected = results
                .into_iter()
                .map(|r| RetrievedMemory {
                    uuid: r.uuid,
                    fact: r.fact,
                    corrupted: r.corrupted,
                    memory_type: r.memory_type,
                    confidence: r.confidence,
                    importance: r.importance,
                })
                .collect();
            state.retrieved_memories.insert(agent_id, projected);
        }
        Ok(())
    }

    async fn phase_memory_retrieval<R: Rng + ?Sized>(
        &self,
        state: &mut GameState,
        rng: &mut R,
    ) -> Result<StepOutcome, PhaseError> {
        let narration = state.dm_narration.clone().unwrap_or_default();
        self.retrieve_memories_for_all(state, &narration, rng).await?;
        Ok(StepOutcome::Continue(Phase::DmClarificationCollect))
    }

    async fn phase_second_memory_retrieval<R: Rng + ?Sized>(
        &self,
        state: &mut GameState,
        rng: &mut R,
    ) -> Result<StepOutcome, PhaseError> {
        let query = phases::clarification_query(
            &state.dm_narration.clone().unwrap_or_default(),
            &state.clarifications,
        );
        self.retrieve_memories_for_all(state, &query, rng).await?;
        Ok(StepOutcome::Continue(Phase::StrategicIntent))
    }

    // -- phases 3-5 ----------------------------------------------------------

    async fn phase_dm_clarification_collect(
        &self,
        session_id: Uuid,
        state: &mut GameState,
    ) -> Result<StepOutcome, PhaseError> {
        let narration = state.dm_narration.clone().unwrap_or_default();
        let mut asked_any = false;

        for agent_id in state.active_agents.clone() {
            let request = PlayerClarifyDecisionRequest {
                agent_id: agent_id.clone(),
                narration: narration.clone(),
                memories: state.retrieved_memories.get(&agent_id).cloned().unwrap_or_default(),
                round: state.clarification_round,
            };
            let response: PlayerClarifyDecisionResponse = self
                .dispatch_and_await(
                    session_id,
                    TaskKind::PlayerClarifyDecision,
                    &request,
                    Phase::DmClarificationCollect,
                )
                .await?;

            if let Some(question) = response.question {
                let question_id = format!("q{}", state.clarifications.len() + 1);
                state.clarifications.push(ClarificationQa {
                    question_id,
                    agent_id,
                    question,
                    answer: None,
                });
                asked_any = true;
            }
        }

        Ok(StepOutcome::Continue(if asked_any {
            Phase::DmClarificationWait
        } else {
            Phase::SecondMemoryRetrieval
        }))
    }

    async fn phase_dm_clarification_wait(
        &self,
        state: &mut GameState,
    ) -> Result<StepOutcome, PhaseError> {
        loop {
            if state.unanswered_clarifications().is_empty() {
                break;
            }
            self.session_control.park(Phase::DmClarificationWait).await;
            match self.session_control.wait_for_command().await {
                GmCommand::Answer { question_id, text } => {
                    match state
                        .clarifications
                        .iter_mut()
                        .find(|qa| qa.question_id == question_id && qa.answer.is_none())
                    {
                        Some(qa) => qa.answer = Some(text),
                        None => tracing::warn!(
                            question_id,
                            "answer referenced an unknown or already-answered question; ignoring"
                        ),
                    }
                }
                GmCommand::Finish => break,
                GmCommand::EndSession => self.session_control.request_end_session(),
                GmCommand::AbortTurn => self.session_control.request_abort(),
                other => tracing::debug!(
                    command = other.name(),
                    "command observed during dm_clarification_wait does not advance it; re-parking"
                ),
            }
        }

        state.clarification_round += 1;
        Ok(StepOutcome::Continue(
            if state.clarification_round < self.config.clarification.max_rounds {
                Phase::DmClarificationCollect
            } else {
                Phase::SecondMemoryRetrieval
            },
        ))
    }

    // -- phase 7 ---------------------------------------------------------

    async fn phase_strategic_intent(
        &self,
        session_id: Uuid,
        state: &mut GameState,
    ) -> Result<StepOutcome, PhaseError> {
        let narration = state.dm_narration.clone().unwrap_or_default();
        for agent_id in state.active_agents.clone() {
            let request = PlayerIntentRequest {
                agent_id: agent_id.clone(),
                narration: narration.clone(),
                memories: state.retrieved_memories.get(&agent_id).cloned().unwrap_or_default(),
                clarifications: state.clarifications.clone(),
            };
            let response: PlayerIntentResponse = self
                .dispatch_and_await(session_id, TaskKind::PlayerIntent, &request, Phase::StrategicIntent)
                .await?;
            state.strategic_intents.insert(agent_id, response.intent);
        }
        Ok(StepOutcome::Continue(Phase::P2cDirective))
    }

    // -- phase 8 -----------------------------------------------------------

    async fn phase_p2c_directive(
        &self,
        session_id: Uuid,
        state: &mut GameState,
    ) -> Result<StepOutcome, PhaseError> {
        let owned_characters = self.characters_owned_by_active_agents(state);

        for (agent_id, character_id) in owned_characters {
            let intent = state
                .strategic_intents
                .get(&agent_id)
                .cloned()
                .unwrap_or_default();
            let request = PlayerP2cDirectiveRequest {
                agent_id: agent_id.clone(),
                character_id: character_id.clone(),
                intent,
            };
            let response: PlayerP2cDirectiveResponse = self
                .dispatch_and_await(session_id, TaskKind::PlayerP2cDirective, &request, Phase::P2cDirective)
                .await?;

            let message = Message {
                message_id: lf_types::MessageId::new(),
                timestamp: Utc::now(),
                channel: Channel::P2c,
                from: Sender::Agent(agent_id),
                to: Some(Recipient::Character(character_id)),
                content: response.directive,
                turn_number: state.turn_number,
                session_number: state.session_number,
            };
            self.router
                .publish(session_id, message)
                .await
                .map_err(|err| PhaseError::Transient {
                    phase: Phase::P2cDirective,
                    message: err.to_string(),
                })?;
        }

        self.run_consensus_check(session_id, state).await;
        Ok(StepOutcome::Continue(Phase::CharacterAction))
    }

    /// Ephemeral stance extraction and roll-up over this round's OOC chat
    /// (spec.md §4.8). The result informs the GM's own judgment at
    /// adjudication; it is deliberately not persisted into `GameState`
    /// (`ConsensusState` is recomputed per round, not stored).
    async fn run_consensus_check(&self, session_id: Uuid, state: &GameState) {
        let (ooc_messages, _) = match self.router.fetch_for_player(session_id, 50).await {
            Ok(fetched) => fetched,
            Err(err) => {
                tracing::warn!(error = %err, "failed to fetch OOC log for consensus check; skipping this round");
                return;
            }
        };
        let ooc_text = ooc_messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let mut stances = BTreeMap::new();
        for agent_id in &state.active_agents {
            let request = StanceExtractionRequest {
                agent_id: agent_id.clone(),
                ooc_text: ooc_text.clone(),
            };
            let Ok(job) = jobs::build_job(TaskKind::StanceExtraction, &request) else {
                continue;
            };
            let Ok(job_id) = self.workers.enqueue(session_id, job).await else {
                continue;
            };
            let Ok(outcome) = self.workers.await_result(job_id).await else {
                continue;
            };
            if let Ok(vote) = jobs::parse_result::<StanceVote>(&outcome, Phase::P2cDirective) {
                stances.insert(agent_id.clone(), vote);
            }
        }

        let consensus = aggregate(
            &stances,
            &state.active_agents,
            state.clarification_round,
            0.0,
            self.config.consensus.max_rounds,
            self.config.consensus.timeout_seconds,
        );
        let decision = default_decision(&stances, &state.active_agents);
        tracing::info!(
            aggregate = ?consensus.aggregate,
            decision = ?decision,
            "round consensus computed for GM visibility"
        );
    }

    fn characters_owned_by_active_agents(&self, state: &GameState) -> Vec<(AgentId, CharacterId)> {
        state
            .active_agents
            .iter()
            .flat_map(|agent_id| {
                self.characters
                    .values()
                    .filter(|sheet| &sheet.agent_id == agent_id)
                    .map(|sheet| (agent_id.clone(), sheet.character_id.clone()))
            })
            .collect()
    }

    // -- phase 9 -----------------------------------------------------------

    async fn phase_character_action(
        &self,
        session_id: Uuid,
        state: &mut GameState,
    ) -> Result<StepOutcome, PhaseError> {
        let targets = phases::characters_needing_action(
            self.characters,
            &state.character_actions,
            &state.validation_results,
        );

        for character_id in targets {
            let Some(sheet) = self.characters.get(&character_id) else {
                return Err(PhaseError::Fatal(format!(
                    "character_action targeted unknown character {character_id}"
                )));
            };
            let directive = self
                .router
                .fetch_for_character(session_id, &character_id, 5)
                .await
                .map_err(|err| PhaseError::Transient {
                    phase: Phase::CharacterAction,
                    message: err.to_string(),
                })?
                .into_iter()
                .next_back()
                .map(|message| message.content)
                .unwrap_or_default();

            let previous_violations = match state.validation_results.get(&character_id) {
                Some(lf_types::ValidationResult::Retry { violations }) => violations.clone(),
                _ => Vec::new(),
            };

            let request = CharacterActionRequestWithSheet {
                character_id: character_id.clone(),
                directive,
                previous_violations,
                character_number: sheet.number,
            };
            let draft: lf_types::CharacterActionDraft = self
                .dispatch_and_await(session_id, TaskKind::CharacterAction, &request, Phase::CharacterAction)
                .await?;

            state.character_actions.insert(character_id.clone(), draft);
            *state.validation_attempts.entry(character_id).or_insert(0) += 1;
        }

        Ok(StepOutcome::Continue(Phase::Validation))
    }

    // -- phase 10 ----------------------------------------------------------

    async fn phase_validation(&self, state: &mut GameState) -> Result<StepOutcome, PhaseError> {
        let character_ids: Vec<CharacterId> = state.character_actions.keys().cloned().collect();
        for character_id in character_ids {
            let Some(draft) = state.character_actions.get(&character_id) else {
                continue;
            };
            let attempt = *state.validation_attempts.get(&character_id).unwrap_or(&1);
            let result = validate(&draft.text, attempt, self.semantic_checker).await;
            state.validation_results.insert(character_id, result);
        }
        Ok(StepOutcome::Continue(Phase::DmAdjudication))
    }

    // -- phase 12 ------------------------------------------------------

    async fn phase_dm_adjudication(&self, state: &mut GameState) -> Result<StepOutcome, PhaseError> {
        if phases::any_validation_retry(&state.validation_results) {
            return Ok(StepOutcome::Continue(Phase::CharacterAction));
        }

        self.session_control.park(Phase::DmAdjudication).await;
        match self.session_control.wait_for_command().await {
            GmCommand::Accept => {}
            GmCommand::Override(spec) => state.gm_override = Some(spec),
            GmCommand::EndSession => self.session_control.request_end_session(),
            GmCommand::AbortTurn => {
                self.session_control.request_abort();
                return Ok(StepOutcome::Continue(Phase::DmAdjudication));
            }
            other => {
                return Err(PhaseError::Permission(format!(
                    "command {} is not admissible at dm_adjudication",
                    other.name()
                )))
            }
        }
        Ok(StepOutcome::Continue(Phase::ResolveHelpers))
    }

    // -- phase 13 ------------------------------------------------------

    async fn phase_resolve_helpers<R: Rng + ?Sized>(
        &self,
        state: &mut GameState,
        rng: &mut R,
    ) -> Result<StepOutcome, PhaseError> {
        let helpers: Vec<(CharacterId, lf_types::CharacterActionDraft)> = state
            .character_actions
            .iter()
            .filter(|(_, draft)| draft.is_helping)
            .map(|(id, draft)| (id.clone(), draft.clone()))
            .collect();

        for (helper_id, draft) in helpers {
            let Some(main_actor_id) = draft.helping_character_id.clone() else {
                continue;
            };
            let Some(helper_sheet) = self.characters.get(&helper_id) else {
                continue;
            };
            let preroll = roll_helper_preroll(helper_sheet.number, draft.task_type, rng)
                .map_err(|err| PhaseError::Fatal(err.to_string()))?;
            if preroll.total_successes > 0 {
                *state.successful_helper_counts.entry(main_actor_id).or_insert(0) += 1;
            }
        }

        Ok(StepOutcome::Continue(Phase::DiceResolution))
    }

    // -- phase 14 ------------------------------------------------------

    async fn phase_dice_resolution<R: Rng + ?Sized>(
        &self,
        state: &mut GameState,
        rng: &mut R,
    ) -> Result<StepOutcome, PhaseError> {
        let (main_actor_id, draft) = phases::main_actor(&state.character_actions)?;
        let Some(sheet) = self.characters.get(&main_actor_id) else {
            return Err(PhaseError::Fatal(format!(
                "main actor {main_actor_id} has no character sheet"
            )));
        };
        let helper_successes = state
            .successful_helper_counts
            .get(&main_actor_id)
            .copied()
            .unwrap_or(0);

        let dice_result = if let Some(spec_text) = &state.gm_override {
            match parse_override(spec_text).map_err(|err| PhaseError::Validation(err.to_string()))? {
                OverrideSpec::ExplicitValues(values) => {
                    reclassify(&values, sheet.number, draft.task_type, rng)
                }
                OverrideSpec::DiceCount(count) => {
                    let values: Vec<u8> = (0..count).map(|_| rng.random_range(1..=6)).collect();
                    reclassify(&values, sheet.number, draft.task_type, rng)
                }
            }
        } else {
            let _ = pool_size(draft.is_prepared, draft.is_expert, helper_successes);
            roll(
                sheet.number,
                draft.task_type,
                draft.is_prepared,
                draft.is_expert,
                helper_successes,
                rng,
            )
            .map_err(|err| PhaseError::Fatal(err.to_string()))?
        };

        state.gm_question = dice_result.laser_feelings_question.clone();
        let has_laser_feelings = dice_result.has_laser_feelings();
        state.dice_result = Some(dice_result);

        Ok(StepOutcome::Continue(if has_laser_feelings {
            Phase::LaserFeelingsQuestion
        } else {
            Phase::DmOutcome
        }))
    }

    // -- phase 16 ------------------------------------------------------

    async fn phase_laser_feelings_question(
        &self,
        state: &mut GameState,
    ) -> Result<StepOutcome, PhaseError> {
        self.session_control.park(Phase::LaserFeelingsQuestion).await;
        match self.session_control.wait_for_command().await {
            GmCommand::LfAnswer(text) => state.laser_feelings_answer = Some(text),
            GmCommand::EndSession => self.session_control.request_end_session(),
            GmCommand::AbortTurn => {
                self.session_control.request_abort();
                return Ok(StepOutcome::Continue(Phase::LaserFeelingsQuestion));
            }
            other => {
                return Err(PhaseError::Permission(format!(
                    "command {} is not admissible at laser_feelings_question",
                    other.name()
                )))
            }
        }
        Ok(StepOutcome::Continue(Phase::DmOutcome))
    }

    // -- phase 17 ------------------------------------------------------

    async fn phase_dm_outcome(&self, state: &mut GameState) -> Result<StepOutcome, PhaseError> {
        self.session_control.park(Phase::DmOutcome).await;
        match self.session_control.wait_for_command().await {
            GmCommand::Outcome { tier, text } => {
                state.outcome_narration = Some(text);
                state.outcome_hint = tier.map(|hint| match hint {
                    crate::gm_command::OutcomeHint::Success => Outcome::Success,
                    crate::gm_command::OutcomeHint::Fail => Outcome::Failure,
                    crate::gm_command::OutcomeHint::Partial => Outcome::Partial,
                    crate::gm_command::OutcomeHint::Critical => Outcome::Critical,
                });
            }
            GmCommand::EndSession => self.session_control.request_end_session(),
            GmCommand::AbortTurn => {
                self.session_control.request_abort();
                return Ok(StepOutcome::Continue(Phase::DmOutcome));
            }
            other => {
                return Err(PhaseError::Permission(format!(
                    "command {} is not admissible at dm_outcome",
                    other.name()
                )))
            }
        }
        Ok(StepOutcome::Continue(Phase::CharacterReaction))
    }

    // -- phase 18 ------------------------------------------------------

    async fn phase_character_reaction(
        &self,
        session_id: Uuid,
        state: &mut GameState,
    ) -> Result<StepOutcome, PhaseError> {
        let outcome_narration = state.outcome_narration.clone().unwrap_or_default();
        let outcome = state
            .dice_result
            .as_ref()
            .map_or(Outcome::Partial, |result| result.outcome);

        let character_ids: Vec<CharacterId> = self.characters.keys().cloned().collect();
        for character_id in character_ids {
            let request = CharacterReactionRequest {
                character_id: character_id.clone(),
                outcome_narration: outcome_narration.clone(),
                outcome,
            };
            let response: CharacterReactionResponse = self
                .dispatch_and_await(
                    session_id,
                    TaskKind::CharacterReaction,
                    &request,
                    Phase::CharacterReaction,
                )
                .await?;
            state.character_reactions.insert(character_id, response.reaction);
        }

        Ok(StepOutcome::Continue(Phase::MemoryConsolidation))
    }

    // -- phase 19 ------------------------------------------------------

    async fn phase_memory_consolidation(
        &self,
        _session_id: Uuid,
        state: &mut GameState,
    ) -> Result<StepOutcome, PhaseError> {
        let narration = state.dm_narration.clone().unwrap_or_default();
        let outcome_narration = state.outcome_narration.clone().unwrap_or_default();
        let episode_text = format!("{narration} {outcome_narration}").trim().to_string();
        let days_elapsed = f64::from(state.turn_number);

        for agent_id in state.active_agents.clone() {
            let scope = GroupKey::Agent(agent_id);
            self.memory
                .add_episode(
                    &scope,
                    scope.clone(),
                    state.session_number,
                    &episode_text,
                    Utc::now(),
                    days_elapsed,
                    KnowledgeLayer::PlayerOnly,
                )
                .await
                .map_err(|err| PhaseError::Transient {
                    phase: Phase::MemoryConsolidation,
                    message: err.to_string(),
                })?;
        }

        let campaign_scope = GroupKey::CampaignMain;
        self.memory
            .add_episode(
                &campaign_scope,
                campaign_scope.clone(),
                state.session_number,
                &episode_text,
                Utc::now(),
                days_elapsed,
                KnowledgeLayer::Both,
            )
            .await
            .map_err(|err| PhaseError::Transient {
                phase: Phase::MemoryConsolidation,
                message: err.to_string(),
            })?;

        Ok(StepOutcome::TurnComplete)
    }

    // -- shared helpers ------------------------------------------------

    async fn dispatch_and_await<Req, Resp>(
        &self,
        session_id: Uuid,
        kind: TaskKind,
        request: &Req,
        phase: Phase,
    ) -> Result<Resp, PhaseError>
    where
        Req: serde::Serialize,
        Resp: serde::de::DeserializeOwned,
    {
        let job = jobs::build_job(kind, request)?;
        let job_id = self.workers.enqueue(session_id, job).await?;
        let outcome = self.workers.await_result(job_id).await?;
        jobs::parse_result(&outcome, phase)
    }

    fn personality_for(&self, agent_id: &AgentId) -> Result<&PlayerPersonality, PhaseError> {
        self.personalities.get(agent_id).ok_or_else(|| {
            PhaseError::Fatal(format!("no personality configured for agent {agent_id}"))
        })
    }
}

/// [`crate::jobs::CharacterActionRequest`] plus the acting character's dice
/// number, which the worker needs to judge whether the requested task is
/// even feasible but `lf-core` must not leak into `lf-types` (spec.md §3
/// keeps `CharacterSheet` and job payloads in separate crates).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct CharacterActionRequestWithSheet {
    character_id: CharacterId,
    directive: String,
    previous_violations: Vec<String>,
    character_number: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn character_action_request_with_sheet_serializes() {
        let request = CharacterActionRequestWithSheet {
            character_id: CharacterId::new("char_zara_7").expect("valid"),
            directive: "Go left.".to_string(),
            previous_violations: Vec::new(),
            character_number: 3,
        };
        let value = serde_json::to_value(&request).expect("serializes");
        assert_eq!(value["character_number"], 3);
    }
}
