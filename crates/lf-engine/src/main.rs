//! Session runtime entry point (spec.md §4.1, §6.3).
//!
//! Wires every port `lf-core`'s [`TurnMachine`] needs to a production
//! adapter -- Postgres for checkpoints/channels/memory/events, Dragonfly
//! for the hot-state mirror, NATS for worker dispatch -- spawns the GM
//! command boundary server, then drives sessions through the turn cycle
//! one GM narration at a time.
//!
//! ```text
//! GM adapter (HTTP/WS) <--> SessionControl <--> TurnMachine <--> worker pool (NATS)
//!                                                    |
//!                                                    v
//!                                      Postgres (cold) / Dragonfly (hot)
//! ```

mod config;
mod corruption_renderer;
mod dispatch;
mod error;
mod events;
mod roster;
mod semantic_checker;

use std::path::PathBuf;
use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use lf_core::checkpoint::CheckpointStore;
use lf_core::config::GameConfig;
use lf_core::gm_command::GmCommand;
use lf_core::machine::{TurnMachine, TurnOutcome};
use lf_core::session_control::SessionControl;
use lf_core::worker_dispatch::WorkerDispatch;
use lf_db::{
    DragonflyPool, PostgresChannelLog, PostgresCheckpointStore, PostgresEventStore,
    PostgresMemoryStorage, PostgresPool, WorkerRegistry,
};
use lf_gm_adapter::startup::spawn_gm_adapter;
use lf_gm_adapter::state::AppState;
use lf_memory::MemoryClient;
use lf_router::Router;
use lf_types::GameState;

use crate::config::EngineConfig;
use crate::corruption_renderer::WorkerCorruptionRenderer;
use crate::dispatch::NatsWorkerDispatch;
use crate::error::EngineError;
use crate::events::EventingCheckpointStore;
use crate::roster::SessionRoster;
use crate::semantic_checker::WorkerSemanticChecker;

/// Application entry point.
///
/// Initializes logging, loads the session-wide [`GameConfig`] and the
/// engine's environment-sourced connection settings, connects to
/// Postgres/Dragonfly/NATS, spawns the GM command boundary server, then
/// runs an unbounded sequence of sessions -- one [`GameState`] at a time,
/// each incrementing `session_number` -- until the process is killed.
///
/// # Errors
///
/// Returns an error if initialization fails or a session's turn loop hits
/// an unrecoverable [`lf_core::error::PhaseError`].
#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    info!("lf-engine starting");

    let game_config_path = std::env::var("GAME_CONFIG_PATH").unwrap_or_else(|_| "game-config.yaml".to_owned());
    let game = GameConfig::from_file(&PathBuf::from(&game_config_path))
        .map_err(|err| anyhow::anyhow!("failed to load game config from {game_config_path}: {err}"))?;
    game.validate()
        .map_err(|err| anyhow::anyhow!("invalid game config: {err}"))?;

    let engine_config = EngineConfig::from_env(game.clone())?;
    info!(
        nats_url = engine_config.nats_url,
        roster_path = engine_config.roster_path,
        gm_adapter_port = engine_config.gm_adapter_port,
        "configuration loaded"
    );

    let pool = PostgresPool::connect_url(&engine_config.database_url).await?;
    pool.run_migrations().await?;
    info!("connected to Postgres and applied migrations");

    let dragonfly = match &engine_config.dragonfly_url {
        Some(url) => {
            let cache = DragonflyPool::connect(url).await?;
            info!("connected to Dragonfly hot-state cache");
            Some(cache)
        }
        None => {
            warn!("DRAGONFLY_URL not set, running without the hot-state cache");
            None
        }
    };

    let roster = SessionRoster::from_file(&engine_config.roster_path)?;
    let characters = roster.characters_by_id();
    let personalities = roster.personalities.clone();
    info!(characters = characters.len(), "session roster loaded");

    let worker_registry = WorkerRegistry::new(pool.pool().clone());
    let dispatch = NatsWorkerDispatch::connect(&engine_config.nats_url, worker_registry)
        .await
        .map_err(|err| anyhow::anyhow!("failed to connect worker dispatch: {err}"))?;
    info!("connected to NATS worker dispatch");

    let corruption_renderer = WorkerCorruptionRenderer::new(dispatch.clone());
    let semantic_checker = WorkerSemanticChecker::new(dispatch.clone());

    let channel_log = PostgresChannelLog::new(pool.pool().clone());
    let router = Router::new(channel_log, roster.character_owners());

    let memory_storage = PostgresMemoryStorage::new(pool.pool().clone());
    let memory = MemoryClient::new(memory_storage, corruption_renderer);

    let app_state = Arc::new(AppState::new());
    let _gm_adapter = spawn_gm_adapter(engine_config.gm_adapter_port, Arc::clone(&app_state)).await?;
    info!(port = engine_config.gm_adapter_port, "GM command boundary server listening");

    let active_agents = roster.active_agents();
    let mut session_number: u32 = 1;

    loop {
        let session_id = Uuid::now_v7();

        // Requeue any jobs left `Started` by a worker that crashed mid-call
        // before this session ever ran a turn (spec.md §4.4 `recover`). A
        // fresh `session_id` only ever matches abandoned rows when a prior
        // process crash is being resumed under the same id; the sweep is a
        // cheap no-op otherwise.
        match dispatch.recover(session_id).await {
            Ok(recovered) if !recovered.is_empty() => {
                info!(%session_id, count = recovered.len(), "requeued abandoned jobs from a prior crash");
            }
            Ok(_) => {}
            Err(err) => warn!(%session_id, error = %err, "failed to sweep abandoned jobs for session"),
        }

        let session_control = Arc::new(SessionControl::new());
        let feed = app_state.register(session_id, Arc::clone(&session_control)).await;

        let checkpoints = EventingCheckpointStore::new(
            PostgresCheckpointStore::new(pool.pool().clone()),
            PostgresEventStore::new(pool.pool().clone()),
            dragonfly.clone(),
            feed,
        );

        let machine = TurnMachine::new(
            &checkpoints,
            &dispatch,
            &router,
            &memory,
            &semantic_checker,
            &game,
            &session_control,
            &characters,
            &personalities,
        );

        let outcome = run_session(session_id, session_number, &active_agents, &session_control, &machine).await;

        app_state.unregister(session_id).await;

        match outcome {
            Ok(()) => info!(%session_id, session_number, "session ended"),
            Err(err) => warn!(%session_id, session_number, error = %err, "session ended with an error"),
        }

        session_number = session_number.saturating_add(1);
    }
}

/// Drive one session from its first turn until the GM ends it.
///
/// Each turn starts by parking at [`lf_types::Phase::DmNarration`] and
/// waiting for the GM's `narrate` command -- every other command
/// admissible there is out-of-band and just re-parks -- then hands the
/// narration text straight to [`TurnMachine::run_turn`], which owns the
/// remaining eighteen phases end to end.
async fn run_session<Ckpt, Work, Chan, MemStore, Rend, Sem>(
    session_id: Uuid,
    session_number: u32,
    active_agents: &[lf_types::AgentId],
    session_control: &SessionControl,
    machine: &TurnMachine<'_, Ckpt, Work, Chan, MemStore, Rend, Sem>,
) -> Result<(), EngineError>
where
    Ckpt: CheckpointStore,
    Work: lf_core::worker_dispatch::WorkerDispatch,
    Chan: lf_router::ChannelLog,
    MemStore: lf_memory::MemoryStorage,
    Sem: lf_validation::SemanticChecker,
{
    let mut state = GameState::new(session_number, active_agents.to_vec(), chrono::Utc::now());
    let mut rng = SmallRng::from_os_rng();

    loop {
        let narration = loop {
            session_control.park(lf_types::Phase::DmNarration).await;
            match session_control.wait_for_command().await {
                GmCommand::Narrate(text) => break text,
                GmCommand::EndSession => return Ok(()),
                other => {
                    warn!(%session_id, command = other.name(), "ignoring out-of-band command while awaiting narration");
                }
            }
        };

        match machine.run_turn(session_id, &mut state, narration, &mut rng).await? {
            TurnOutcome::Completed | TurnOutcome::Aborted => {}
            TurnOutcome::SessionEnded => return Ok(()),
        }
    }
}
