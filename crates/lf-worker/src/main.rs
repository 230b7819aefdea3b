//! Agent worker pool entry point (spec.md §4.4).
//!
//! Loads the session-wide [`lf_core::config::GameConfig`] plus this
//! process's environment-sourced secrets, connects to NATS and the durable
//! job registry, then drains every task-kind queue concurrently until shut
//! down.
//!
//! ```text
//! NATS (job queue) --> Prompt Engine --> LLM Backend --> Parser --> Postgres (registry)
//! ```

mod config;
mod error;
mod llm;
mod nats;
mod parse;
mod prompt;
mod runner;

use std::path::PathBuf;
use std::sync::Arc;

use lf_db::{PostgresPool, WorkerRegistry};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::WorkerConfig;
use crate::llm::create_backend;
use crate::nats::NatsClient;
use crate::prompt::PromptEngine;
use crate::runner::JobRunner;

/// Application entry point.
///
/// Initializes logging, loads configuration, connects to NATS and Postgres,
/// sets up the LLM backend and prompt templates, then runs the job-queue
/// drain loop indefinitely.
///
/// # Errors
///
/// Returns an error if initialization or the main event loop fails.
#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    info!("lf-worker starting");

    let game_config_path = std::env::var("GAME_CONFIG_PATH").unwrap_or_else(|_| "game-config.yaml".to_owned());
    let game = lf_core::config::GameConfig::from_file(&PathBuf::from(&game_config_path))
        .map_err(|err| anyhow::anyhow!("failed to load game config from {game_config_path}: {err}"))?;
    game.validate()
        .map_err(|err| anyhow::anyhow!("invalid game config: {err}"))?;

    let config = WorkerConfig::from_env(game)?;
    info!(
        nats_url = config.nats_url,
        templates_dir = config.templates_dir,
        max_concurrent_jobs = config.max_concurrent_jobs,
        llm_model = config.game.llm.model,
        "configuration loaded"
    );

    let nats = Arc::new(NatsClient::connect(&config.nats_url).await?);

    let pool = PostgresPool::connect_url(&config.database_url).await?;
    let registry = Arc::new(WorkerRegistry::new(pool.pool().clone()));
    info!("connected to job registry");

    let prompts = Arc::new(PromptEngine::new(&config.templates_dir)?);
    info!(templates_dir = config.templates_dir, "prompt templates loaded");

    let backend = Arc::new(create_backend(&config.backend));
    info!(backend = backend.name(), model = config.game.llm.model, "LLM backend configured");

    let runner = Arc::new(JobRunner::new(
        nats,
        registry,
        prompts,
        backend,
        config.game.clone(),
        config.max_concurrent_jobs,
    ));

    info!("entering job queue drain loop");
    runner.run().await?;

    Ok(())
}
