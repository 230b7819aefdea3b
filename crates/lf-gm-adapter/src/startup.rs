//! Startup helper for embedding the GM command boundary server in the
//! session runtime binary.
//!
//! Provides [`spawn_gm_adapter`] which launches the HTTP + `WebSocket`
//! server on a background Tokio task. `lf-engine` calls this once at
//! startup so the GM boundary runs concurrently with every session's turn
//! loop, sharing one [`AppState`] session registry across all of them.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the GM command boundary server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Spawn the GM command boundary HTTP server on a background Tokio task.
///
/// Binds to `0.0.0.0:{port}` and serves the command/status REST API plus
/// the phase-event `WebSocket` feed. Returns a [`JoinHandle`] so the caller
/// can manage the server's lifecycle alongside the session runtime.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the server cannot bind to the
/// requested address. This is detected eagerly before the background task
/// is spawned by performing a parse check on the bind address.
pub async fn spawn_gm_adapter(port: u16, state: Arc<AppState>) -> Result<JoinHandle<()>, StartupError> {
    let config = ServerConfig {
        host: String::from("0.0.0.0"),
        port,
    };

    let addr_str = format!("{}:{}", config.host, config.port);
    let _: std::net::SocketAddr = addr_str
        .parse()
        .map_err(|e| StartupError::Server(ServerError::Bind(format!("invalid address {addr_str}: {e}"))))?;

    let handle = tokio::spawn(async move {
        if let Err(e) = crate::server::start_server(&config, state).await {
            tracing::error!(error = %e, "GM command boundary server exited with error");
        }
    });

    tracing::info!(port, "GM command boundary server spawned on background task");

    Ok(handle)
}
