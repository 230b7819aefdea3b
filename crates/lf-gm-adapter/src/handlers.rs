//! REST endpoint handlers for the GM command boundary server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/sessions` | List currently running session IDs |
//! | `GET` | `/api/session/:id/status` | Parked/phase status for one session |
//! | `POST` | `/api/session/:id/command` | Submit a raw GM command (spec.md §6.1) |

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse};
use axum::Json;
use tracing::info;
use uuid::Uuid;

use lf_core::gm_command::{self, GmCommand};

use crate::error::GmAdapterError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page listing currently running sessions.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let sessions = state.session_ids().await;

    let rows = sessions
        .iter()
        .map(|id| format!("<li><code>{id}</code></li>"))
        .collect::<Vec<_>>()
        .join("\n");

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>GM Command Boundary</title>
    <style>
        body {{ font-family: monospace; padding: 2rem; max-width: 700px; margin: 0 auto; }}
        h1 {{ margin-bottom: 0.25rem; }}
        code {{ background: #eee; padding: 0.1rem 0.3rem; }}
    </style>
</head>
<body>
    <h1>GM Command Boundary</h1>
    <p>Running sessions: {count}</p>
    <ul>{rows}</ul>
    <h2>API</h2>
    <ul>
        <li><code>GET /api/session/:id/status</code></li>
        <li><code>POST /api/session/:id/command</code> -- body is a raw GM command line</li>
        <li><code>GET /ws/session/:id</code> -- phase-event stream</li>
    </ul>
</body>
</html>"#,
        count = sessions.len(),
    ))
}

// ---------------------------------------------------------------------------
// GET /api/sessions
// ---------------------------------------------------------------------------

/// List currently running session IDs.
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let sessions = state.session_ids().await;
    Json(serde_json::json!({ "sessions": sessions }))
}

// ---------------------------------------------------------------------------
// GET /api/session/:id/status
// ---------------------------------------------------------------------------

/// Report whether a session is parked at a GM interrupt point and, if so,
/// which phase and which commands it currently accepts.
pub async fn session_status(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, GmAdapterError> {
    let handle = state
        .get(session_id)
        .await
        .ok_or(GmAdapterError::SessionNotFound(session_id))?;

    let parked_at = handle.control.parked_at().await;
    let acceptable = parked_at.map_or_else(
        || vec!["ask", "end_session", "abort_turn"],
        GmCommand::acceptable_at,
    );

    Ok(Json(serde_json::json!({
        "session_id": session_id,
        "parked": handle.control.is_parked(),
        "parked_at": parked_at.map(|p| format!("{p:?}")),
        "acceptable_commands": acceptable,
    })))
}

// ---------------------------------------------------------------------------
// POST /api/session/:id/command
// ---------------------------------------------------------------------------

/// Submit one raw GM command line against a running session (spec.md §6.1).
///
/// `ask` is out-of-band and never advances state; `end_session` and
/// `abort_turn` set a sticky flag the turn loop checks between phases, no
/// matter what the machine is doing. Every other command requires the
/// machine to be parked at its matching interrupt phase.
pub async fn submit_command(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    body: String,
) -> Result<impl IntoResponse, GmAdapterError> {
    let handle = state
        .get(session_id)
        .await
        .ok_or(GmAdapterError::SessionNotFound(session_id))?;

    let command = gm_command::parse(&body)?;
    let name = command.name();

    match command {
        GmCommand::EndSession => {
            handle.control.request_end_session();
        }
        GmCommand::AbortTurn => {
            handle.control.request_abort();
        }
        GmCommand::Ask { character, text } => {
            info!(%session_id, %character, text, "GM ask command received (out-of-band, no state change)");
        }
        other => {
            let current = handle
                .control
                .parked_at()
                .await
                .ok_or(GmAdapterError::NotParked(session_id))?;
            other.check_admissible(current)?;
            handle.control.submit(other).await;
        }
    }

    Ok(Json(serde_json::json!({
        "session_id": session_id,
        "accepted": name,
    })))
}
