//! `WebSocket` handler for the phase-event live feed (SPEC_FULL.md
//! supplement: `GET /ws/session/{id}`, generalizing the teacher's
//! tick-broadcast `GET /ws/ticks` from "tick" to "phase").
//!
//! Clients connect to `GET /ws/session/{id}` and receive a JSON-encoded
//! [`lf_events::Event`] each time the turn machine publishes one for that
//! session. If a client falls behind, lagged events are silently skipped
//! and the client resumes from the most recent one.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin streaming
/// a session's phase events.
///
/// # Route
///
/// `GET /ws/session/{id}`
pub async fn ws_session(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state, session_id))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>, session_id: Uuid) {
    let Some(handle) = state.get(session_id).await else {
        debug!(%session_id, "WebSocket client requested an unknown session");
        let _ = socket
            .send(Message::Close(None))
            .await;
        return;
    };

    debug!(%session_id, "WebSocket client connected");
    let mut rx = handle.events.subscribe();

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(e) => {
                                warn!("failed to serialize phase event: {e}");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            debug!(%session_id, "WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        debug!(%session_id, skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!(%session_id, "session event channel closed, ending WebSocket");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%session_id, "WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(%session_id, "WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(%session_id, "WebSocket error: {e}");
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}
