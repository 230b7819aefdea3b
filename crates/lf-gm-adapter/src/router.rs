//! Axum router construction for the GM command boundary server.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`] with
//! CORS middleware enabled for cross-origin front-end access -- the actual
//! GM CLI/TUI is an external collaborator (spec.md §1).

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the GM command boundary server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /api/sessions` -- list running session IDs
/// - `GET /api/session/{id}/status` -- parked/phase status
/// - `POST /api/session/{id}/command` -- submit a raw GM command
/// - `GET /ws/session/{id}` -- phase-event stream
///
/// CORS is configured to allow any origin for development. In production
/// this should be restricted to the operator's trusted front-end origin.
#[must_use]
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/api/sessions", get(handlers::list_sessions))
        .route("/api/session/{id}/status", get(handlers::session_status))
        .route("/api/session/{id}/command", post(handlers::submit_command))
        .route("/ws/session/{id}", get(ws::ws_session))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
