//! Error types for the GM command boundary server.
//!
//! [`GmAdapterError`] unifies all failure modes into a single enum that
//! converts into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation, so a GM
//! front-end always gets a structured rejection (spec.md §7) rather than a
//! bare 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use lf_core::gm_command::{AdmissibilityError, ParseError};

/// Errors that can occur in the GM command boundary layer.
#[derive(Debug, thiserror::Error)]
pub enum GmAdapterError {
    /// No session with this ID is currently registered.
    #[error("session {0} is not running")]
    SessionNotFound(Uuid),

    /// The command requires the machine to be parked at a GM interrupt
    /// point, but it is not currently parked.
    #[error("session {0} is not awaiting a GM command")]
    NotParked(Uuid),

    /// The raw command text did not match any recognized form.
    #[error("command parse error: {0}")]
    Parse(#[from] ParseError),

    /// The command was well-formed but not admissible at the session's
    /// current phase.
    #[error(transparent)]
    Admissibility(#[from] AdmissibilityError),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for GmAdapterError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::SessionNotFound(id) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({"error": self.to_string(), "session_id": id}),
            ),
            Self::NotParked(id) => (
                StatusCode::CONFLICT,
                serde_json::json!({"error": self.to_string(), "session_id": id}),
            ),
            Self::Parse(err) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({"error": err.to_string()}),
            ),
            Self::Admissibility(err) => (
                StatusCode::CONFLICT,
                serde_json::json!({
                    "error": err.to_string(),
                    "current_phase": format!("{:?}", err.current),
                    "acceptable": err.acceptable,
                }),
            ),
            Self::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({"error": msg}),
            ),
        };

        (status, Json(body)).into_response()
    }
}
