//! Integration tests for the GM command boundary API.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic and routing
//! without needing a live network connection.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use lf_core::session_control::SessionControl;
use lf_core::gm_command::GmCommand;
use lf_events::Event;
use lf_gm_adapter::router::build_router;
use lf_gm_adapter::state::AppState;
use lf_types::Phase;

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn index_returns_html() {
    let state = Arc::new(AppState::new());
    let router = build_router(state);

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/html"));
}

#[tokio::test]
async fn list_sessions_reflects_registry() {
    let state = Arc::new(AppState::new());
    let session_id = Uuid::now_v7();
    state
        .register(session_id, Arc::new(SessionControl::new()))
        .await;

    let router = build_router(Arc::clone(&state));
    let response = router
        .oneshot(Request::get("/api/sessions").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["sessions"][0], session_id.to_string());
}

#[tokio::test]
async fn status_for_unknown_session_is_404() {
    let state = Arc::new(AppState::new());
    let router = build_router(state);

    let path = format!("/api/session/{}/status", Uuid::now_v7());
    let response = router
        .oneshot(Request::get(&path).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_reports_parked_phase_and_acceptable_commands() {
    let state = Arc::new(AppState::new());
    let session_id = Uuid::now_v7();
    let control = Arc::new(SessionControl::new());
    control.park(Phase::DmAdjudication).await;
    state.register(session_id, Arc::clone(&control)).await;

    let router = build_router(Arc::clone(&state));
    let path = format!("/api/session/{session_id}/status");
    let response = router
        .oneshot(Request::get(&path).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["parked"], true);
    let acceptable = json["acceptable_commands"].as_array().unwrap();
    assert!(acceptable.iter().any(|v| v == "accept"));
    assert!(acceptable.iter().any(|v| v == "override"));
}

#[tokio::test]
async fn submit_command_rejects_unknown_session() {
    let state = Arc::new(AppState::new());
    let router = build_router(state);

    let path = format!("/api/session/{}/command", Uuid::now_v7());
    let response = router
        .oneshot(
            Request::post(&path)
                .header("content-type", "text/plain")
                .body(Body::from("accept"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn submit_command_rejects_inadmissible_phase() {
    let state = Arc::new(AppState::new());
    let session_id = Uuid::now_v7();
    let control = Arc::new(SessionControl::new());
    control.park(Phase::DmNarration).await;
    state.register(session_id, Arc::clone(&control)).await;

    let router = build_router(Arc::clone(&state));
    let path = format!("/api/session/{session_id}/command");
    let response = router
        .oneshot(
            Request::post(&path)
                .header("content-type", "text/plain")
                .body(Body::from("accept"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_to_json(response.into_body()).await;
    assert!(json["acceptable"]
        .as_array()
        .unwrap()
        .iter()
        .any(|v| v == "narrate"));
}

#[tokio::test]
async fn submit_command_rejects_unparseable_input() {
    let state = Arc::new(AppState::new());
    let session_id = Uuid::now_v7();
    state
        .register(session_id, Arc::new(SessionControl::new()))
        .await;

    let router = build_router(Arc::clone(&state));
    let path = format!("/api/session/{session_id}/command");
    let response = router
        .oneshot(
            Request::post(&path)
                .header("content-type", "text/plain")
                .body(Body::from("frobnicate"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn submit_command_delivers_admissible_command_to_session_control() {
    let state = Arc::new(AppState::new());
    let session_id = Uuid::now_v7();
    let control = Arc::new(SessionControl::new());
    control.park(Phase::DmAdjudication).await;
    state.register(session_id, Arc::clone(&control)).await;

    let router = build_router(Arc::clone(&state));
    let path = format!("/api/session/{session_id}/command");
    let response = router
        .oneshot(
            Request::post(&path)
                .header("content-type", "text/plain")
                .body(Body::from("accept"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["accepted"], "accept");

    let received = control.wait_for_command().await;
    assert!(matches!(received, GmCommand::Accept));
}

#[tokio::test]
async fn submit_command_end_session_is_admissible_everywhere() {
    let state = Arc::new(AppState::new());
    let session_id = Uuid::now_v7();
    let control = Arc::new(SessionControl::new());
    control.park(Phase::DmNarration).await;
    state.register(session_id, Arc::clone(&control)).await;

    let router = build_router(Arc::clone(&state));
    let path = format!("/api/session/{session_id}/command");
    let response = router
        .oneshot(
            Request::post(&path)
                .header("content-type", "text/plain")
                .body(Body::from("end_session"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(control.is_end_requested());
}

#[tokio::test]
async fn submit_command_ask_is_out_of_band_and_does_not_unpark() {
    let state = Arc::new(AppState::new());
    let session_id = Uuid::now_v7();
    let control = Arc::new(SessionControl::new());
    control.park(Phase::DmNarration).await;
    state.register(session_id, Arc::clone(&control)).await;

    let router = build_router(Arc::clone(&state));
    let path = format!("/api/session/{session_id}/command");
    let response = router
        .oneshot(
            Request::post(&path)
                .header("content-type", "text/plain")
                .body(Body::from("ask char_zara_7 what do you see"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(control.is_parked());
    assert_eq!(control.parked_at().await, Some(Phase::DmNarration));
}

#[tokio::test]
async fn nonexistent_route_returns_404() {
    let state = Arc::new(AppState::new());
    let router = build_router(state);

    let response = router
        .oneshot(
            Request::get("/api/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn websocket_route_exists_for_registered_session() {
    // Full WebSocket handshake testing requires a live TCP server; here we
    // confirm the route is wired and returns a non-404 response to a plain
    // GET (the upgrade handshake itself is exercised only over a real
    // connection, which is out of scope for a oneshot router test).
    let state = Arc::new(AppState::new());
    let session_id = Uuid::now_v7();
    state
        .register(session_id, Arc::new(SessionControl::new()))
        .await;

    let router = build_router(state);
    let path = format!("/ws/session/{session_id}");
    let response = router
        .oneshot(Request::get(&path).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_ne!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn event_serializes_for_ws_feed() {
    let event = Event::PhaseTransitioned {
        from: Phase::DmNarration,
        to: Phase::MemoryRetrieval,
        turn_number: 1,
    };
    let json = serde_json::to_string(&event).expect("serialize");
    assert!(json.contains("phase_transitioned"));
}
