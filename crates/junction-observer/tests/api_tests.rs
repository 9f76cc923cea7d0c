//! Integration tests for the Observer API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. Every test builds the default junction:
//! north STOP 45, south GO 30, east CAUTION 5, west STOP 20, with
//! north/south conflicting with east/west.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use junction_core::config::{JunctionConfig, RuntimeConfig};
use junction_core::operator::OperatorState;
use junction_core::scheduler::init_junction;
use junction_core::shared::SharedJunction;
use junction_observer::router::build_router;
use junction_observer::state::AppState;
use serde_json::Value;
use tower::ServiceExt;

fn make_junction() -> Arc<SharedJunction> {
    Arc::new(SharedJunction::new(
        init_junction(&JunctionConfig::default()).unwrap(),
    ))
}

fn make_test_state() -> Arc<AppState> {
    Arc::new(AppState::new(make_junction()))
}

fn make_operator_state() -> (Arc<AppState>, Arc<OperatorState>) {
    let operator = Arc::new(OperatorState::new(&RuntimeConfig::default()));
    let state = Arc::new(AppState::with_operator(make_junction(), Arc::clone(&operator)));
    (state, operator)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(path: &str) -> Request<Body> {
    Request::get(path).body(Body::empty()).unwrap()
}

fn post_json(path: &str, body: &str) -> Request<Body> {
    Request::post(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

fn post_empty(path: &str) -> Request<Body> {
    Request::post(path).body(Body::empty()).unwrap()
}

// =========================================================================
// Read endpoints
// =========================================================================

#[tokio::test]
async fn test_index_returns_html() {
    let router = build_router(make_test_state());

    let response = router.oneshot(get("/")).await.unwrap();

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
async fn test_index_escapes_config_labels() {
    let mut config = JunctionConfig::default();
    config.name = "Main & 1st".to_owned();
    for approach in &mut config.approaches {
        approach.label = Some("<script>alert(1)</script>".to_owned());
    }
    let junction = Arc::new(SharedJunction::new(init_junction(&config).unwrap()));
    let router = build_router(Arc::new(AppState::new(junction)));

    let response = router.oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(html.contains("Main &amp; 1st"));
}

#[tokio::test]
async fn test_get_snapshot() {
    let router = build_router(make_test_state());

    let response = router.oneshot(get("/api/snapshot")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["tick"], 0);
    assert_eq!(json["sequence"], 0);
    let ids: Vec<&str> = json["approaches"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["east", "north", "south", "west"]);
}

#[tokio::test]
async fn test_list_approaches() {
    let router = build_router(make_test_state());

    let response = router.oneshot(get("/api/approaches")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 4);
}

#[tokio::test]
async fn test_get_approach_by_id() {
    let router = build_router(make_test_state());

    let response = router.oneshot(get("/api/approaches/north")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["approach"]["label"], "North");
    assert_eq!(json["approach"]["phase"], "stop");
    assert_eq!(json["approach"]["remaining"], 45);
}

#[tokio::test]
async fn test_get_approach_not_found() {
    let router = build_router(make_test_state());

    let response = router.oneshot(get("/api/approaches/up")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_snapshot_tracks_ticks() {
    let state = make_test_state();
    state.junction.advance().unwrap();
    state.junction.advance().unwrap();
    let router = build_router(state);

    let response = router.oneshot(get("/api/approaches/west")).await.unwrap();

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["tick"], 2);
    assert_eq!(json["approach"]["remaining"], 18);
}

// =========================================================================
// Overrides
// =========================================================================

#[tokio::test]
async fn test_override_adjust_timer() {
    let state = make_test_state();
    let router = build_router(Arc::clone(&state));

    let response = router
        .oneshot(post_json(
            "/api/approaches/north/override",
            r#"{"adjust_timer": 5}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["approach"]["remaining"], 50);
    assert_eq!(json["snapshot"]["sequence"], 1);
    assert_eq!(json["snapshot"]["tick"], 0);
    assert_eq!(state.junction.snapshot().sequence, 1);
}

#[tokio::test]
async fn test_override_adjust_timer_clamps_at_one() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(post_json(
            "/api/approaches/west/override",
            r#"{"adjust_timer": -500}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["approach"]["remaining"], 1);
}

#[tokio::test]
async fn test_override_force_next_phase() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(post_json(
            "/api/approaches/south/override",
            r#"{"force_phase": "caution"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["approach"]["phase"], "caution");
}

#[tokio::test]
async fn test_override_invalid_transition_is_conflict() {
    let state = make_test_state();
    let router = build_router(Arc::clone(&state));

    let response = router
        .oneshot(post_json(
            "/api/approaches/south/override",
            r#"{"force_phase": "stop"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    // Rejected overrides publish nothing.
    assert_eq!(state.junction.snapshot().sequence, 0);
}

#[tokio::test]
async fn test_override_unknown_approach_is_not_found() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(post_json(
            "/api/approaches/up/override",
            r#"{"adjust_timer": 5}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_override_malformed_body_is_rejected() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(post_json(
            "/api/approaches/north/override",
            r#"{"reboot": true}"#,
        ))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_forced_conflicting_green_is_held() {
    let state = make_test_state();
    let router = build_router(Arc::clone(&state));

    // South is already green and conflicts with west.
    let response = router
        .oneshot(post_json(
            "/api/approaches/west/override",
            r#"{"force_phase": "go"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["approach"]["phase"], "stop");
    assert_eq!(json["approach"]["remaining"], 1);
    assert_eq!(json["snapshot"]["conflicts"][0]["held"], "west");
    assert_eq!(json["snapshot"]["conflicts"][0]["against"], "south");

    let router = build_router(state);
    let response = router.oneshot(get("/api/events")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 2);
    assert_eq!(json["events"][0]["kind"]["type"], "override_applied");
    assert_eq!(json["events"][1]["kind"]["type"], "conflict_resolved");
    assert_eq!(json["events"][1]["kind"]["held"], "west");
}

// =========================================================================
// Events
// =========================================================================

#[tokio::test]
async fn test_list_events_empty() {
    let router = build_router(make_test_state());

    let response = router.oneshot(get("/api/events")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 0);
}

#[tokio::test]
async fn test_list_events_limit() {
    let state = make_test_state();
    for delta in [1, 2, 3] {
        state
            .junction
            .apply_override(
                &junction_types::ApproachId::from("north"),
                junction_types::OverrideCommand::AdjustTimer(delta),
            )
            .unwrap();
    }
    let router = build_router(state);

    let response = router.oneshot(get("/api/events?limit=2")).await.unwrap();

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 2);
    assert_eq!(json["events"][1]["kind"]["command"]["adjust_timer"], 3);
}

// =========================================================================
// Operator
// =========================================================================

#[tokio::test]
async fn test_operator_unavailable_without_runner() {
    let router = build_router(make_test_state());

    let response = router.oneshot(post_empty("/api/operator/pause")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_operator_pause_and_resume() {
    let (state, operator) = make_operator_state();

    let response = build_router(Arc::clone(&state))
        .oneshot(post_empty("/api/operator/pause"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(operator.is_paused());

    let response = build_router(state)
        .oneshot(post_empty("/api/operator/resume"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!operator.is_paused());
}

#[tokio::test]
async fn test_operator_speed() {
    let (state, operator) = make_operator_state();

    let response = build_router(Arc::clone(&state))
        .oneshot(post_json("/api/operator/speed", r#"{"tick_interval_ms": 500}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["previous_interval_ms"], 1000);
    assert_eq!(operator.tick_interval_ms(), 500);

    let response = build_router(state)
        .oneshot(post_json("/api/operator/speed", r#"{"tick_interval_ms": 50}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(operator.tick_interval_ms(), 500);
}

#[tokio::test]
async fn test_operator_status() {
    let (state, _operator) = make_operator_state();
    state.junction.advance().unwrap();

    let response = build_router(state)
        .oneshot(get("/api/operator/status"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["tick"], 1);
    assert_eq!(json["paused"], false);
    assert_eq!(json["approaches_total"], 4);
    assert_eq!(json["approaches_green"], 1);
    assert!(json["end_reason"].is_null());
}

#[tokio::test]
async fn test_operator_stop() {
    let (state, operator) = make_operator_state();

    let response = build_router(state)
        .oneshot(post_empty("/api/operator/stop"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(operator.is_stop_requested());
}

#[tokio::test]
async fn test_nonexistent_route_returns_404() {
    let router = build_router(make_test_state());

    let response = router.oneshot(get("/api/nonexistent")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
