//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::operator;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/snapshots` -- `WebSocket` snapshot stream
/// - `GET /api/snapshot` -- current junction snapshot
/// - `GET /api/approaches` -- list approaches
/// - `GET /api/approaches/{id}` -- single approach
/// - `POST /api/approaches/{id}/override` -- manual override
/// - `GET /api/events` -- recent junction events
/// - `/api/operator/*` -- pause, resume, speed, status, stop
///
/// CORS allows any origin so a dashboard served elsewhere can connect.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/snapshots", get(ws::ws_snapshots))
        // REST API
        .route("/api/snapshot", get(handlers::get_snapshot))
        .route("/api/approaches", get(handlers::list_approaches))
        .route("/api/approaches/{id}", get(handlers::get_approach))
        .route(
            "/api/approaches/{id}/override",
            post(handlers::override_approach),
        )
        .route("/api/events", get(handlers::list_events))
        // Operator controls
        .route("/api/operator/pause", post(operator::pause))
        .route("/api/operator/resume", post(operator::resume))
        .route("/api/operator/speed", post(operator::set_speed))
        .route("/api/operator/status", get(operator::status))
        .route("/api/operator/stop", post(operator::stop))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
