//! Operator REST API handlers for runtime control of the tick loop.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/operator/pause` | Pause the tick loop |
//! | `POST` | `/api/operator/resume` | Resume the tick loop |
//! | `POST` | `/api/operator/speed` | Set tick interval (ms) |
//! | `GET` | `/api/operator/status` | Current runner status |
//! | `POST` | `/api/operator/stop` | Stop the tick loop |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use junction_core::operator::{JunctionStatus, MIN_TICK_INTERVAL_MS, OperatorState};
use junction_types::JunctionEventKind;
use tracing::info;

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/operator/speed`.
#[derive(Debug, serde::Deserialize)]
pub struct SetSpeedRequest {
    /// New tick interval in milliseconds (minimum 100).
    pub tick_interval_ms: u64,
}

/// Generic success response.
#[derive(Debug, serde::Serialize)]
struct OperatorResponse {
    ok: bool,
    message: String,
}

fn operator(state: &AppState) -> Result<&Arc<OperatorState>, ObserverError> {
    state
        .operator_state
        .as_ref()
        .ok_or_else(|| ObserverError::Internal("operator state not available".to_owned()))
}

// ---------------------------------------------------------------------------
// POST /api/operator/pause
// ---------------------------------------------------------------------------

/// Pause the tick loop. Signals hold their current phase and countdown;
/// overrides are still accepted while paused.
pub async fn pause(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.pause();
    info!("Operator paused the junction");

    Ok(Json(OperatorResponse {
        ok: true,
        message: "Junction paused".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/operator/resume
// ---------------------------------------------------------------------------

/// Resume the tick loop after a pause.
pub async fn resume(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.resume();
    info!("Operator resumed the junction");

    Ok(Json(OperatorResponse {
        ok: true,
        message: "Junction resumed".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/operator/speed
// ---------------------------------------------------------------------------

/// Change the tick interval at runtime. Takes effect from the next sleep.
pub async fn set_speed(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetSpeedRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let prev = operator(&state)?
        .set_tick_interval_ms(body.tick_interval_ms)
        .ok_or_else(|| {
            ObserverError::InvalidQuery(format!(
                "tick_interval_ms must be at least {MIN_TICK_INTERVAL_MS}"
            ))
        })?;

    info!(previous_ms = prev, new_ms = body.tick_interval_ms, "Tick interval changed");

    Ok(Json(serde_json::json!({
        "ok": true,
        "message": format!("Tick interval changed from {}ms to {}ms", prev, body.tick_interval_ms),
        "previous_interval_ms": prev,
        "new_interval_ms": body.tick_interval_ms,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/operator/status
// ---------------------------------------------------------------------------

/// Return runner status: tick, pause state, speed and signal counts.
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let operator = operator(&state)?;
    let snapshot = state.junction.snapshot();

    let approaches_green = u64::try_from(snapshot.go_approaches().len()).unwrap_or(u64::MAX);
    let approaches_total = u64::try_from(snapshot.approaches.len()).unwrap_or(u64::MAX);
    let recent_conflicts = state
        .junction
        .recent_events(usize::MAX)
        .iter()
        .filter(|e| matches!(e.kind, JunctionEventKind::ConflictResolved { .. }))
        .count();

    let status = JunctionStatus {
        junction: state.junction.name().to_owned(),
        tick: snapshot.tick,
        sequence: snapshot.sequence,
        paused: operator.is_paused(),
        stop_requested: operator.is_stop_requested(),
        tick_interval_ms: operator.tick_interval_ms(),
        elapsed_seconds: operator.elapsed_seconds(),
        max_ticks: operator.max_ticks(),
        max_real_time_seconds: operator.max_real_time_seconds(),
        approaches_green,
        approaches_total,
        recent_conflicts: u64::try_from(recent_conflicts).unwrap_or(u64::MAX),
        end_reason: operator.end_reason().await,
        started_at: operator.started_at().to_rfc3339(),
    };

    Ok(Json(status))
}

// ---------------------------------------------------------------------------
// POST /api/operator/stop
// ---------------------------------------------------------------------------

/// Stop the tick loop before its next tick. The HTTP server keeps
/// running so the final state can still be inspected.
pub async fn stop(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ObserverError> {
    operator(&state)?.request_stop();
    info!("Operator requested stop");

    Ok(Json(OperatorResponse {
        ok: true,
        message: "Stop requested -- junction will stop before the next tick".to_owned(),
    }))
}
