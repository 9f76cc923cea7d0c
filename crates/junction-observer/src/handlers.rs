//! REST API endpoint handlers for the Observer server.
//!
//! Reads are served from the junction's last published snapshot. The
//! override endpoint is the only write path from the view layer.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/snapshot` | Current junction snapshot |
//! | `GET` | `/api/approaches` | List all approaches |
//! | `GET` | `/api/approaches/{id}` | Single approach |
//! | `POST` | `/api/approaches/{id}/override` | Apply a manual override |
//! | `GET` | `/api/events` | Recent junction events |

use std::fmt::Write as _;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse};
use junction_types::{ApproachId, OverrideCommand};
use tracing::info;

use crate::error::ObserverError;
use crate::state::AppState;

/// Default number of events returned by `GET /api/events`.
const DEFAULT_EVENT_LIMIT: usize = 50;

/// Upper bound on `limit` for `GET /api/events`.
const MAX_EVENT_LIMIT: usize = 256;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for the `GET /api/events` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct EventsQuery {
    /// Maximum number of events to return (default 50, max 256).
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Escape text from configuration for use in HTML element content.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serve a minimal HTML page showing every approach and the API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.junction.snapshot();
    let name = escape_html(state.junction.name());
    let tick = snapshot.tick;
    let sequence = snapshot.sequence;

    let mut rows = String::new();
    for approach in &snapshot.approaches {
        let _ = write!(
            rows,
            r#"
        <div class="metric {phase}">
            <div class="label">{label}</div>
            <div class="value">{phase}</div>
            <div class="label">{remaining}s</div>
        </div>"#,
            label = escape_html(&approach.label),
            phase = approach.phase,
            remaining = approach.remaining,
        );
    }

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>{name}</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ font-size: 1.5rem; font-weight: bold; }}
        .go .value {{ color: #3fb950; }}
        .caution .value {{ color: #d29922; }}
        .stop .value {{ color: #f85149; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>{name}</h1>
    <p class="subtitle">Tick {tick} &middot; snapshot #{sequence}</p>

    <div>{rows}
    </div>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li>GET <a href="/api/snapshot">/api/snapshot</a> -- Current junction snapshot</li>
        <li>GET <a href="/api/approaches">/api/approaches</a> -- List all approaches</li>
        <li>GET /api/approaches/{{id}} -- Single approach</li>
        <li>POST /api/approaches/{{id}}/override -- Adjust timer or force phase</li>
        <li>GET <a href="/api/events">/api/events</a> -- Recent events (?limit=N)</li>
        <li>GET <a href="/api/operator/status">/api/operator/status</a> -- Runner status</li>
    </ul>

    <h2>WebSocket</h2>
    <ul>
        <li><code>ws://host:port/ws/snapshots</code> -- Live snapshot stream</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/snapshot
// ---------------------------------------------------------------------------

/// Return the most recently published junction snapshot.
pub async fn get_snapshot(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.junction.snapshot();
    Ok(Json(serde_json::to_value(snapshot.as_ref())?))
}

// ---------------------------------------------------------------------------
// GET /api/approaches
// ---------------------------------------------------------------------------

/// List every approach in ascending id order.
pub async fn list_approaches(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.junction.snapshot();

    Ok(Json(serde_json::json!({
        "tick": snapshot.tick,
        "count": snapshot.approaches.len(),
        "approaches": snapshot.approaches,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/approaches/{id}
// ---------------------------------------------------------------------------

/// Return a single approach.
pub async fn get_approach(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let id = ApproachId::from(id);
    let snapshot = state.junction.snapshot();

    let approach = snapshot
        .approach(&id)
        .ok_or_else(|| ObserverError::NotFound(format!("approach {id}")))?;

    Ok(Json(serde_json::json!({
        "tick": snapshot.tick,
        "approach": approach,
    })))
}

// ---------------------------------------------------------------------------
// POST /api/approaches/{id}/override
// ---------------------------------------------------------------------------

/// Apply a manual override and return the snapshot it produced.
///
/// The junction is re-validated before this returns, so the response
/// already reflects any conflict resolution the override triggered.
pub async fn override_approach(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(command): Json<OverrideCommand>,
) -> Result<impl IntoResponse, ObserverError> {
    let id = ApproachId::from(id);
    let snapshot = state.junction.apply_override(&id, command)?;

    info!(approach = %id, %command, sequence = snapshot.sequence, "Override accepted via API");

    Ok(Json(serde_json::json!({
        "ok": true,
        "approach": snapshot.approach(&id),
        "snapshot": snapshot.as_ref(),
    })))
}

// ---------------------------------------------------------------------------
// GET /api/events
// ---------------------------------------------------------------------------

/// Return the most recent junction events, oldest first.
///
/// # Query Parameters
///
/// - `limit`: Maximum number of events to return (default 50, max 256).
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventsQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .min(MAX_EVENT_LIMIT);

    let events = state.junction.recent_events(limit);

    Ok(Json(serde_json::json!({
        "count": events.len(),
        "events": events,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<b>"A" & B</b>"#),
            "&lt;b&gt;&quot;A&quot; &amp; B&lt;/b&gt;"
        );
        assert_eq!(escape_html("North"), "North");
    }
}
