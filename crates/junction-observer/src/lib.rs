//! Observer API server for the junction signal scheduler.
//!
//! This crate is the view-adapter boundary. It provides an Axum HTTP
//! server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/snapshots`) pushing every published
//!   [`JunctionSnapshot`] to connected dashboards
//! - **REST endpoints** for the current snapshot, individual approaches
//!   and the recent event feed
//! - **Override endpoint** (`POST /api/approaches/{id}/override`) for
//!   manual timer nudges and forced phase changes
//! - **Operator REST endpoints** for runtime control (pause, resume,
//!   speed, status, stop)
//! - **Minimal HTML status page** (`GET /`)
//!
//! # Architecture
//!
//! Reads come straight from the junction's published snapshot, so the
//! observer never blocks the tick loop. Overrides go through
//! [`SharedJunction::apply_override`], which validates the junction and
//! publishes before the HTTP response is written.
//!
//! [`JunctionSnapshot`]: junction_types::JunctionSnapshot
//! [`SharedJunction::apply_override`]: junction_core::shared::SharedJunction::apply_override

pub mod error;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
