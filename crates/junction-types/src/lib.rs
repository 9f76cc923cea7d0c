//! Shared type definitions for the junction signal scheduler.
//!
//! This crate is the single source of truth for the values that cross
//! crate boundaries: the core scheduler produces them, the observer API
//! serves them, and the dashboard consumes the `TypeScript` bindings that
//! `ts-rs` generates from them.
//!
//! # Modules
//!
//! - [`ids`] -- Approach and event identifiers
//! - [`enums`] -- The signal [`Phase`] cycle
//! - [`commands`] -- Manual [`OverrideCommand`]s from the view layer
//! - [`structs`] -- Approach state, snapshots and events

pub mod commands;
pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use commands::OverrideCommand;
pub use enums::Phase;
pub use ids::{ApproachId, EventId};
pub use structs::{
    ApproachState, ConflictResolution, JunctionEvent, JunctionEventKind, JunctionSnapshot,
};
