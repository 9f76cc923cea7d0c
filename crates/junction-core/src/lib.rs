//! Signal clock, approach controllers, conflict arbitration and the tick
//! loop for a single signalized junction.
//!
//! # Modules
//!
//! - [`clock`] -- Monotonic junction clock (one tick is one signal second).
//! - [`config`] -- Configuration loading from `junction-config.yaml` into
//!   strongly-typed structs.
//! - [`controller`] -- Per-approach phase and countdown state machine.
//! - [`conflict`] -- Conflict matrix, priority order and the resolver that
//!   holds conflicting greens at stop.
//! - [`scheduler`] -- [`JunctionScheduler`] and [`init_junction`]: ticks all
//!   controllers, applies overrides and publishes validated snapshots.
//! - [`shared`] -- Thread-safe scheduler handle with lock-free snapshot
//!   reads.
//! - [`operator`] -- Pause, resume, speed and stop controls.
//! - [`runner`] -- The async tick loop.
//!
//! [`JunctionScheduler`]: scheduler::JunctionScheduler
//! [`init_junction`]: scheduler::init_junction

pub mod clock;
pub mod config;
pub mod conflict;
pub mod controller;
pub mod operator;
pub mod runner;
pub mod scheduler;
pub mod shared;
