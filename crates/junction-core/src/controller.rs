//! Per-approach signal controller.
//!
//! An [`ApproachController`] owns one approach's phase and countdown. It
//! has no visibility into other approaches: the scheduler ticks it, feeds
//! it manual overrides, and overrules it when a conflict has to be
//! cleared.
//!
//! Countdown invariant: after any [`tick`](ApproachController::tick) or
//! [`apply_manual_delta`](ApproachController::apply_manual_delta),
//! `remaining` is at least 1. When the countdown runs out, the phase
//! advances within the same tick and the countdown restarts from the new
//! phase's duration.

use junction_types::{ApproachId, ApproachState, Phase};
use tracing::debug;

use crate::config::PhaseTimings;

/// Errors returned by controller operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    /// The requested phase is not the one-step successor of the current one.
    #[error("approach {approach}: cannot force {from} -> {to}")]
    InvalidTransition {
        /// The approach that rejected the command.
        approach: ApproachId,
        /// Phase at the time of the request.
        from: Phase,
        /// Phase that was requested.
        to: Phase,
    },
}

/// Resolved phase durations for one approach, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseDurations {
    /// Duration of `go`.
    pub go: u32,
    /// Duration of `caution`.
    pub caution: u32,
    /// Duration of `stop`.
    pub stop: u32,
}

impl PhaseDurations {
    /// Junction-wide durations with optional per-approach overrides.
    pub fn resolve(timings: &PhaseTimings, go: Option<u32>, stop: Option<u32>) -> Self {
        Self {
            go: go.unwrap_or(timings.go_secs),
            caution: timings.caution_secs,
            stop: stop.unwrap_or(timings.stop_secs),
        }
    }

    /// Countdown assigned on entering `phase`. Never below 1.
    pub fn for_phase(&self, phase: Phase) -> u32 {
        let secs = match phase {
            Phase::Go => self.go,
            Phase::Caution => self.caution,
            Phase::Stop => self.stop,
        };
        secs.max(1)
    }
}

/// A phase change performed by [`ApproachController::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Phase before the change.
    pub from: Phase,
    /// Phase after the change.
    pub to: Phase,
}

/// Timer and phase state machine for one approach.
#[derive(Debug, Clone)]
pub struct ApproachController {
    state: ApproachState,
    durations: PhaseDurations,
    max_remaining: u32,
}

impl ApproachController {
    /// Create a controller. The starting countdown is clamped into
    /// `1..=max_remaining`.
    pub fn new(
        id: ApproachId,
        label: String,
        phase: Phase,
        remaining: u32,
        durations: PhaseDurations,
        max_remaining: u32,
    ) -> Self {
        let max_remaining = max_remaining.max(1);
        Self {
            state: ApproachState {
                id,
                label,
                phase,
                remaining: remaining.clamp(1, max_remaining),
            },
            durations,
            max_remaining,
        }
    }

    /// The approach identifier.
    pub const fn id(&self) -> &ApproachId {
        &self.state.id
    }

    /// Current phase.
    pub const fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Seconds until the next automatic phase change.
    pub const fn remaining(&self) -> u32 {
        self.state.remaining
    }

    /// Borrow the full approach state.
    pub const fn state(&self) -> &ApproachState {
        &self.state
    }

    /// The durations this controller cycles through.
    pub const fn durations(&self) -> &PhaseDurations {
        &self.durations
    }

    /// Advance the countdown by one second.
    ///
    /// When the countdown reaches zero the phase advances
    /// (`go -> caution -> stop -> go`) and the countdown restarts from the
    /// new phase's duration. Returns the transition, if one happened.
    pub fn tick(&mut self) -> Option<Transition> {
        self.state.remaining = self.state.remaining.saturating_sub(1);
        if self.state.remaining > 0 {
            return None;
        }

        let from = self.state.phase;
        let to = from.next();
        self.enter(to);
        debug!(
            approach = %self.state.id,
            %from,
            %to,
            remaining = self.state.remaining,
            "phase advanced"
        );
        Some(Transition { from, to })
    }

    /// Shift the countdown by `delta` seconds.
    ///
    /// The result is clamped into `1..=max_remaining`: a manual nudge can
    /// never leave a light due for change without transitioning at the
    /// next tick, and can never starve the other approaches indefinitely.
    pub fn apply_manual_delta(&mut self, delta: i32) -> &ApproachState {
        let target = i64::from(self.state.remaining).saturating_add(i64::from(delta));
        let clamped = target.clamp(1, i64::from(self.max_remaining));
        self.state.remaining = u32::try_from(clamped).unwrap_or(self.max_remaining);
        &self.state
    }

    /// Move directly to `phase`, which must be the next phase in the cycle.
    ///
    /// The countdown restarts from the new phase's duration.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidTransition`] if `phase` would skip
    /// or reverse a step (e.g. `go -> go`, `go -> stop`, `caution -> go`).
    /// The controller is left unchanged.
    pub fn force_phase(&mut self, phase: Phase) -> Result<&ApproachState, ControllerError> {
        if !self.state.phase.can_transition_to(phase) {
            return Err(ControllerError::InvalidTransition {
                approach: self.state.id.clone(),
                from: self.state.phase,
                to: phase,
            });
        }
        self.enter(phase);
        Ok(&self.state)
    }

    /// Put the approach back to `stop` with a short countdown.
    ///
    /// Only the scheduler calls this, and only on an approach that entered
    /// `go` during the current validation pass and was never published in
    /// `go`.
    pub(crate) fn hold_at_stop(&mut self, hold_secs: u32) {
        self.state.phase = Phase::Stop;
        self.state.remaining = hold_secs.clamp(1, self.max_remaining);
    }

    fn enter(&mut self, phase: Phase) {
        self.state.phase = phase;
        self.state.remaining = self.durations.for_phase(phase).min(self.max_remaining);
    }
}
