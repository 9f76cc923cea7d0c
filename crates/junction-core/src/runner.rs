//! Signal tick loop with operator controls.
//!
//! [`run_junction`] drives [`SharedJunction::advance`] once per tick
//! interval and adds the control plane around it:
//!
//! - **Bounded runs**: stop after `max_ticks` or `max_real_time_seconds`
//! - **Pause/resume**: operator can hold the clock and continue later
//! - **Variable tick speed**: tick interval adjustable at runtime
//! - **Operator stop**: takes effect before the next scheduled tick, even
//!   mid-sleep
//!
//! Overrides arriving from the observer API interleave with ticks through
//! the [`SharedJunction`] lock; the runner never holds that lock across an
//! `.await`.

use std::sync::Arc;
use std::time::Duration;

use junction_types::JunctionSnapshot;
use tracing::{info, warn};

use crate::operator::{OperatorState, RunEndReason};
use crate::scheduler::SchedulerError;
use crate::shared::SharedJunction;

/// Errors that can end the tick loop abnormally.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying scheduler error.
        #[from]
        source: SchedulerError,
    },
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct RunResult {
    /// Why the loop stopped.
    pub end_reason: RunEndReason,
    /// Snapshot published by the last tick this loop ran, if any.
    pub final_snapshot: Option<Arc<JunctionSnapshot>>,
    /// Number of ticks this loop executed.
    pub total_ticks: u64,
}

/// Callback invoked after each tick is published.
pub trait TickCallback: Send {
    /// Called with the snapshot the tick produced.
    fn on_tick(&mut self, snapshot: &JunctionSnapshot);
}

/// A callback that does nothing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _snapshot: &JunctionSnapshot) {}
}

/// Run the tick loop until a termination condition is met.
///
/// # Errors
///
/// Returns [`RunnerError`] if a tick fails (only possible on clock
/// overflow).
pub async fn run_junction(
    junction: &SharedJunction,
    operator: &OperatorState,
    callback: &mut dyn TickCallback,
) -> Result<RunResult, RunnerError> {
    let mut final_snapshot: Option<Arc<JunctionSnapshot>> = None;
    let mut total_ticks: u64 = 0;

    info!(
        junction = junction.name(),
        max_ticks = operator.max_ticks(),
        max_real_time_seconds = operator.max_real_time_seconds(),
        tick_interval_ms = operator.tick_interval_ms(),
        "Junction starting"
    );

    let end_reason = loop {
        if operator.is_paused() {
            info!("Junction paused, waiting for resume...");
            operator.wait_if_paused().await;
            info!("Junction resumed");
        }

        if operator.is_stop_requested() {
            info!("Operator stop requested");
            break RunEndReason::OperatorStop;
        }

        if operator.time_limit_reached() {
            info!(
                max_seconds = operator.max_real_time_seconds(),
                elapsed = operator.elapsed_seconds(),
                "Real-time limit reached"
            );
            break RunEndReason::MaxRealTimeReached;
        }

        let snapshot = junction.advance()?;
        total_ticks = total_ticks.saturating_add(1);
        callback.on_tick(&snapshot);

        let tick = snapshot.tick;
        final_snapshot = Some(snapshot);

        if operator.tick_limit_reached(tick) {
            info!(tick, max_ticks = operator.max_ticks(), "Tick limit reached");
            break RunEndReason::MaxTicksReached;
        }

        let interval_ms = operator.tick_interval_ms();
        if interval_ms > 0 {
            // A stop during the sleep is picked up at the top of the loop.
            operator
                .sleep_unless_stopped(Duration::from_millis(interval_ms))
                .await;
        } else {
            // Let API handlers in on a current-thread runtime.
            tokio::task::yield_now().await;
        }
    };

    operator.set_end_reason(end_reason).await;
    Ok(RunResult {
        end_reason,
        final_snapshot,
        total_ticks,
    })
}

/// Log the end of a run. The observer keeps serving after this.
pub fn log_run_end(result: &RunResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_snapshot.as_ref().map(|s| s.tick),
        "Junction stopped"
    );

    if let Some(ref snapshot) = result.final_snapshot {
        for approach in &snapshot.approaches {
            info!(
                tick = snapshot.tick,
                approach = %approach.id,
                phase = %approach.phase,
                remaining = approach.remaining,
                "Final approach state"
            );
        }
    } else {
        warn!("Junction stopped with no ticks executed");
    }
}
