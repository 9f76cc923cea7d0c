//! Operator control state for the tick loop.
//!
//! Shared between the runner task and the observer API handlers. The
//! operator can pause and resume ticking, change the tick interval and
//! request a clean stop without restarting the process.
//!
//! # Architecture
//!
//! Control flags are atomics so the runner reads them without locks on
//! the hot path. [`Notify`] handles wake the runner when it is paused or
//! sleeping between ticks, so a stop takes effect before the next
//! scheduled tick rather than after it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};

use crate::config::RuntimeConfig;

/// Smallest tick interval the operator may set at runtime.
pub const MIN_TICK_INTERVAL_MS: u64 = 100;

/// Reason why the tick loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEndReason {
    /// Reached the configured `max_ticks` limit.
    MaxTicksReached,
    /// Reached the configured `max_real_time_seconds` limit.
    MaxRealTimeReached,
    /// An operator issued a stop command.
    OperatorStop,
}

/// Shared operator control state.
#[derive(Debug)]
pub struct OperatorState {
    /// Whether ticking is paused.
    paused: AtomicBool,

    /// Wakes the runner when resumed (or stopped while paused).
    resume_notify: Notify,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Wakes the runner's inter-tick sleep on stop.
    stop_notify: Notify,

    /// Current tick interval in milliseconds (runtime-adjustable).
    tick_interval_ms: AtomicU64,

    /// Wall-clock time when the runner started.
    started_at: DateTime<Utc>,

    /// Maximum number of ticks (0 = unlimited).
    max_ticks: u64,

    /// Maximum wall-clock seconds (0 = unlimited).
    max_real_time_seconds: u64,

    /// Reason the run ended, if it has.
    end_reason: Mutex<Option<RunEndReason>>,
}

impl OperatorState {
    /// Create operator state from runtime configuration.
    ///
    /// The configured interval is taken as-is (0 means "no sleep", which
    /// tests and batch simulations use); the runtime minimum only applies
    /// to [`set_tick_interval_ms`](Self::set_tick_interval_ms).
    pub fn new(runtime: &RuntimeConfig) -> Self {
        Self {
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
            stop_requested: AtomicBool::new(false),
            stop_notify: Notify::new(),
            tick_interval_ms: AtomicU64::new(runtime.tick_interval_ms),
            started_at: Utc::now(),
            max_ticks: runtime.max_ticks,
            max_real_time_seconds: runtime.max_real_time_seconds,
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Check whether ticking is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause ticking. The runner sleeps until resumed or stopped.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume ticking and wake the runner.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Wait until ticking is no longer paused or a stop is requested.
    pub async fn wait_if_paused(&self) {
        while self.is_paused() && !self.is_stop_requested() {
            self.resume_notify.notified().await;
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean stop. Takes effect before the next tick.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.stop_notify.notify_waiters();
        self.resume_notify.notify_one();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Sleep for `duration`, returning early if a stop is requested.
    ///
    /// Returns `true` if the sleep was cut short by a stop request.
    pub async fn sleep_unless_stopped(&self, duration: Duration) -> bool {
        let notified = self.stop_notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent request_stop
        // cannot slip between the check and the wait.
        notified.as_mut().enable();
        if self.is_stop_requested() {
            return true;
        }
        tokio::select! {
            () = tokio::time::sleep(duration) => false,
            () = notified => true,
        }
    }

    /// Wait until a stop is requested.
    pub async fn wait_for_stop(&self) {
        loop {
            let notified = self.stop_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_stop_requested() {
                return;
            }
            notified.await;
        }
    }

    /// Record the reason the run ended.
    pub async fn set_end_reason(&self, reason: RunEndReason) {
        let mut guard = self.end_reason.lock().await;
        *guard = Some(reason);
    }

    /// Get the reason the run ended, if it has.
    pub async fn end_reason(&self) -> Option<RunEndReason> {
        *self.end_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Tick Speed
    // -----------------------------------------------------------------------

    /// Get the current tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Acquire)
    }

    /// Set the tick interval in milliseconds. Must be at least
    /// [`MIN_TICK_INTERVAL_MS`].
    ///
    /// Returns the previous interval on success, or `None` if the value
    /// was rejected.
    pub fn set_tick_interval_ms(&self, ms: u64) -> Option<u64> {
        if ms < MIN_TICK_INTERVAL_MS {
            return None;
        }
        let prev = self.tick_interval_ms.swap(ms, Ordering::AcqRel);
        Some(prev)
    }

    // -----------------------------------------------------------------------
    // Boundaries
    // -----------------------------------------------------------------------

    /// Returns `true` if `max_ticks > 0` and `current_tick >= max_ticks`.
    pub const fn tick_limit_reached(&self, current_tick: u64) -> bool {
        self.max_ticks > 0 && current_tick >= self.max_ticks
    }

    /// Returns `true` if `max_real_time_seconds > 0` and that many seconds
    /// have elapsed since start.
    pub fn time_limit_reached(&self) -> bool {
        self.max_real_time_seconds > 0 && self.elapsed_seconds() >= self.max_real_time_seconds
    }

    /// Return the wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Return elapsed seconds since start.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        // `num_seconds` can be negative if the wall clock jumps back.
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    /// Get the configured max ticks.
    pub const fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Get the configured max real-time seconds.
    pub const fn max_real_time_seconds(&self) -> u64 {
        self.max_real_time_seconds
    }
}

/// JSON-serializable runner status for the operator API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JunctionStatus {
    /// Junction display name.
    pub junction: String,
    /// Current tick number.
    pub tick: u64,
    /// Snapshot publication counter.
    pub sequence: u64,
    /// Whether ticking is paused.
    pub paused: bool,
    /// Whether a stop has been requested.
    pub stop_requested: bool,
    /// Current tick interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Elapsed wall-clock seconds since start.
    pub elapsed_seconds: u64,
    /// Configured maximum ticks (0 = unlimited).
    pub max_ticks: u64,
    /// Configured maximum real-time seconds (0 = unlimited).
    pub max_real_time_seconds: u64,
    /// Number of approaches currently green.
    pub approaches_green: u64,
    /// Total approaches at the junction.
    pub approaches_total: u64,
    /// Conflicts resolved in the event log window.
    pub recent_conflicts: u64,
    /// The reason the run ended, if applicable.
    pub end_reason: Option<RunEndReason>,
    /// RFC 3339 timestamp of when the runner started.
    pub started_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime(max_ticks: u64) -> RuntimeConfig {
        RuntimeConfig {
            tick_interval_ms: 1000,
            max_ticks,
            max_real_time_seconds: 0,
        }
    }

    #[test]
    fn initial_state_is_running() {
        let state = OperatorState::new(&runtime(0));
        assert!(!state.is_paused());
        assert!(!state.is_stop_requested());
    }

    #[test]
    fn pause_and_resume() {
        let state = OperatorState::new(&runtime(0));
        state.pause();
        assert!(state.is_paused());
        state.resume();
        assert!(!state.is_paused());
    }

    #[test]
    fn set_tick_interval() {
        let state = OperatorState::new(&runtime(0));
        assert_eq!(state.set_tick_interval_ms(5_000), Some(1000));
        assert_eq!(state.tick_interval_ms(), 5_000);
    }

    #[test]
    fn reject_sub_minimum_interval() {
        let state = OperatorState::new(&runtime(0));
        assert!(state.set_tick_interval_ms(50).is_none());
        assert_eq!(state.tick_interval_ms(), 1000);
    }

    #[test]
    fn tick_limit_zero_means_unlimited() {
        let state = OperatorState::new(&runtime(0));
        assert!(!state.tick_limit_reached(999_999));
        assert!(!state.time_limit_reached());
    }

    #[test]
    fn tick_limit_reached() {
        let state = OperatorState::new(&runtime(100));
        assert!(!state.tick_limit_reached(99));
        assert!(state.tick_limit_reached(100));
    }

    #[tokio::test]
    async fn stop_interrupts_sleep() {
        let state = std::sync::Arc::new(OperatorState::new(&runtime(0)));
        let sleeper = std::sync::Arc::clone(&state);
        let handle = tokio::spawn(async move {
            sleeper
                .sleep_unless_stopped(Duration::from_secs(60))
                .await
        });
        tokio::task::yield_now().await;
        state.request_stop();
        let interrupted = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(matches!(interrupted, Ok(Ok(true))));
    }

    #[tokio::test]
    async fn sleep_after_stop_returns_immediately() {
        let state = OperatorState::new(&runtime(0));
        state.request_stop();
        assert!(state.sleep_unless_stopped(Duration::from_secs(60)).await);
    }

    #[tokio::test]
    async fn stop_wakes_paused_runner() {
        let state = std::sync::Arc::new(OperatorState::new(&runtime(0)));
        state.pause();
        let waiter = std::sync::Arc::clone(&state);
        let handle = tokio::spawn(async move { waiter.wait_if_paused().await });
        tokio::task::yield_now().await;
        state.request_stop();
        let woke = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(woke.is_ok());
    }

    #[tokio::test]
    async fn wait_for_stop_returns_after_request() {
        let state = std::sync::Arc::new(OperatorState::new(&runtime(0)));
        let waiter = std::sync::Arc::clone(&state);
        let handle = tokio::spawn(async move { waiter.wait_for_stop().await });
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());
        state.request_stop();
        let done = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(done.is_ok());
    }

    #[tokio::test]
    async fn end_reason_is_recorded() {
        let state = OperatorState::new(&runtime(0));
        assert_eq!(state.end_reason().await, None);
        state.set_end_reason(RunEndReason::OperatorStop).await;
        assert_eq!(state.end_reason().await, Some(RunEndReason::OperatorStop));
    }
}
