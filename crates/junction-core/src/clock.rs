//! Junction clock.
//!
//! The clock is a monotonic tick counter and the single source of truth
//! for signal time. One tick is one signal second: every approach
//! countdown is expressed in ticks.
//!
//! The clock knows nothing about wall-clock cadence. The runner decides
//! how much real time passes between ticks (and the operator can change
//! it at runtime); tests and simulations advance the clock as fast as
//! they like. Either way the signal model sees the same discrete steps.

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,
}

/// Monotonic tick source for the junction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JunctionClock {
    /// Current tick number (0 before the first tick).
    tick: u64,
}

impl JunctionClock {
    /// Create a clock at tick 0.
    pub const fn new() -> Self {
        Self { tick: 0 }
    }

    /// Create a clock at an explicit tick (useful for tests).
    pub const fn at(tick: u64) -> Self {
        Self { tick }
    }

    /// Advance the clock by one tick. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the tick counter would exceed
    /// `u64::MAX`.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        Ok(self.tick)
    }

    /// Return the current tick number.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Signal seconds elapsed since the junction started.
    pub const fn elapsed_signal_seconds(&self) -> u64 {
        self.tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_at_tick_zero() {
        let clock = JunctionClock::new();
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.elapsed_signal_seconds(), 0);
    }

    #[test]
    fn clock_advances_monotonically() {
        let mut clock = JunctionClock::new();
        assert_eq!(clock.advance().ok(), Some(1));
        assert_eq!(clock.advance().ok(), Some(2));
        assert_eq!(clock.tick(), 2);
    }

    #[test]
    fn clock_reports_overflow() {
        let mut clock = JunctionClock::at(u64::MAX);
        assert!(matches!(clock.advance(), Err(ClockError::TickOverflow)));
        assert_eq!(clock.tick(), u64::MAX);
    }
}
