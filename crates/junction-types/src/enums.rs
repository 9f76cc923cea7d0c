//! Enumeration types for the junction signal model.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Signal phase
// ---------------------------------------------------------------------------

/// The indication currently shown by one approach's signal.
///
/// Phases rotate in a fixed cycle with no terminal state:
///
/// ```text
/// Stop -> Go -> Caution -> Stop -> ...
/// ```
///
/// `Caution` is only reachable from `Go` and always leads to `Stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Phase {
    /// Traffic must stop (red).
    Stop,
    /// Traffic must prepare to stop (amber).
    Caution,
    /// Traffic may proceed (green).
    Go,
}

impl Phase {
    /// All phases in cycle order, starting from `Stop`.
    pub const CYCLE: [Self; 3] = [Self::Stop, Self::Go, Self::Caution];

    /// The phase that follows this one in the signal cycle.
    pub const fn next(self) -> Self {
        match self {
            Self::Stop => Self::Go,
            Self::Go => Self::Caution,
            Self::Caution => Self::Stop,
        }
    }

    /// Whether `target` is reachable from this phase in exactly one step.
    ///
    /// A phase is never reachable from itself: forcing `Go` while already
    /// `Go` is not a transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == target
    }

    /// Lowercase display name (`stop`, `caution`, `go`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Caution => "caution",
            Self::Go => "go",
        }
    }
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_rotates_stop_go_caution() {
        assert_eq!(Phase::Stop.next(), Phase::Go);
        assert_eq!(Phase::Go.next(), Phase::Caution);
        assert_eq!(Phase::Caution.next(), Phase::Stop);
    }

    #[test]
    fn caution_never_returns_to_go() {
        assert!(!Phase::Caution.can_transition_to(Phase::Go));
        assert!(Phase::Caution.can_transition_to(Phase::Stop));
    }

    #[test]
    fn no_phase_transitions_to_itself() {
        for phase in Phase::CYCLE {
            assert!(!phase.can_transition_to(phase));
        }
    }

    #[test]
    fn caution_only_reachable_from_go() {
        let sources: Vec<Phase> = Phase::CYCLE
            .into_iter()
            .filter(|p| p.can_transition_to(Phase::Caution))
            .collect();
        assert_eq!(sources, vec![Phase::Go]);
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&Phase::Caution).ok();
        assert_eq!(json.as_deref(), Some("\"caution\""));
    }
}
