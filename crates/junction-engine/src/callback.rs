//! Tick callback that logs signal changes.
//!
//! The scheduler logs conflicts and overrides itself; this callback adds
//! an `info` line whenever an approach shows a different phase than it
//! did at the previous tick, which is what an operator tailing the log
//! wants to see.

use std::collections::BTreeMap;

use junction_core::runner::TickCallback;
use junction_types::{ApproachId, JunctionSnapshot, Phase};
use tracing::{debug, info};

/// Ticks between periodic debug summaries.
const SUMMARY_EVERY_TICKS: u64 = 60;

/// Logs every phase change seen between consecutive ticks.
pub struct TransitionLogger {
    phases: BTreeMap<ApproachId, Phase>,
    transitions: u64,
    conflicts: u64,
}

impl TransitionLogger {
    /// Start from the phases in `initial`.
    pub fn new(initial: &JunctionSnapshot) -> Self {
        Self {
            phases: initial
                .approaches
                .iter()
                .map(|a| (a.id.clone(), a.phase))
                .collect(),
            transitions: 0,
            conflicts: 0,
        }
    }

    /// Phase changes logged so far.
    pub const fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Conflicts resolved by the ticks seen so far.
    pub const fn conflicts(&self) -> u64 {
        self.conflicts
    }
}

impl TickCallback for TransitionLogger {
    fn on_tick(&mut self, snapshot: &JunctionSnapshot) {
        for approach in &snapshot.approaches {
            let previous = self.phases.insert(approach.id.clone(), approach.phase);
            if let Some(from) = previous
                && from != approach.phase
            {
                self.transitions = self.transitions.saturating_add(1);
                info!(
                    tick = snapshot.tick,
                    approach = %approach.id,
                    %from,
                    to = %approach.phase,
                    remaining = approach.remaining,
                    "Signal changed"
                );
            }
        }

        let resolved = u64::try_from(snapshot.conflicts.len()).unwrap_or(u64::MAX);
        self.conflicts = self.conflicts.saturating_add(resolved);

        if snapshot.tick.checked_rem(SUMMARY_EVERY_TICKS) == Some(0) {
            debug!(
                tick = snapshot.tick,
                green = ?snapshot.go_approaches(),
                transitions = self.transitions,
                conflicts = self.conflicts,
                "Junction summary"
            );
        }
    }
}
