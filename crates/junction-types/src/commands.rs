//! Manual override commands issued by the view layer.
//!
//! Commands travel from the dashboard through the observer API to the
//! scheduler. On the wire they are externally tagged:
//!
//! ```json
//! { "adjust_timer": -5 }
//! { "force_phase": "caution" }
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::Phase;

/// A manual override applied to a single approach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum OverrideCommand {
    /// Add `delta` seconds to the approach's countdown (negative shortens it).
    /// The result is clamped so the countdown never reaches zero.
    AdjustTimer(i32),
    /// Move the approach to the given phase. Only the one-step successor of
    /// the current phase is accepted.
    ForcePhase(Phase),
}

impl core::fmt::Display for OverrideCommand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdjustTimer(delta) => write!(f, "adjust_timer({delta:+})"),
            Self::ForcePhase(phase) => write!(f, "force_phase({phase})"),
        }
    }
}
