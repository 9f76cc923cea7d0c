//! Core value structs: approach state, junction snapshots and events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::commands::OverrideCommand;
use crate::enums::Phase;
use crate::ids::{ApproachId, EventId};

// ---------------------------------------------------------------------------
// Approach state
// ---------------------------------------------------------------------------

/// Point-in-time state of one approach's signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ApproachState {
    /// Approach identifier.
    pub id: ApproachId,
    /// Human-readable display name (e.g. "North").
    pub label: String,
    /// Current signal indication.
    pub phase: Phase,
    /// Seconds until the next automatic phase change. Always at least 1
    /// in a published snapshot.
    pub remaining: u32,
}

// ---------------------------------------------------------------------------
// Conflict resolution
// ---------------------------------------------------------------------------

/// Record of the scheduler holding one approach at stop to clear a
/// conflicting green.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ConflictResolution {
    /// The approach that was held at stop.
    pub held: ApproachId,
    /// The approach it conflicted with, which kept its green.
    pub against: ApproachId,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Immutable view of every approach at the junction.
///
/// A new snapshot is published after each tick and after each accepted
/// override. Consumers never observe a partially updated junction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct JunctionSnapshot {
    /// Publication counter. Increments on every tick and every override.
    pub sequence: u64,
    /// Tick number of the clock at publication time.
    pub tick: u64,
    /// Wall-clock time at which the snapshot was taken.
    pub taken_at: DateTime<Utc>,
    /// All approaches, in ascending id order.
    pub approaches: Vec<ApproachState>,
    /// Conflicts resolved by the pass that produced this snapshot.
    pub conflicts: Vec<ConflictResolution>,
}

impl JunctionSnapshot {
    /// Look up one approach by id.
    pub fn approach(&self, id: &ApproachId) -> Option<&ApproachState> {
        self.approaches.iter().find(|a| &a.id == id)
    }

    /// Ids of every approach currently showing `Go`.
    pub fn go_approaches(&self) -> Vec<&ApproachId> {
        self.approaches
            .iter()
            .filter(|a| a.phase == Phase::Go)
            .map(|a| &a.id)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// What happened in a [`JunctionEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum JunctionEventKind {
    /// The scheduler held an approach at stop to clear a conflict.
    ConflictResolved {
        /// The approach that was held at stop.
        held: ApproachId,
        /// The approach that kept its green.
        against: ApproachId,
    },
    /// An operator override was accepted.
    OverrideApplied {
        /// The approach the override targeted.
        approach: ApproachId,
        /// The command that was applied.
        command: OverrideCommand,
    },
}

/// An entry in the scheduler's in-memory event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct JunctionEvent {
    /// Unique event identifier.
    pub id: EventId,
    /// Clock tick at which the event occurred.
    pub tick: u64,
    /// Event payload.
    pub kind: JunctionEventKind,
    /// Wall-clock time the event was recorded.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approach(id: &str, phase: Phase, remaining: u32) -> ApproachState {
        ApproachState {
            id: ApproachId::from(id),
            label: id.to_uppercase(),
            phase,
            remaining,
        }
    }

    #[test]
    fn snapshot_lookup_and_go_filter() {
        let snapshot = JunctionSnapshot {
            sequence: 3,
            tick: 3,
            taken_at: Utc::now(),
            approaches: vec![
                approach("east", Phase::Stop, 10),
                approach("north", Phase::Go, 20),
                approach("south", Phase::Go, 20),
            ],
            conflicts: Vec::new(),
        };

        let north = snapshot.approach(&ApproachId::from("north"));
        assert_eq!(north.map(|a| a.phase), Some(Phase::Go));
        assert!(snapshot.approach(&ApproachId::from("west")).is_none());

        let go: Vec<&str> = snapshot
            .go_approaches()
            .into_iter()
            .map(ApproachId::as_str)
            .collect();
        assert_eq!(go, ["north", "south"]);
    }

    #[test]
    fn event_kind_is_internally_tagged() {
        let kind = JunctionEventKind::ConflictResolved {
            held: ApproachId::from("east"),
            against: ApproachId::from("north"),
        };
        let json = serde_json::to_value(&kind).unwrap_or_default();
        assert_eq!(json["type"], "conflict_resolved");
        assert_eq!(json["held"], "east");
    }
}
