//! Junction scheduler: owns every approach controller and keeps the joint
//! signal state safe.
//!
//! Each call to [`JunctionScheduler::advance`] runs one tick:
//!
//! 1. **Clock** -- advance the junction clock.
//! 2. **Tick** -- tick every controller in ascending approach id order.
//! 3. **Validate** -- check every `go` approach against the conflict
//!    matrix and hold offenders at `stop` (see [`crate::conflict`]).
//! 4. **Publish** -- build an immutable [`JunctionSnapshot`].
//!
//! [`JunctionScheduler::override_approach`] applies a manual command to a
//! single controller and then runs the same validate and publish steps
//! before returning. Nothing outside the scheduler can reach a controller,
//! so every published snapshot has passed validation.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use junction_types::{
    ApproachId, ConflictResolution, EventId, JunctionEvent, JunctionEventKind, JunctionSnapshot,
    OverrideCommand, Phase,
};
use tracing::{debug, info, warn};

use crate::clock::{ClockError, JunctionClock};
use crate::config::{ConfigError, JunctionConfig};
use crate::conflict::{self, ConflictError, ConflictMatrix, GreenClaim, PriorityOrder};
use crate::controller::{ApproachController, ControllerError, PhaseDurations};

/// Maximum number of events kept in the in-memory event log.
pub const EVENT_LOG_CAPACITY: usize = 256;

/// Errors returned by scheduler operations. None of them leave the
/// scheduler in an invalid state.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The command references an approach that does not exist.
    #[error("unknown approach: {0}")]
    UnknownApproach(ApproachId),

    /// A forced phase would skip or reverse a step of the cycle.
    #[error(transparent)]
    InvalidTransition(#[from] ControllerError),

    /// The junction clock cannot advance further.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },
}

/// Errors raised by [`init_junction`].
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// The junction has no approaches.
    #[error("junction must have at least one approach")]
    NoApproaches,

    /// An approach id is empty.
    #[error("approach ids must not be blank")]
    BlankApproachId,

    /// An approach id contains uppercase characters.
    #[error("approach id must be lowercase: {0}")]
    UppercaseApproachId(ApproachId),

    /// Two approaches share an id.
    #[error("duplicate approach id: {0}")]
    DuplicateApproach(ApproachId),

    /// An initial countdown is zero.
    #[error("approach {0}: initial_remaining must be at least 1")]
    ZeroInitialRemaining(ApproachId),

    /// Conflict matrix or priority order is malformed.
    #[error("conflict configuration: {0}")]
    Conflict(#[from] ConflictError),

    /// Phase timings are out of range.
    #[error("timing configuration: {0}")]
    Timing(#[from] ConfigError),
}

/// Owner of all approach controllers at a single junction.
#[derive(Debug)]
pub struct JunctionScheduler {
    name: String,
    clock: JunctionClock,
    /// Keyed by id, so iteration is ascending id order.
    controllers: BTreeMap<ApproachId, ApproachController>,
    matrix: ConflictMatrix,
    priority: PriorityOrder,
    hold_secs: u32,
    sequence: u64,
    published: Arc<JunctionSnapshot>,
    events: VecDeque<JunctionEvent>,
}

/// Build a scheduler from configuration.
///
/// The initial state is validated against the conflict matrix before the
/// first snapshot (sequence 0, tick 0) is published. Approaches that start
/// in conflicting `go` phases are resolved by priority.
///
/// # Errors
///
/// Returns [`InitError`] if the configuration is structurally invalid.
pub fn init_junction(config: &JunctionConfig) -> Result<JunctionScheduler, InitError> {
    let timing = config.timing;
    timing.validate()?;

    if config.approaches.is_empty() {
        return Err(InitError::NoApproaches);
    }

    let mut controllers = BTreeMap::new();
    for approach in &config.approaches {
        if approach.id.is_blank() {
            return Err(InitError::BlankApproachId);
        }
        if !approach.id.is_lowercase() {
            return Err(InitError::UppercaseApproachId(approach.id.clone()));
        }
        if approach.initial_remaining == 0 {
            return Err(InitError::ZeroInitialRemaining(approach.id.clone()));
        }
        if approach.initial_remaining > timing.max_remaining_secs {
            warn!(
                approach = %approach.id,
                initial_remaining = approach.initial_remaining,
                max = timing.max_remaining_secs,
                "Initial remaining above ceiling, clamped"
            );
        }
        let controller = ApproachController::new(
            approach.id.clone(),
            approach.display_label(),
            approach.initial_phase,
            approach.initial_remaining,
            PhaseDurations::resolve(&timing, approach.go_secs, approach.stop_secs),
            timing.max_remaining_secs,
        );
        if controllers.insert(approach.id.clone(), controller).is_some() {
            return Err(InitError::DuplicateApproach(approach.id.clone()));
        }
    }

    let ids: BTreeSet<ApproachId> = controllers.keys().cloned().collect();
    let matrix = ConflictMatrix::new(&ids, &config.conflicts)?;
    let priority = PriorityOrder::new(&ids, &config.priority)?;

    let mut scheduler = JunctionScheduler {
        name: config.name.clone(),
        clock: JunctionClock::new(),
        controllers,
        matrix,
        priority,
        hold_secs: timing.hold_secs,
        sequence: 0,
        published: Arc::new(empty_snapshot()),
        events: VecDeque::with_capacity(EVENT_LOG_CAPACITY),
    };

    // Nothing is incumbent before the first snapshot.
    let conflicts = scheduler.validate(&BTreeSet::new());
    scheduler.published = Arc::new(scheduler.build_snapshot(conflicts));

    info!(
        junction = scheduler.name,
        approaches = scheduler.controllers.len(),
        conflict_pairs = scheduler.matrix.len(),
        "Junction initialized"
    );

    Ok(scheduler)
}

impl JunctionScheduler {
    /// Run one tick and publish the resulting snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Clock`] if the tick counter overflows. The
    /// controllers are not touched in that case.
    pub fn advance(&mut self) -> Result<Arc<JunctionSnapshot>, SchedulerError> {
        let tick = self.clock.advance()?;
        let incumbents = self.green_approaches();

        for controller in self.controllers.values_mut() {
            if let Some(transition) = controller.tick() {
                debug!(
                    tick,
                    approach = %controller.id(),
                    from = %transition.from,
                    to = %transition.to,
                    "approach transitioned"
                );
            }
        }

        let conflicts = self.validate(&incumbents);
        Ok(self.publish(conflicts))
    }

    /// Apply a manual command to one approach, re-validate the junction and
    /// publish the resulting snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::UnknownApproach`] if `id` does not exist,
    /// or [`SchedulerError::InvalidTransition`] if a forced phase is not the
    /// next step of the cycle. State is unchanged on error.
    pub fn override_approach(
        &mut self,
        id: &ApproachId,
        command: OverrideCommand,
    ) -> Result<Arc<JunctionSnapshot>, SchedulerError> {
        let incumbents = self.green_approaches();
        let controller = self
            .controllers
            .get_mut(id)
            .ok_or_else(|| SchedulerError::UnknownApproach(id.clone()))?;

        match command {
            OverrideCommand::AdjustTimer(delta) => {
                controller.apply_manual_delta(delta);
            }
            OverrideCommand::ForcePhase(phase) => {
                controller.force_phase(phase)?;
            }
        }

        info!(
            tick = self.clock.tick(),
            approach = %id,
            %command,
            remaining = controller.remaining(),
            phase = %controller.phase(),
            "Override applied"
        );
        self.record(JunctionEventKind::OverrideApplied {
            approach: id.clone(),
            command,
        });

        let conflicts = self.validate(&incumbents);
        Ok(self.publish(conflicts))
    }

    /// The most recently published snapshot. Pure: repeated calls without
    /// an intervening `advance` or `override_approach` return the same
    /// snapshot.
    pub fn snapshot(&self) -> Arc<JunctionSnapshot> {
        Arc::clone(&self.published)
    }

    /// The most recent events, oldest first, at most `limit` of them.
    pub fn recent_events(&self, limit: usize) -> Vec<JunctionEvent> {
        let skip = self.events.len().saturating_sub(limit);
        self.events.iter().skip(skip).cloned().collect()
    }

    /// Junction display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current clock tick.
    pub const fn tick(&self) -> u64 {
        self.clock.tick()
    }

    /// Approach ids in tick order.
    pub fn approach_ids(&self) -> impl Iterator<Item = &ApproachId> {
        self.controllers.keys()
    }

    /// The conflict matrix in force.
    pub const fn conflict_matrix(&self) -> &ConflictMatrix {
        &self.matrix
    }

    /// The priority order in force.
    pub const fn priority(&self) -> &PriorityOrder {
        &self.priority
    }

    // -----------------------------------------------------------------------
    // Validation and publication
    // -----------------------------------------------------------------------

    fn green_approaches(&self) -> BTreeSet<ApproachId> {
        self.controllers
            .values()
            .filter(|c| c.phase() == Phase::Go)
            .map(|c| c.id().clone())
            .collect()
    }

    /// Hold every approach that violates the matrix and log each hold.
    fn validate(&mut self, incumbents: &BTreeSet<ApproachId>) -> Vec<ConflictResolution> {
        let claims: Vec<GreenClaim<'_>> = self
            .controllers
            .values()
            .filter(|c| c.phase() == Phase::Go)
            .map(|c| GreenClaim {
                id: c.id(),
                incumbent: incumbents.contains(c.id()),
            })
            .collect();
        let resolutions = conflict::resolve_green_conflicts(&claims, &self.matrix, &self.priority);

        for resolution in &resolutions {
            if let Some(controller) = self.controllers.get_mut(&resolution.held) {
                controller.hold_at_stop(self.hold_secs);
            }
            warn!(
                tick = self.clock.tick(),
                held = %resolution.held,
                against = %resolution.against,
                hold_secs = self.hold_secs,
                "ConflictResolved: approach held at stop"
            );
            self.record(JunctionEventKind::ConflictResolved {
                held: resolution.held.clone(),
                against: resolution.against.clone(),
            });
        }

        resolutions
    }

    fn publish(&mut self, conflicts: Vec<ConflictResolution>) -> Arc<JunctionSnapshot> {
        self.sequence = self.sequence.saturating_add(1);
        self.published = Arc::new(self.build_snapshot(conflicts));
        Arc::clone(&self.published)
    }

    fn build_snapshot(&self, conflicts: Vec<ConflictResolution>) -> JunctionSnapshot {
        JunctionSnapshot {
            sequence: self.sequence,
            tick: self.clock.tick(),
            taken_at: Utc::now(),
            approaches: self.controllers.values().map(|c| c.state().clone()).collect(),
            conflicts,
        }
    }

    fn record(&mut self, kind: JunctionEventKind) {
        if self.events.len() >= EVENT_LOG_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(JunctionEvent {
            id: EventId::new(),
            tick: self.clock.tick(),
            kind,
            created_at: Utc::now(),
        });
    }
}

fn empty_snapshot() -> JunctionSnapshot {
    JunctionSnapshot {
        sequence: 0,
        tick: 0,
        taken_at: Utc::now(),
        approaches: Vec::new(),
        conflicts: Vec::new(),
    }
}
