//! Configuration loading and typed config structures for the junction.
//!
//! The canonical configuration lives in `junction-config.yaml` next to the
//! engine binary. This module defines strongly-typed structs that mirror the
//! YAML structure and a loader that reads the file. Every field has a
//! default, so an empty file (or no file at all) yields the four-approach
//! junction the dashboard was built around.
//!
//! Structural checks on the junction (unique ids, conflict pairs, priority
//! order) happen in [`init_junction`](crate::scheduler::init_junction);
//! this module only checks phase timing bounds.

use std::path::Path;

use junction_types::{ApproachId, Phase};
use serde::Deserialize;
use tracing::warn;

/// Inclusive bounds for configurable `go` and `stop` durations, in seconds.
pub const MAIN_PHASE_BOUNDS: (u32, u32) = (15, 75);

/// Inclusive bounds for the `caution` duration, in seconds.
pub const CAUTION_BOUNDS: (u32, u32) = (3, 5);

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is outside its allowed range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
///
/// Mirrors the structure of `junction-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Junction layout: approaches, conflicts, priority and phase timing.
    #[serde(default)]
    pub junction: JunctionConfig,

    /// Tick cadence and run bounds.
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Observer API server settings.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables are not consulted here; call
    /// [`apply_env_overrides`](Self::apply_env_overrides) once logging is
    /// up so rejected values are reported.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if phase timings are out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if phase timings are out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yml yields an error for an empty document; treat it as
        // "all defaults".
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        config.junction.timing.validate()?;
        for approach in &config.junction.approaches {
            approach.validate_overrides()?;
        }
        Ok(config)
    }

    /// Override selected values with environment variables when set:
    /// - `JUNCTION_OBSERVER_PORT` overrides `observer.port`
    /// - `JUNCTION_TICK_INTERVAL_MS` overrides `runtime.tick_interval_ms`
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("JUNCTION_OBSERVER_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.observer.port = port,
                Err(e) => warn!(value = %val, error = %e, "ignoring JUNCTION_OBSERVER_PORT"),
            }
        }
        if let Ok(val) = std::env::var("JUNCTION_TICK_INTERVAL_MS") {
            match val.parse::<u64>() {
                Ok(ms) => self.runtime.tick_interval_ms = ms,
                Err(e) => warn!(value = %val, error = %e, "ignoring JUNCTION_TICK_INTERVAL_MS"),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Junction layout
// ---------------------------------------------------------------------------

/// Everything needed to initialize a junction scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JunctionConfig {
    /// Human-readable junction name.
    #[serde(default = "default_junction_name")]
    pub name: String,

    /// Approaches with their starting phase and countdown.
    #[serde(default = "default_approaches")]
    pub approaches: Vec<ApproachConfig>,

    /// Pairs of approaches that must never show `go` at the same time.
    #[serde(default = "default_conflicts")]
    pub conflicts: Vec<(ApproachId, ApproachId)>,

    /// Approach ids from highest to lowest priority. Must list every
    /// approach exactly once.
    #[serde(default = "default_priority")]
    pub priority: Vec<ApproachId>,

    /// Phase duration policy.
    #[serde(default)]
    pub timing: PhaseTimings,
}

impl Default for JunctionConfig {
    fn default() -> Self {
        Self {
            name: default_junction_name(),
            approaches: default_approaches(),
            conflicts: default_conflicts(),
            priority: default_priority(),
            timing: PhaseTimings::default(),
        }
    }
}

/// Initial configuration for one approach.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApproachConfig {
    /// Unique approach identifier.
    pub id: ApproachId,
    /// Display name. Defaults to the id.
    #[serde(default)]
    pub label: Option<String>,
    /// Phase shown at startup.
    #[serde(default = "default_initial_phase")]
    pub initial_phase: Phase,
    /// Countdown at startup, in seconds.
    #[serde(default = "default_initial_remaining")]
    pub initial_remaining: u32,
    /// Per-approach `go` duration, overriding [`PhaseTimings::go_secs`].
    #[serde(default)]
    pub go_secs: Option<u32>,
    /// Per-approach `stop` duration, overriding [`PhaseTimings::stop_secs`].
    #[serde(default)]
    pub stop_secs: Option<u32>,
}

impl ApproachConfig {
    /// Convenience constructor with no duration overrides.
    pub fn new(id: &str, label: &str, initial_phase: Phase, initial_remaining: u32) -> Self {
        Self {
            id: ApproachId::from(id),
            label: Some(label.to_owned()),
            initial_phase,
            initial_remaining,
            go_secs: None,
            stop_secs: None,
        }
    }

    /// Display label, falling back to the id.
    pub fn display_label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.id.as_str().to_owned())
    }

    fn validate_overrides(&self) -> Result<(), ConfigError> {
        if let Some(go) = self.go_secs {
            check_range(&format!("approach {} go_secs", self.id), go, MAIN_PHASE_BOUNDS)?;
        }
        if let Some(stop) = self.stop_secs {
            check_range(&format!("approach {} stop_secs", self.id), stop, MAIN_PHASE_BOUNDS)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Phase timing policy
// ---------------------------------------------------------------------------

/// Deterministic phase duration policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PhaseTimings {
    /// Seconds an approach stays in `go` (15..=75).
    #[serde(default = "default_go_secs")]
    pub go_secs: u32,

    /// Seconds an approach stays in `caution` (3..=5).
    #[serde(default = "default_caution_secs")]
    pub caution_secs: u32,

    /// Seconds an approach stays in `stop` (15..=75).
    #[serde(default = "default_stop_secs")]
    pub stop_secs: u32,

    /// Ceiling for manual timer adjustments, in seconds.
    #[serde(default = "default_max_remaining_secs")]
    pub max_remaining_secs: u32,

    /// Countdown given to an approach held at `stop` by conflict
    /// resolution before it retries `go`.
    #[serde(default = "default_hold_secs")]
    pub hold_secs: u32,
}

impl Default for PhaseTimings {
    fn default() -> Self {
        Self {
            go_secs: default_go_secs(),
            caution_secs: default_caution_secs(),
            stop_secs: default_stop_secs(),
            max_remaining_secs: default_max_remaining_secs(),
            hold_secs: default_hold_secs(),
        }
    }
}

impl PhaseTimings {
    /// Check every duration against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("go_secs", self.go_secs, MAIN_PHASE_BOUNDS)?;
        check_range("stop_secs", self.stop_secs, MAIN_PHASE_BOUNDS)?;
        check_range("caution_secs", self.caution_secs, CAUTION_BOUNDS)?;
        check_range(
            "max_remaining_secs",
            self.max_remaining_secs,
            (MAIN_PHASE_BOUNDS.1, u32::MAX),
        )?;
        check_range("hold_secs", self.hold_secs, (1, self.max_remaining_secs))?;
        Ok(())
    }
}

fn check_range(field: &str, value: u32, (min, max): (u32, u32)) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid {
            reason: format!("{field} = {value} is outside {min}..={max}"),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Runtime, observer and logging
// ---------------------------------------------------------------------------

/// Tick cadence and run bounds.
///
/// A value of 0 for either bound means unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuntimeConfig {
    /// Real-time milliseconds between ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Stop after this many ticks (0 = run until stopped).
    #[serde(default)]
    pub max_ticks: u64,

    /// Stop after this many wall-clock seconds (0 = run until stopped).
    #[serde(default)]
    pub max_real_time_seconds: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: 0,
            max_real_time_seconds: 0,
        }
    }
}

/// Observer API server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Address to bind.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter (trace, debug, info, warn, error). `RUST_LOG`
    /// takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_junction_name() -> String {
    "4-Lane Junction".to_owned()
}

fn default_approaches() -> Vec<ApproachConfig> {
    vec![
        ApproachConfig::new("north", "North", Phase::Stop, 45),
        ApproachConfig::new("south", "South", Phase::Go, 30),
        ApproachConfig::new("east", "East", Phase::Caution, 5),
        ApproachConfig::new("west", "West", Phase::Stop, 20),
    ]
}

fn default_conflicts() -> Vec<(ApproachId, ApproachId)> {
    let mut pairs = Vec::new();
    for main in ["north", "south"] {
        for cross in ["east", "west"] {
            pairs.push((ApproachId::from(main), ApproachId::from(cross)));
        }
    }
    pairs
}

fn default_priority() -> Vec<ApproachId> {
    ["north", "south", "east", "west"]
        .into_iter()
        .map(ApproachId::from)
        .collect()
}

const fn default_initial_phase() -> Phase {
    Phase::Stop
}

const fn default_initial_remaining() -> u32 {
    30
}

const fn default_go_secs() -> u32 {
    30
}

const fn default_caution_secs() -> u32 {
    4
}

const fn default_stop_secs() -> u32 {
    30
}

const fn default_max_remaining_secs() -> u32 {
    120
}

const fn default_hold_secs() -> u32 {
    1
}

const fn default_tick_interval_ms() -> u64 {
    1_000
}

fn default_observer_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_observer_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_log_format() -> String {
    "pretty".to_owned()
}
