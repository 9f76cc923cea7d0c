//! Junction engine binary.
//!
//! Wires the signal scheduler, the tick loop, the observer API and the
//! operator controls together and runs until stopped.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `junction-config.yaml` (or the path given
//!    as the first argument)
//! 2. Initialize structured logging (tracing)
//! 3. Build the junction and validate its initial state
//! 4. Create operator state from the runtime bounds
//! 5. Start the observer API server
//! 6. Install the Ctrl-C handler
//! 7. Run the tick loop
//! 8. Log the result and keep serving until stopped

mod callback;
mod error;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use junction_core::config::EngineConfig;
use junction_core::operator::{OperatorState, RunEndReason};
use junction_core::runner;
use junction_core::scheduler::init_junction;
use junction_core::shared::SharedJunction;
use junction_observer::server::ServerConfig;
use junction_observer::startup::spawn_observer;
use junction_observer::state::AppState;
use tracing::{info, warn};

use crate::callback::TransitionLogger;
use crate::error::EngineError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "junction-config.yaml";

#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration. Env overrides are applied once logging is up
    //    so bad values are reported.
    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (mut config, loaded_from_file) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    logging::init(&config.logging)?;
    config.apply_env_overrides();

    info!("junction-engine starting");
    if loaded_from_file {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }

    // 3. Build the junction.
    let scheduler = init_junction(&config.junction)?;
    let junction = Arc::new(SharedJunction::new(scheduler));
    let initial = junction.snapshot();
    for approach in &initial.approaches {
        info!(
            approach = %approach.id,
            label = approach.label,
            phase = %approach.phase,
            remaining = approach.remaining,
            "Approach ready"
        );
    }

    // 4. Create operator state.
    let operator = Arc::new(OperatorState::new(&config.runtime));
    info!(
        max_ticks = operator.max_ticks(),
        max_real_time_seconds = operator.max_real_time_seconds(),
        tick_interval_ms = operator.tick_interval_ms(),
        "Operator state initialized"
    );

    // 5. Start the observer API server.
    let server_config = ServerConfig {
        host: config.observer.host.clone(),
        port: config.observer.port,
    };
    let app_state = Arc::new(AppState::with_operator(
        Arc::clone(&junction),
        Arc::clone(&operator),
    ));
    let observer_handle = spawn_observer(&server_config, app_state).await?;

    // 6. Ctrl-C stops the tick loop (or ends the post-run wait).
    {
        let operator = Arc::clone(&operator);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received, stopping");
                    operator.request_stop();
                }
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
            }
        });
    }

    // 7. Run the tick loop.
    let mut callback = TransitionLogger::new(&initial);
    let result = runner::run_junction(&junction, &operator, &mut callback).await?;

    // 8. Log results.
    runner::log_run_end(&result);
    info!(
        transitions = callback.transitions(),
        conflicts = callback.conflicts(),
        "Run statistics"
    );

    if result.end_reason != RunEndReason::OperatorStop {
        info!("Run bounds reached; observer still serving, stop via Ctrl-C or /api/operator/stop");
        operator.wait_for_stop().await;
    }

    observer_handle.abort();
    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "junction-engine shutdown complete"
    );

    Ok(())
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist. Returns whether the file was read.
fn load_config(path: &std::path::Path) -> Result<(EngineConfig, bool), EngineError> {
    if path.exists() {
        Ok((EngineConfig::from_file(path)?, true))
    } else {
        Ok((EngineConfig::default(), false))
    }
}
