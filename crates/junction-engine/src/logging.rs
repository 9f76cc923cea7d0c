//! Tracing subscriber setup.

use junction_core::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`. `logging.format`
/// selects `json` output; anything else is human-readable.
///
/// # Errors
///
/// Returns [`EngineError::Logging`] if the level does not parse as a
/// filter or a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(&config.level).map_err(|e| EngineError::Logging {
            message: format!("invalid log level {:?}: {e}", config.level),
        })
    })?;

    let result = if config.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    };

    result.map_err(|e| EngineError::Logging {
        message: e.to_string(),
    })
}
