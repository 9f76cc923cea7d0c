//! Shared application state for the Observer API server.

use std::sync::Arc;

use junction_core::operator::OperatorState;
use junction_core::shared::SharedJunction;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// The junction being observed and overridden.
    pub junction: Arc<SharedJunction>,
    /// Shared operator control state (present when the tick loop is running).
    pub operator_state: Option<Arc<OperatorState>>,
}

impl AppState {
    /// Create application state without operator controls.
    pub const fn new(junction: Arc<SharedJunction>) -> Self {
        Self {
            junction,
            operator_state: None,
        }
    }

    /// Create application state with operator control state attached.
    pub const fn with_operator(
        junction: Arc<SharedJunction>,
        operator: Arc<OperatorState>,
    ) -> Self {
        Self {
            junction,
            operator_state: Some(operator),
        }
    }
}
