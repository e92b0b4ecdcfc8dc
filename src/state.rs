//! Shared application state.

use prometheus::Registry;

/// State cloned into every request handler.
///
/// Holds the exposition registry the bridge is registered with; requests
/// share nothing else.
#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
}

impl AppState {
    pub fn new(registry: Registry) -> Self {
        AppState { registry }
    }
}
