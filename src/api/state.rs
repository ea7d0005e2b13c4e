//! Application state for the API server

use crate::{Config, ImmunespaceProvider};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone) and provides
/// access to the provider instance and configuration.
#[derive(Clone)]
pub struct AppState {
    /// The main provider instance
    pub provider: Arc<ImmunespaceProvider>,

    /// Configuration (service-info descriptor, public base URL)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(provider: Arc<ImmunespaceProvider>, config: Arc<Config>) -> Self {
        Self { provider, config }
    }
}
