//! Application state shared across HTTP handlers
//!
//! This module provides the AppState struct and its implementations.

use crate::config::Config;
use crate::core::batch::Dispatcher;
use crate::storage::StorageLayer;
use std::sync::Arc;

/// HTTP server state shared across handlers
///
/// All fields are wrapped in Arc for efficient sharing across threads.
#[derive(Clone)]
pub struct AppState {
    /// Dispatcher configuration (shared read-only)
    pub config: Arc<Config>,
    /// Batch dispatcher
    pub dispatcher: Arc<Dispatcher>,
    /// Storage layer
    pub storage: Arc<StorageLayer>,
}

impl AppState {
    /// Create a new AppState with shared resources
    pub fn new(config: Config, dispatcher: Dispatcher, storage: Arc<StorageLayer>) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
            storage,
        }
    }

    /// Get dispatcher configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
