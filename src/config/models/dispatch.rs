//! Dispatch tuning configuration

use super::*;
use serde::{Deserialize, Serialize};

/// Batch dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Bound on concurrent provider calls per batch
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Per-recipient send timeout in seconds
    #[serde(default = "default_send_timeout")]
    pub send_timeout: u64,
    /// How long to wait for a batch to finish, in seconds
    #[serde(default = "default_complete_timeout")]
    pub complete_timeout: u64,
    /// Window for accepting outcomes after a batch times out, in seconds
    #[serde(default = "default_late_grace")]
    pub late_grace: u64,
    /// Outcome channel capacity
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            send_timeout: default_send_timeout(),
            complete_timeout: default_complete_timeout(),
            late_grace: default_late_grace(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl DispatchConfig {
    /// Merge dispatch configurations
    pub fn merge(mut self, other: Self) -> Self {
        if other.concurrency != default_concurrency() {
            self.concurrency = other.concurrency;
        }
        if other.send_timeout != default_send_timeout() {
            self.send_timeout = other.send_timeout;
        }
        if other.complete_timeout != default_complete_timeout() {
            self.complete_timeout = other.complete_timeout;
        }
        if other.late_grace != default_late_grace() {
            self.late_grace = other.late_grace;
        }
        if other.event_buffer != default_event_buffer() {
            self.event_buffer = other.event_buffer;
        }
        self
    }

    /// Validate dispatch configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err("Dispatch concurrency cannot be 0".to_string());
        }
        if self.send_timeout == 0 {
            return Err("Send timeout cannot be 0".to_string());
        }
        if self.complete_timeout == 0 {
            return Err("Complete timeout cannot be 0".to_string());
        }
        if self.event_buffer == 0 {
            return Err("Event buffer cannot be 0".to_string());
        }
        Ok(())
    }
}
