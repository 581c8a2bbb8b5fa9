//! Configuration data models
//!
//! This module defines all configuration structures used throughout the dispatcher.

#![allow(missing_docs)]

pub mod dispatch;
pub mod logging;
pub mod provider;
pub mod server;
pub mod storage;

// Re-export all configuration types
pub use dispatch::*;
pub use logging::*;
pub use provider::*;
pub use server::*;
pub use storage::*;

/// Default values for configuration
pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Default server port
pub fn default_port() -> u16 {
    8000
}

/// Default request timeout in seconds
pub fn default_timeout() -> u64 {
    30
}

/// Default maximum body size in bytes
pub fn default_max_body_size() -> usize {
    1024 * 1024 // 1MB, a batch request is recipients plus one message body
}

/// Default bound on concurrent provider calls per batch
pub fn default_concurrency() -> usize {
    10
}

/// Default per-recipient send timeout in seconds
pub fn default_send_timeout() -> u64 {
    30
}

/// Default bound on waiting for a batch to finish, in seconds
pub fn default_complete_timeout() -> u64 {
    60
}

/// Default window for accepting outcomes after a batch times out, in seconds
pub fn default_late_grace() -> u64 {
    30
}

/// Default outcome channel capacity
pub fn default_event_buffer() -> usize {
    1024
}

pub fn default_max_connections() -> u32 {
    10
}

pub fn default_connection_timeout() -> u64 {
    5
}

pub fn default_database_url() -> String {
    "sqlite://data/textblast.db?mode=rwc".to_string()
}

pub fn default_provider_timeout() -> u64 {
    30
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_log_format() -> String {
    "pretty".to_string()
}
