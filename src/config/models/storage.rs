//! Storage configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::env;

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl StorageConfig {
    /// Merge storage configurations
    pub fn merge(mut self, other: Self) -> Self {
        self.database = self.database.merge(other.database);
        self
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
    /// Fall back to a local SQLite file when the configured PostgreSQL
    /// database is unreachable at startup. Off unless asked for: the
    /// outcome log is the one durable artifact, and it must not quietly
    /// move to a different store.
    #[serde(default)]
    pub sqlite_fallback: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connection_timeout: default_connection_timeout(),
            sqlite_fallback: false,
        }
    }
}

impl DatabaseConfig {
    /// Merge database configurations
    pub fn merge(mut self, other: Self) -> Self {
        if !other.url.is_empty() && other.url != default_database_url() {
            self.url = other.url;
        }
        if other.max_connections != default_max_connections() {
            self.max_connections = other.max_connections;
        }
        if other.connection_timeout != default_connection_timeout() {
            self.connection_timeout = other.connection_timeout;
        }
        if other.sqlite_fallback {
            self.sqlite_fallback = other.sqlite_fallback;
        }
        self
    }

    /// Overlay `DATABASE_URL` onto this config
    pub fn overlay_env(mut self) -> Self {
        if let Ok(url) = env::var("DATABASE_URL") {
            self.url = url;
        }
        self
    }
}
