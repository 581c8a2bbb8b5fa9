//! HTTP listener configuration

use super::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Settings for the HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Worker threads; unset means one per CPU
    pub workers: Option<usize>,
    /// Seconds before an idle request is dropped
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Upper bound on a dispatch request body, in bytes
    ///
    /// A request is one message plus its recipient list, so the default
    /// of 1MB already fits tens of thousands of recipients.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    /// Cross-origin policy for browser clients
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
            timeout: default_timeout(),
            max_body_size: default_max_body_size(),
            cors: CorsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Overlay non-default fields from `other`
    pub fn merge(mut self, other: Self) -> Self {
        if other.host != default_host() {
            self.host = other.host;
        }
        if other.port != default_port() {
            self.port = other.port;
        }
        if other.workers.is_some() {
            self.workers = other.workers;
        }
        if other.timeout != default_timeout() {
            self.timeout = other.timeout;
        }
        if other.max_body_size != default_max_body_size() {
            self.max_body_size = other.max_body_size;
        }
        self.cors = self.cors.merge(other.cors);
        self
    }

    /// `host:port` string for the listener bind call
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }

    /// Reject values the listener cannot start with
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port must be non-zero".to_string());
        }
        if self.timeout == 0 {
            return Err("Timeout must be at least one second".to_string());
        }
        if self.max_body_size == 0 {
            return Err("Max body size must be non-zero".to_string());
        }
        Ok(())
    }
}

/// Cross-origin policy
///
/// The progress stream is consumed by browser `EventSource` clients, so
/// CORS stays enabled by default with an empty (allow-all) origin list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_cors_enabled")]
    pub enabled: bool,
    /// Origins allowed to call the API; empty allows any
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_cors_methods")]
    pub allowed_methods: Vec<String>,
    #[serde(default = "default_cors_headers")]
    pub allowed_headers: Vec<String>,
    /// Preflight cache lifetime in seconds
    #[serde(default = "default_cors_max_age")]
    pub max_age: u32,
    #[serde(default)]
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec![],
            allowed_methods: default_cors_methods(),
            allowed_headers: default_cors_headers(),
            max_age: default_cors_max_age(),
            allow_credentials: false,
        }
    }
}

impl CorsConfig {
    /// Overlay non-default fields from `other`
    pub fn merge(mut self, other: Self) -> Self {
        if !other.enabled {
            self.enabled = other.enabled;
        }
        if !other.allowed_origins.is_empty() {
            self.allowed_origins = other.allowed_origins;
        }
        if other.allowed_methods != default_cors_methods() {
            self.allowed_methods = other.allowed_methods;
        }
        if other.allowed_headers != default_cors_headers() {
            self.allowed_headers = other.allowed_headers;
        }
        if other.max_age != default_cors_max_age() {
            self.max_age = other.max_age;
        }
        if other.allow_credentials {
            self.allow_credentials = other.allow_credentials;
        }
        self
    }

    /// True when no origin restriction is in effect
    pub fn allows_all_origins(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.contains(&"*".to_string())
    }

    /// Reject combinations browsers refuse anyway
    pub fn validate(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }
        if self.allows_all_origins() {
            if self.allow_credentials {
                return Err(
                    "CORS must not combine a wildcard origin with credentials".to_string()
                );
            }
            warn!("CORS is open to any origin; restrict allowed_origins for production");
        }
        Ok(())
    }
}

fn default_cors_enabled() -> bool {
    true
}

fn default_cors_methods() -> Vec<String> {
    ["GET", "POST", "OPTIONS"].map(str::to_string).to_vec()
}

fn default_cors_headers() -> Vec<String> {
    ["authorization", "content-type", "x-message-id"]
        .map(str::to_string)
        .to_vec()
}

fn default_cors_max_age() -> u32 {
    3600
}
