//! Configuration management for the dispatcher
//!
//! This module handles loading, validation, and management of all dispatcher configuration.

pub mod models;

pub use models::*;

use crate::utils::error::{DispatchError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::{debug, info};

/// Main configuration struct for the dispatcher
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// SMS provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Batch dispatch tuning
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DispatchError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| DispatchError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load from an optional file path, with environment variables overlaid
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path).await?.overlay_env(),
            None => Self::default().overlay_env(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables alone
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let config = Self::default().overlay_env();
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables onto this config
    ///
    /// Environment always wins over the file so credentials can stay
    /// out of checked-in YAML.
    pub fn overlay_env(mut self) -> Self {
        if let Ok(host) = env::var("HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        self.provider = self.provider.overlay_env();
        self.storage.database = self.storage.database.overlay_env();
        self
    }

    /// Get server configuration
    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    /// Get provider configuration
    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    /// Get dispatch tuning
    pub fn dispatch(&self) -> &DispatchConfig {
        &self.dispatch
    }

    /// Get storage configuration
    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    /// Get logging configuration
    pub fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    /// Validate the entire configuration
    ///
    /// Provider credentials are checked later, when the Twilio client is
    /// built, so a credential-less config still loads for offline use.
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");

        self.server
            .validate()
            .map_err(|e| DispatchError::Config(format!("Server config error: {}", e)))?;

        self.server
            .cors
            .validate()
            .map_err(|e| DispatchError::Config(format!("CORS config error: {}", e)))?;

        self.dispatch
            .validate()
            .map_err(|e| DispatchError::Config(format!("Dispatch config error: {}", e)))?;

        self.logging
            .validate()
            .map_err(|e| DispatchError::Config(format!("Logging config error: {}", e)))?;

        debug!("Configuration validation completed");
        Ok(())
    }

    /// Merge with another configuration (other takes precedence)
    pub fn merge(mut self, other: Self) -> Self {
        self.server = self.server.merge(other.server);
        self.provider = self.provider.merge(other.provider);
        self.dispatch = self.dispatch.merge(other.dispatch);
        self.storage = self.storage.merge(other.storage);
        self.logging = self.logging.merge(other.logging);
        self
    }

    /// Convert to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| DispatchError::Config(format!("Failed to serialize config to YAML: {}", e)))
    }
}
