//! Provider configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::env;

/// Outbound SMS provider configuration
///
/// Credentials normally come from `TWILIO_*` environment variables so
/// they never land in a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Twilio account SID
    #[serde(default)]
    pub account_sid: String,
    /// Twilio auth token
    #[serde(default)]
    pub auth_token: String,
    /// E.164 number messages are sent from
    #[serde(default)]
    pub from_number: String,
    /// Override the API host, used for tests and regional endpoints
    pub base_url: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub request_timeout: u64,
    /// Public URL the provider posts delivery status callbacks to
    pub status_callback: Option<String>,
    /// Outbound send rate cap, 0 disables pacing
    #[serde(default)]
    pub messages_per_second: u32,
    /// Extra sends allowed in a burst before pacing kicks in
    pub burst: Option<u32>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            base_url: None,
            request_timeout: default_provider_timeout(),
            status_callback: None,
            messages_per_second: 0,
            burst: None,
        }
    }
}

impl ProviderConfig {
    /// Merge provider configurations
    pub fn merge(mut self, other: Self) -> Self {
        if !other.account_sid.is_empty() {
            self.account_sid = other.account_sid;
        }
        if !other.auth_token.is_empty() {
            self.auth_token = other.auth_token;
        }
        if !other.from_number.is_empty() {
            self.from_number = other.from_number;
        }
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.request_timeout != default_provider_timeout() {
            self.request_timeout = other.request_timeout;
        }
        if other.status_callback.is_some() {
            self.status_callback = other.status_callback;
        }
        if other.messages_per_second != 0 {
            self.messages_per_second = other.messages_per_second;
        }
        if other.burst.is_some() {
            self.burst = other.burst;
        }
        self
    }

    /// Overlay `TWILIO_*` environment variables onto this config
    pub fn overlay_env(mut self) -> Self {
        if let Ok(sid) = env::var("TWILIO_ACCOUNT_SID") {
            self.account_sid = sid;
        }
        if let Ok(token) = env::var("TWILIO_AUTH_TOKEN") {
            self.auth_token = token;
        }
        if let Ok(from) = env::var("TWILIO_FROM_NUMBER") {
            self.from_number = from;
        }
        if let Ok(base_url) = env::var("TWILIO_BASE_URL") {
            self.base_url = Some(base_url);
        }
        if let Ok(callback) = env::var("TWILIO_STATUS_CALLBACK") {
            self.status_callback = Some(callback);
        }
        self
    }

    /// Effective burst size for the send pacer
    pub fn burst_size(&self) -> u32 {
        self.burst.unwrap_or(self.messages_per_second)
    }

    /// Validate provider configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.account_sid.is_empty() {
            return Err("Provider account SID is required".to_string());
        }
        if self.auth_token.is_empty() {
            return Err("Provider auth token is required".to_string());
        }
        if !self.from_number.starts_with('+') {
            return Err(format!(
                "Provider from number '{}' is not E.164",
                self.from_number
            ));
        }
        if self.request_timeout == 0 {
            return Err("Provider request timeout cannot be 0".to_string());
        }
        Ok(())
    }
}
