//! Twilio configuration

use std::env;

use crate::core::providers::ProviderError;

use super::{API_VERSION, DEFAULT_BASE_URL};

/// Connection settings for the Twilio Messaging API
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    /// Account SID, used both in the URL path and as the basic auth user
    pub account_sid: String,
    /// Auth token, the basic auth password
    pub auth_token: String,
    /// E.164 number messages are sent from
    pub from_number: String,
    /// API host
    pub base_url: String,
    /// Per-request timeout in seconds
    pub request_timeout: u64,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
    /// Public URL Twilio posts delivery status callbacks to
    pub status_callback: Option<String>,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: 30,
            connect_timeout: 10,
            status_callback: None,
        }
    }
}

impl TwilioConfig {
    /// Create a config with the required credentials
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
            ..Default::default()
        }
    }

    /// Create a config suitable for unit tests
    pub fn new_test(account_sid: impl Into<String>) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: "test-token".to_string(),
            from_number: "+15005550006".to_string(),
            ..Default::default()
        }
    }

    /// Load from `TWILIO_*` environment variables
    pub fn from_env() -> Result<Self, ProviderError> {
        let mut config = Self::default();

        config.account_sid = env::var("TWILIO_ACCOUNT_SID").map_err(|_| {
            ProviderError::Auth("TWILIO_ACCOUNT_SID environment variable is required".to_string())
        })?;
        config.auth_token = env::var("TWILIO_AUTH_TOKEN").map_err(|_| {
            ProviderError::Auth("TWILIO_AUTH_TOKEN environment variable is required".to_string())
        })?;
        config.from_number = env::var("TWILIO_FROM_NUMBER").map_err(|_| {
            ProviderError::InvalidRequest(
                "TWILIO_FROM_NUMBER environment variable is required".to_string(),
            )
        })?;

        if let Ok(base_url) = env::var("TWILIO_BASE_URL") {
            config.base_url = base_url;
        }

        if let Ok(timeout) = env::var("TWILIO_TIMEOUT") {
            config.request_timeout = timeout.parse().unwrap_or(30);
        }

        if let Ok(callback) = env::var("TWILIO_STATUS_CALLBACK") {
            config.status_callback = Some(callback);
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_status_callback(mut self, callback: impl Into<String>) -> Self {
        self.status_callback = Some(callback.into());
        self
    }

    /// Full URL of the message creation endpoint
    pub fn messages_url(&self) -> String {
        format!(
            "{}/{}/Accounts/{}/Messages.json",
            self.base_url.trim_end_matches('/'),
            API_VERSION,
            self.account_sid
        )
    }

    /// Check that the credentials required for live sends are present
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.account_sid.is_empty() {
            return Err(ProviderError::Auth("account sid is empty".to_string()));
        }
        if self.auth_token.is_empty() {
            return Err(ProviderError::Auth("auth token is empty".to_string()));
        }
        if !self.from_number.starts_with('+') {
            return Err(ProviderError::InvalidRequest(format!(
                "from number '{}' is not E.164",
                self.from_number
            )));
        }
        Ok(())
    }
}
