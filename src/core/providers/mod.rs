//! SMS provider implementations
//!
//! Every outbound carrier integration implements [`SmsProvider`]. The
//! dispatcher only sees the trait, so providers can be swapped in tests
//! and in config without touching the fan-out path.

pub mod twilio;

pub use twilio::{TwilioClient, TwilioConfig};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

/// Unified error type for SMS provider calls
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Account credentials were rejected
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The provider rejected the message itself
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Account-level throughput limit hit
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<u64>,
    },

    /// Provider returned an unexpected HTTP status
    #[error("provider returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// Connection, TLS, or timeout failures before a response arrived
    #[error("network error: {0}")]
    Network(String),

    /// The provider responded with a body we could not interpret
    #[error("invalid response: {0}")]
    Parse(String),
}

impl ProviderError {
    /// Whether a retry at a later time could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Acceptance receipt returned when a provider takes custody of a message
#[derive(Debug, Clone)]
pub struct ProviderReceipt {
    /// Provider-assigned message identifier
    pub sid: String,
    /// When the provider accepted the message
    pub accepted_at: DateTime<Utc>,
    /// Raw provider response for the durable log
    pub raw: serde_json::Value,
}

/// Outbound SMS carrier interface
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmsProvider: Send + Sync {
    /// Stable provider name used in logs and stored metadata
    fn name(&self) -> &'static str;

    /// Send one message to one recipient
    ///
    /// `to` must already be normalized to E.164. Returns the provider's
    /// receipt once it has taken custody of the message; delivery itself
    /// is reported later through status callbacks.
    async fn send(
        &self,
        to: &str,
        body: &str,
        media_urls: &[Url],
    ) -> Result<ProviderReceipt, ProviderError>;
}
