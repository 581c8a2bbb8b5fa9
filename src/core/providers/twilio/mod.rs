//! Twilio provider implementation
//!
//! Sends messages through the Twilio Programmable Messaging REST API and
//! maps its error responses onto [`ProviderError`](super::ProviderError).

pub mod client;
pub mod config;
pub mod error;

pub use client::TwilioClient;
pub use config::TwilioConfig;

/// Stable name used in logs and stored metadata
pub const PROVIDER_NAME: &str = "twilio";

/// Default API host
pub const DEFAULT_BASE_URL: &str = "https://api.twilio.com";

/// Messaging API version path segment
pub const API_VERSION: &str = "2010-04-01";

/// Create a client from `TWILIO_*` environment variables
pub fn client_from_env() -> Result<TwilioClient, super::ProviderError> {
    let config = TwilioConfig::from_env()?;
    TwilioClient::new(config)
}
