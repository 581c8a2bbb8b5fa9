//! Twilio error mapping
//!
//! Twilio reports failures as JSON bodies of the form
//! `{"code": 21211, "message": "...", "more_info": "...", "status": 400}`.

use serde_json::Value;

use crate::core::providers::ProviderError;

/// Map an HTTP status and response body onto a [`ProviderError`]
pub(super) fn map_http_error(status: u16, body: &str) -> ProviderError {
    let message = extract_error_message(body).unwrap_or_else(|| body.to_string());
    match status {
        400 => ProviderError::InvalidRequest(message),
        401 | 403 => ProviderError::Auth(message),
        429 => ProviderError::RateLimited {
            message,
            retry_after: None,
        },
        _ => ProviderError::Api { status, message },
    }
}

pub(super) fn network_error(message: impl Into<String>) -> ProviderError {
    ProviderError::Network(message.into())
}

pub(super) fn parse_error(message: impl Into<String>) -> ProviderError {
    ProviderError::Parse(message.into())
}

/// Pull the `code` and `message` fields out of a Twilio error body
fn extract_error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    let message = json.get("message")?.as_str()?;
    match json.get("code").and_then(|c| c.as_u64()) {
        Some(code) => Some(format!("{} (code {})", message, code)),
        None => Some(message.to_string()),
    }
}
