//! Dispatch request validation and phone number normalization
//!
//! Recipient addresses are normalized to E.164 before fan-out so the
//! provider sees one canonical form and duplicate detection works on
//! equal strings.

use crate::core::batch::DispatchRequest;
use crate::utils::error::{DispatchError, Result};
use ahash::AHashSet;
use once_cell::sync::Lazy;
use regex::Regex;

static E164_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+[1-9][0-9]{7,14}$").unwrap());

/// Normalize a raw phone number to E.164 form
///
/// Accepts numbers with common punctuation (spaces, dashes, parentheses,
/// dots). Bare 10-digit numbers and 11-digit numbers with a leading 1 are
/// treated as NANP and prefixed with +1. Returns `None` when the input
/// cannot be normalized.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();

    let candidate = if let Some(rest) = cleaned.strip_prefix('+') {
        if !rest.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        cleaned.clone()
    } else if cleaned.len() == 10 && cleaned.chars().all(|c| c.is_ascii_digit()) {
        format!("+1{}", cleaned)
    } else if cleaned.len() == 11
        && cleaned.starts_with('1')
        && cleaned.chars().all(|c| c.is_ascii_digit())
    {
        format!("+{}", cleaned)
    } else {
        return None;
    };

    if E164_PATTERN.is_match(&candidate) {
        Some(candidate)
    } else {
        None
    }
}

/// Validate a dispatch request and return its normalized form
///
/// Rejects empty recipient lists, requests with neither body text nor
/// media, malformed recipient addresses, and non-HTTP media URLs.
/// Recipients that normalize to the same address are collapsed, keeping
/// the first occurrence.
pub fn validate_dispatch(mut request: DispatchRequest) -> Result<DispatchRequest> {
    if request.recipients.is_empty() {
        return Err(DispatchError::validation("recipient list is empty"));
    }

    if request.message.trim().is_empty() && request.media_urls.is_empty() {
        return Err(DispatchError::validation(
            "message body or at least one media url is required",
        ));
    }

    for url in &request.media_urls {
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(DispatchError::Validation(format!(
                    "media url scheme '{}' is not supported: {}",
                    other, url
                )));
            }
        }
    }

    let mut seen: AHashSet<String> = AHashSet::with_capacity(request.recipients.len());
    let mut normalized = Vec::with_capacity(request.recipients.len());
    for mut recipient in request.recipients.drain(..) {
        let phone = normalize_phone(&recipient.phone).ok_or_else(|| {
            DispatchError::Validation(format!("invalid phone number: {}", recipient.phone))
        })?;
        if seen.insert(phone.clone()) {
            recipient.phone = phone;
            normalized.push(recipient);
        }
    }
    request.recipients = normalized;

    Ok(request)
}
