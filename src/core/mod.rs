//! Core dispatch functionality
//!
//! This module contains the batch pipeline and the outbound SMS
//! provider integrations.

pub mod batch;
pub mod providers;

// Re-export commonly used types
pub use batch::{BatchStatus, BatchSummary, DispatchRequest, Dispatcher, ProgressEvent, Recipient};
pub use providers::{ProviderError, SmsProvider, TwilioClient, TwilioConfig};
