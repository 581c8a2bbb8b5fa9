//! Server-sent event framing

use crate::core::batch::ProgressEvent;
use crate::utils::error::Result;
use bytes::Bytes;

/// Simple event structure for SSE transmission
#[derive(Debug, Clone, Default)]
pub struct SseEvent {
    /// Event type
    pub event: Option<String>,
    /// Event data
    pub data: String,
}

impl SseEvent {
    /// Create a new empty event
    pub fn new() -> Self {
        Self {
            event: None,
            data: String::new(),
        }
    }

    /// Set the event type
    pub fn event(mut self, event: &str) -> Self {
        self.event = Some(event.to_string());
        self
    }

    /// Set the event data
    pub fn data(mut self, data: &str) -> Self {
        self.data = data.to_string();
        self
    }

    /// Frame a progress event as a data-only SSE message
    ///
    /// Clients listen on `onmessage`, so the discriminant travels inside
    /// the JSON payload rather than as an `event:` field.
    pub fn progress(event: &ProgressEvent) -> Result<Self> {
        let data = serde_json::to_string(event)?;
        Ok(Self::new().data(&data))
    }

    /// Convert event to bytes for SSE transmission
    pub fn to_bytes(&self) -> Bytes {
        let mut result = String::new();
        if let Some(event) = &self.event {
            result.push_str(&format!("event: {}\n", event));
        }
        result.push_str(&format!("data: {}\n\n", self.data));
        Bytes::from(result)
    }
}
