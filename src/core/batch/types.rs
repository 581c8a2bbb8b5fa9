//! Batch dispatch domain types
//!
//! The wire shapes here are shared by three consumers: the fan-out
//! workers, the progress relay, and the durable log. Progress events
//! serialize with a `type` tag and camelCase keys because that is the
//! format streaming clients already parse.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::core::providers::ProviderReceipt;

/// One destination in a batch
///
/// On the wire a recipient is `{"value": "+1...", "label": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    /// Phone number, normalized to E.164 before fan-out
    #[serde(rename = "value")]
    pub phone: String,
    /// Human-readable label carried through to the log
    #[serde(rename = "label", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Contact record this recipient came from, when known
    #[serde(rename = "contactId", skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<Uuid>,
}

impl Recipient {
    pub fn new(phone: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            display_name: None,
            contact_id: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_contact_id(mut self, contact_id: Uuid) -> Self {
        self.contact_id = Some(contact_id);
        self
    }
}

/// Kind of entity a batch is sent on behalf of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    User,
    Community,
    City,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Community => "community",
            Self::City => "city",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "community" => Some(Self::Community),
            "city" => Some(Self::City),
            _ => None,
        }
    }
}

/// Identity a batch is sent on behalf of
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub id: String,
    pub kind: OwnerKind,
}

impl Owner {
    pub fn new(id: impl Into<String>, kind: OwnerKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// A request to fan one message out to many recipients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub message: String,
    pub recipients: Vec<Recipient>,
    #[serde(default)]
    pub media_urls: Vec<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,
}

impl DispatchRequest {
    pub fn new(message: impl Into<String>, recipients: Vec<Recipient>) -> Self {
        Self {
            message: message.into(),
            recipients,
            media_urls: Vec::new(),
            owner: None,
        }
    }

    pub fn with_media(mut self, media_urls: Vec<Url>) -> Self {
        self.media_urls = media_urls;
        self
    }

    pub fn with_owner(mut self, owner: Owner) -> Self {
        self.owner = Some(owner);
        self
    }
}

/// Lifecycle of a batch record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    InProgress,
    Completed,
    Errored,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Errored => "errored",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "errored" => Some(Self::Errored),
            _ => None,
        }
    }

    /// Terminal batches accept no further dispatch work
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Errored)
    }
}

/// Durable per-recipient delivery state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Provider took custody of the message
    Sent,
    /// Send attempt failed terminally
    Failed,
    /// Handset delivery confirmed by a provider callback
    Delivered,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Delivered => "delivered",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            "delivered" => Some(Self::Delivered),
            _ => None,
        }
    }
}

/// Outcome of one recipient send attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientOutcome {
    pub recipient: Recipient,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_sid: Option<String>,
    /// Raw provider response kept for the durable log
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_response: Option<serde_json::Value>,
    pub completed_at: DateTime<Utc>,
}

impl RecipientOutcome {
    pub fn sent(recipient: Recipient, receipt: ProviderReceipt) -> Self {
        Self {
            recipient,
            status: DeliveryStatus::Sent,
            error: None,
            provider_sid: Some(receipt.sid),
            provider_response: Some(receipt.raw),
            completed_at: receipt.accepted_at,
        }
    }

    pub fn failed(recipient: Recipient, error: impl Into<String>) -> Self {
        Self {
            recipient,
            status: DeliveryStatus::Failed,
            error: Some(error.into()),
            provider_sid: None,
            provider_response: None,
            completed_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self.status, DeliveryStatus::Failed)
    }
}

/// Unit of work handed to the fan-out sender
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub message_id: Uuid,
    pub body: String,
    pub media_urls: Vec<Url>,
    pub recipients: Vec<Recipient>,
}

impl BatchJob {
    pub fn new(message_id: Uuid, request: &DispatchRequest) -> Self {
        Self {
            message_id,
            body: request.message.clone(),
            media_urls: request.media_urls.clone(),
            recipients: request.recipients.clone(),
        }
    }

    pub fn total(&self) -> usize {
        self.recipients.len()
    }
}

/// Batch fields the log writer denormalizes into every row
///
/// Outcome rows repeat these so the message log reads without joins.
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub message_id: Uuid,
    pub body: String,
    pub media_urls: Vec<String>,
    pub owner: Option<Owner>,
}

impl BatchContext {
    pub fn new(message_id: Uuid, request: &DispatchRequest) -> Self {
        Self {
            message_id,
            body: request.message.clone(),
            media_urls: request.media_urls.iter().map(Url::to_string).collect(),
            owner: request.owner.clone(),
        }
    }
}

/// Events flowing from fan-out workers to the batch runner
#[derive(Debug, Clone)]
pub enum FanoutEvent {
    /// One recipient reached a terminal outcome
    Outcome(RecipientOutcome),
    /// Every send future has resolved
    Complete,
}

/// Wire vocabulary for per-recipient progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendStatus {
    Success,
    Failed,
}

/// Events relayed to progress subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// Handshake emitted when a subscriber attaches
    Connected,
    /// One recipient resolved
    Status {
        #[serde(rename = "messageId")]
        message_id: Uuid,
        recipient: String,
        status: SendStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Terminal: every recipient is accounted for
    Complete {
        #[serde(rename = "messageId")]
        message_id: Uuid,
    },
    /// Terminal: the batch ended without full accounting
    Error {
        #[serde(rename = "messageId")]
        message_id: Uuid,
        error: String,
    },
}

impl ProgressEvent {
    /// Terminal events end a subscription
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

/// Counter view over an in-flight batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub completed: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Persistent batch counters
///
/// `pending + sent + delivered + failed == total` holds at every flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCounters {
    pub total: i32,
    pub pending: i32,
    pub sent: i32,
    pub delivered: i32,
    pub failed: i32,
}

impl BatchCounters {
    /// Counters for a freshly accepted batch
    pub fn pending(total: i32) -> Self {
        Self {
            total,
            pending: total,
            sent: 0,
            delivered: 0,
            failed: 0,
        }
    }
}

/// Stored view of a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub message_id: Uuid,
    pub body: String,
    pub media_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,
    pub status: BatchStatus,
    #[serde(flatten)]
    pub counters: BatchCounters,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// One row of the durable outcome log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageLogEntry {
    pub message_id: Uuid,
    pub recipient_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<Uuid>,
    pub body: String,
    pub media_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Owner>,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_sid: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
}
