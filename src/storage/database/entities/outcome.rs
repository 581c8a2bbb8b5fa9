use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-recipient outcome database model
///
/// Rows are denormalized: each carries the batch body, media, and owner
/// so the message log reads without joins. `(message_id,
/// recipient_phone)` is unique; repeated flushes of the same batch are
/// no-ops for rows that already landed.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "message_outcomes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Batch this outcome belongs to
    pub message_id: String,

    /// Destination phone number (E.164)
    pub recipient_phone: String,

    /// Human-readable recipient label
    pub recipient_label: Option<String>,

    /// Contact record the recipient came from
    pub recipient_contact_id: Option<String>,

    /// Message text as sent
    pub body: String,

    /// Media URLs as sent (JSON array of strings)
    pub media_urls: Json,

    /// Identity the batch was sent on behalf of
    pub owner_id: Option<String>,

    /// Owner kind ("user", "community", "city")
    pub owner_kind: Option<String>,

    /// Delivery status ("sent", "failed", "delivered")
    pub status: String,

    /// Failure detail when the send failed
    pub error_message: Option<String>,

    /// Provider-assigned message identifier
    pub provider_sid: Option<String>,

    /// Raw provider response (JSON)
    pub provider_response: Option<Json>,

    /// When the outcome was recorded
    pub created_at: DateTimeWithTimeZone,

    /// When a delivery receipt arrived
    pub delivered_at: Option<DateTimeWithTimeZone>,
}

/// Outcome entity relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
