use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Batch summary database model
///
/// One row per dispatched batch. Counter columns always satisfy
/// `pending + sent + delivered + failed == total`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "batches")]
pub struct Model {
    /// Correlation id (UUID, stored canonically formatted)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Message text sent to every recipient
    pub body: String,

    /// Media URLs attached to the message (JSON array of strings)
    pub media_urls: Json,

    /// Identity the batch was sent on behalf of
    pub owner_id: Option<String>,

    /// Owner kind ("user", "community", "city")
    pub owner_kind: Option<String>,

    /// Batch lifecycle status
    pub status: String,

    /// Number of recipients in the batch
    pub total_count: i32,

    /// Recipients not yet accounted for
    pub pending_count: i32,

    /// Recipients accepted by the provider
    pub sent_count: i32,

    /// Recipients with a confirmed delivery receipt
    pub delivered_count: i32,

    /// Recipients whose send failed
    pub failed_count: i32,

    /// Batch creation timestamp
    pub created_at: DateTimeWithTimeZone,

    /// When the fan-out started
    pub started_at: Option<DateTimeWithTimeZone>,

    /// When the batch reached a terminal status
    pub completed_at: Option<DateTimeWithTimeZone>,
}

/// Batch entity relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
