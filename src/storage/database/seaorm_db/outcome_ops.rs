use crate::core::batch::{
    BatchContext, DeliveryStatus, MessageLogEntry, Owner, OwnerKind, RecipientOutcome,
};
use crate::utils::error::{DispatchError, Result};
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tracing::{debug, warn};
use uuid::Uuid;

use super::super::entities;
use super::types::SeaOrmDatabase;

impl SeaOrmDatabase {
    /// Bulk-insert outcome rows for one batch
    ///
    /// Inserts are keyed on `(message_id, recipient_phone)`; rows from an
    /// earlier flush are left untouched, so partial and final flushes of
    /// the same batch never duplicate. Returns the number of new rows.
    pub async fn insert_outcomes(
        &self,
        ctx: &BatchContext,
        outcomes: &[RecipientOutcome],
    ) -> Result<u64> {
        if outcomes.is_empty() {
            return Ok(0);
        }
        debug!(
            "Persisting {} outcomes for batch {}",
            outcomes.len(),
            ctx.message_id
        );

        let rows: Vec<entities::outcome::ActiveModel> = outcomes
            .iter()
            .map(|outcome| entities::outcome::ActiveModel {
                message_id: Set(ctx.message_id.to_string()),
                recipient_phone: Set(outcome.recipient.phone.clone()),
                recipient_label: Set(outcome.recipient.display_name.clone()),
                recipient_contact_id: Set(outcome
                    .recipient
                    .contact_id
                    .map(|id| id.to_string())),
                body: Set(ctx.body.clone()),
                media_urls: Set(serde_json::json!(ctx.media_urls)),
                owner_id: Set(ctx.owner.as_ref().map(|owner| owner.id.clone())),
                owner_kind: Set(ctx
                    .owner
                    .as_ref()
                    .map(|owner| owner.kind.as_str().to_string())),
                status: Set(outcome.status.as_str().to_string()),
                error_message: Set(outcome.error.clone()),
                provider_sid: Set(outcome.provider_sid.clone()),
                provider_response: Set(outcome.provider_response.clone()),
                created_at: Set(outcome.completed_at.into()),
                delivered_at: Set(None),
                ..Default::default()
            })
            .collect();

        let inserted = entities::Outcome::insert_many(rows)
            .on_conflict(
                OnConflict::columns([
                    entities::outcome::Column::MessageId,
                    entities::outcome::Column::RecipientPhone,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(inserted)
    }

    /// Fetch the outcome log for one batch in insertion order
    pub async fn list_outcomes(&self, message_id: Uuid) -> Result<Vec<MessageLogEntry>> {
        let models = entities::Outcome::find()
            .filter(entities::outcome::Column::MessageId.eq(message_id.to_string()))
            .order_by_asc(entities::outcome::Column::Id)
            .all(&self.db)
            .await?;

        models.into_iter().map(outcome_model_to_entry).collect()
    }

    /// Apply an out-of-band delivery receipt
    ///
    /// Flips the matching `sent` outcome to `delivered` and moves one
    /// count from `sent` to `delivered` on the batch row, inside one
    /// transaction. Replayed receipts are no-ops. Returns the batch id
    /// the receipt landed on, if any.
    pub async fn record_delivery(&self, provider_sid: &str) -> Result<Option<Uuid>> {
        let txn = self.db.begin().await?;

        let Some(outcome) = entities::Outcome::find()
            .filter(entities::outcome::Column::ProviderSid.eq(provider_sid))
            .one(&txn)
            .await?
        else {
            txn.commit().await?;
            debug!("No outcome for delivery receipt sid {}", provider_sid);
            return Ok(None);
        };

        let message_id = Uuid::parse_str(&outcome.message_id).map_err(|e| {
            DispatchError::Internal(format!("corrupt batch id {}: {}", outcome.message_id, e))
        })?;

        match DeliveryStatus::parse(&outcome.status) {
            Some(DeliveryStatus::Sent) => {}
            Some(DeliveryStatus::Delivered) => {
                txn.commit().await?;
                return Ok(Some(message_id));
            }
            _ => {
                warn!(
                    "Delivery receipt {} for outcome in status {}, ignoring",
                    provider_sid, outcome.status
                );
                txn.commit().await?;
                return Ok(Some(message_id));
            }
        }

        let batch = entities::Batch::find_by_id(outcome.message_id.clone())
            .one(&txn)
            .await?;

        let mut outcome_active: entities::outcome::ActiveModel = outcome.into();
        outcome_active.status = Set(DeliveryStatus::Delivered.as_str().to_string());
        outcome_active.delivered_at = Set(Some(Utc::now().into()));
        outcome_active.update(&txn).await?;

        if let Some(batch) = batch {
            let sent = batch.sent_count;
            let delivered = batch.delivered_count;
            let mut batch_active: entities::batch::ActiveModel = batch.into();
            batch_active.sent_count = Set((sent - 1).max(0));
            batch_active.delivered_count = Set(delivered + 1);
            batch_active.update(&txn).await?;
        }

        txn.commit().await?;
        debug!("Recorded delivery for sid {}", provider_sid);
        Ok(Some(message_id))
    }
}

fn outcome_model_to_entry(model: entities::outcome::Model) -> Result<MessageLogEntry> {
    let message_id = Uuid::parse_str(&model.message_id).map_err(|e| {
        DispatchError::Internal(format!("corrupt batch id {}: {}", model.message_id, e))
    })?;

    let status = DeliveryStatus::parse(&model.status).unwrap_or(DeliveryStatus::Failed);
    let media_urls: Vec<String> = serde_json::from_value(model.media_urls).unwrap_or_default();

    let owner = match (model.owner_id, model.owner_kind) {
        (Some(id), Some(kind)) => OwnerKind::parse(&kind).map(|kind| Owner::new(id, kind)),
        _ => None,
    };

    Ok(MessageLogEntry {
        message_id,
        recipient_phone: model.recipient_phone,
        recipient_name: model.recipient_label,
        contact_id: model
            .recipient_contact_id
            .and_then(|id| Uuid::parse_str(&id).ok()),
        body: model.body,
        media_urls,
        owner,
        status,
        error_message: model.error_message,
        provider_sid: model.provider_sid,
        created_at: model.created_at.with_timezone(&Utc),
        delivered_at: model.delivered_at.map(|t| t.with_timezone(&Utc)),
    })
}
