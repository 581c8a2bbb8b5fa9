use crate::core::batch::{BatchContext, BatchCounters, BatchStatus, BatchSummary, Owner, OwnerKind};
use crate::utils::error::{DispatchError, Result};
use chrono::{DateTime, Utc};
use sea_orm::*;
use tracing::debug;
use uuid::Uuid;

use super::super::entities;
use super::types::SeaOrmDatabase;

impl SeaOrmDatabase {
    /// Record a freshly accepted batch in `pending` state
    pub async fn create_batch(&self, ctx: &BatchContext, total: i32) -> Result<()> {
        debug!("Creating batch: {}", ctx.message_id);

        let counters = BatchCounters::pending(total);
        let active_model = entities::batch::ActiveModel {
            id: Set(ctx.message_id.to_string()),
            body: Set(ctx.body.clone()),
            media_urls: Set(serde_json::json!(ctx.media_urls)),
            owner_id: Set(ctx.owner.as_ref().map(|owner| owner.id.clone())),
            owner_kind: Set(ctx
                .owner
                .as_ref()
                .map(|owner| owner.kind.as_str().to_string())),
            status: Set(BatchStatus::Pending.as_str().to_string()),
            total_count: Set(counters.total),
            pending_count: Set(counters.pending),
            sent_count: Set(counters.sent),
            delivered_count: Set(counters.delivered),
            failed_count: Set(counters.failed),
            created_at: Set(Utc::now().into()),
            started_at: Set(None),
            completed_at: Set(None),
        };

        entities::Batch::insert(active_model).exec(&self.db).await?;
        Ok(())
    }

    /// Move a pending batch to `in_progress`
    pub async fn mark_batch_started(&self, message_id: Uuid) -> Result<()> {
        debug!("Marking batch in progress: {}", message_id);

        let batch_model = entities::Batch::find_by_id(message_id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| DispatchError::NotFound(format!("batch {} not found", message_id)))?;

        let mut active_model: entities::batch::ActiveModel = batch_model.into();
        active_model.status = Set(BatchStatus::InProgress.as_str().to_string());
        active_model.started_at = Set(Some(Utc::now().into()));
        active_model.update(&self.db).await?;

        Ok(())
    }

    /// Upsert the batch summary with terminal counters and status
    ///
    /// Repeated flushes of the same batch are safe. Delivery receipts
    /// recorded between flushes survive: the aggregator never observes
    /// `delivered`, so the stored delivered count is kept and subtracted
    /// from the aggregator's sent count instead of being overwritten.
    pub async fn finalize_batch(
        &self,
        ctx: &BatchContext,
        counters: &BatchCounters,
        status: BatchStatus,
    ) -> Result<()> {
        debug!(
            "Finalizing batch {} as {} ({}/{} accounted)",
            ctx.message_id,
            status.as_str(),
            counters.total - counters.pending,
            counters.total
        );

        let txn = self.db.begin().await?;

        let existing = entities::Batch::find_by_id(ctx.message_id.to_string())
            .one(&txn)
            .await?;

        let successful = counters.sent + counters.delivered;
        let delivered = existing
            .as_ref()
            .map(|model| model.delivered_count)
            .unwrap_or(0)
            .max(counters.delivered);
        let sent = (successful - delivered).max(0);
        let completed_at = Set(Some(Utc::now().into()));

        match existing {
            Some(model) => {
                let mut active_model: entities::batch::ActiveModel = model.into();
                active_model.status = Set(status.as_str().to_string());
                active_model.pending_count = Set(counters.pending);
                active_model.sent_count = Set(sent);
                active_model.delivered_count = Set(delivered);
                active_model.failed_count = Set(counters.failed);
                active_model.completed_at = completed_at;
                active_model.update(&txn).await?;
            }
            None => {
                let active_model = entities::batch::ActiveModel {
                    id: Set(ctx.message_id.to_string()),
                    body: Set(ctx.body.clone()),
                    media_urls: Set(serde_json::json!(ctx.media_urls)),
                    owner_id: Set(ctx.owner.as_ref().map(|owner| owner.id.clone())),
                    owner_kind: Set(ctx
                        .owner
                        .as_ref()
                        .map(|owner| owner.kind.as_str().to_string())),
                    status: Set(status.as_str().to_string()),
                    total_count: Set(counters.total),
                    pending_count: Set(counters.pending),
                    sent_count: Set(sent),
                    delivered_count: Set(delivered),
                    failed_count: Set(counters.failed),
                    created_at: Set(Utc::now().into()),
                    started_at: Set(None),
                    completed_at,
                };
                entities::Batch::insert(active_model).exec(&txn).await?;
            }
        }

        txn.commit().await?;
        Ok(())
    }

    /// Fetch one batch summary
    pub async fn get_batch(&self, message_id: Uuid) -> Result<Option<BatchSummary>> {
        let model = entities::Batch::find_by_id(message_id.to_string())
            .one(&self.db)
            .await?;

        model.map(batch_model_to_summary).transpose()
    }

    /// List batch summaries, newest first
    ///
    /// `after` pages backwards through history: only batches created
    /// strictly before it are returned.
    pub async fn list_batches(
        &self,
        limit: u64,
        after: Option<DateTime<Utc>>,
    ) -> Result<Vec<BatchSummary>> {
        debug!("Listing batches with limit {}, after {:?}", limit, after);

        let mut query = entities::Batch::find();
        if let Some(after) = after {
            query = query.filter(entities::batch::Column::CreatedAt.lt(after));
        }

        let models = query
            .order_by_desc(entities::batch::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?;

        models.into_iter().map(batch_model_to_summary).collect()
    }
}

fn batch_model_to_summary(model: entities::batch::Model) -> Result<BatchSummary> {
    let message_id = Uuid::parse_str(&model.id)
        .map_err(|e| DispatchError::Internal(format!("corrupt batch id {}: {}", model.id, e)))?;

    // Unknown statuses only appear if the schema outruns this binary;
    // surface them as errored rather than failing the read
    let status = BatchStatus::parse(&model.status).unwrap_or(BatchStatus::Errored);

    let media_urls: Vec<String> = serde_json::from_value(model.media_urls).unwrap_or_default();

    let owner = match (model.owner_id, model.owner_kind) {
        (Some(id), Some(kind)) => OwnerKind::parse(&kind).map(|kind| Owner::new(id, kind)),
        _ => None,
    };

    Ok(BatchSummary {
        message_id,
        body: model.body,
        media_urls,
        owner,
        status,
        counters: BatchCounters {
            total: model.total_count,
            pending: model.pending_count,
            sent: model.sent_count,
            delivered: model.delivered_count,
            failed: model.failed_count,
        },
        created_at: model.created_at.with_timezone(&Utc),
        started_at: model.started_at.map(|t| t.with_timezone(&Utc)),
        completed_at: model.completed_at.map(|t| t.with_timezone(&Utc)),
    })
}
