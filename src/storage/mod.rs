//! Storage layer for the dispatcher
//!
//! This module provides the durable batch log: every dispatch writes a
//! batch row up front and per-recipient outcome rows as sends resolve.

/// Database storage module
pub mod database;

use crate::config::StorageConfig;
use crate::core::batch::{
    BatchContext, BatchCounters, BatchStatus, BatchSummary, MessageLogEntry, RecipientOutcome,
};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Main storage layer that owns the batch log backend
#[derive(Debug, Clone)]
pub struct StorageLayer {
    /// Database connection pool
    pub database: Arc<database::Database>,
}

impl StorageLayer {
    /// Create a new storage layer
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        info!("Initializing storage layer");

        debug!("Connecting to database");
        let database = Arc::new(database::Database::new(&config.database).await?);

        info!("Storage layer initialized successfully");

        Ok(Self { database })
    }

    /// Wrap an already-connected database, used by tests
    pub fn with_database(database: database::Database) -> Self {
        Self {
            database: Arc::new(database),
        }
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations");
        self.database.migrate().await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Health check for the storage backend
    pub async fn health_check(&self) -> Result<StorageHealthStatus> {
        let mut status = StorageHealthStatus {
            database: false,
            overall: false,
        };

        match self.database.health_check().await {
            Ok(_) => status.database = true,
            Err(e) => {
                warn!("Database health check failed: {}", e);
            }
        }

        status.overall = status.database;

        Ok(status)
    }

    /// Close all connections
    pub async fn close(&self) -> Result<()> {
        info!("Closing storage connections");
        self.database.close().await?;
        Ok(())
    }

    /// Get database pool
    pub fn db(&self) -> &database::Database {
        &self.database
    }

    /// Record a freshly accepted batch in `pending` state
    pub async fn create_batch(&self, ctx: &BatchContext, total: i32) -> Result<()> {
        self.database.create_batch(ctx, total).await
    }

    /// Move a batch to `in_progress` and stamp its start time
    pub async fn mark_batch_started(&self, message_id: Uuid) -> Result<()> {
        self.database.mark_batch_started(message_id).await
    }

    /// Write a batch's terminal status and final counters
    pub async fn finalize_batch(
        &self,
        ctx: &BatchContext,
        counters: &BatchCounters,
        status: BatchStatus,
    ) -> Result<()> {
        self.database.finalize_batch(ctx, counters, status).await
    }

    /// Persist per-recipient outcomes, skipping rows already written
    pub async fn insert_outcomes(
        &self,
        ctx: &BatchContext,
        outcomes: &[RecipientOutcome],
    ) -> Result<u64> {
        self.database.insert_outcomes(ctx, outcomes).await
    }

    /// Fetch one batch summary
    pub async fn get_batch(&self, message_id: Uuid) -> Result<Option<BatchSummary>> {
        self.database.get_batch(message_id).await
    }

    /// List batches newest first, optionally older than a cursor
    pub async fn list_batches(
        &self,
        limit: u64,
        after: Option<DateTime<Utc>>,
    ) -> Result<Vec<BatchSummary>> {
        self.database.list_batches(limit, after).await
    }

    /// Fetch the per-recipient log for one batch
    pub async fn list_outcomes(&self, message_id: Uuid) -> Result<Vec<MessageLogEntry>> {
        self.database.list_outcomes(message_id).await
    }

    /// Apply a provider delivery receipt to the log
    pub async fn record_delivery(&self, provider_sid: &str) -> Result<Option<Uuid>> {
        self.database.record_delivery(provider_sid).await
    }
}

/// Storage health status
#[derive(Debug, Clone, serde::Serialize)]
pub struct StorageHealthStatus {
    /// Database health status
    pub database: bool,
    /// Overall health status
    pub overall: bool,
}
