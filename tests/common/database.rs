//! Test database utilities
//!
//! Provides in-memory SQLite database for testing without external dependencies.
//! Each test gets an isolated database instance using SeaORM.

use std::sync::Arc;
use std::time::Duration;

use textblast_rs::config::DatabaseConfig;
use textblast_rs::storage::StorageLayer;
use textblast_rs::storage::database::Database;
use uuid::Uuid;

/// Test database wrapper providing isolated in-memory SQLite instances
#[derive(Debug, Clone)]
pub struct TestDatabase {
    inner: Arc<StorageLayer>,
}

impl TestDatabase {
    /// Create a new in-memory test database with migrations applied
    ///
    /// Note: This uses SQLite in-memory mode which requires the 'sqlite' feature.
    /// Each call creates a completely isolated database instance.
    pub async fn new() -> Self {
        let db = Database::new(&test_db_config())
            .await
            .expect("Failed to create in-memory test database");

        db.migrate()
            .await
            .expect("Failed to run database migrations");

        Self {
            inner: Arc::new(StorageLayer::with_database(db)),
        }
    }

    /// Get reference to the storage layer
    pub fn storage(&self) -> &StorageLayer {
        &self.inner
    }

    /// Get Arc to the storage layer, as the dispatcher expects it
    pub fn storage_arc(&self) -> Arc<StorageLayer> {
        Arc::clone(&self.inner)
    }
}

/// Helper to create a simple test database config
pub fn test_db_config() -> DatabaseConfig {
    DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        // In-memory DB only supports 1 connection
        max_connections: 1,
        connection_timeout: 5,
        sqlite_fallback: false,
    }
}

/// Poll the stored batch until `predicate` holds or the deadline passes
///
/// The batch runner flushes from a detached task, so tests that assert on
/// durable state after a terminal progress event need to wait for the
/// flush rather than read immediately.
pub async fn wait_for_batch<F>(
    storage: &StorageLayer,
    message_id: Uuid,
    predicate: F,
) -> textblast_rs::BatchSummary
where
    F: Fn(&textblast_rs::BatchSummary) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(summary) = storage
            .get_batch(message_id)
            .await
            .expect("Failed to read batch")
        {
            if predicate(&summary) {
                return summary;
            }
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("batch {} did not reach the expected state in time", message_id);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_creation() {
        let db = TestDatabase::new().await;
        // Database should be created and migrations run
        assert!(db.storage().health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_databases_are_isolated() {
        use textblast_rs::core::batch::BatchContext;
        use textblast_rs::{DispatchRequest, Recipient};

        let first = TestDatabase::new().await;
        let second = TestDatabase::new().await;

        let request = DispatchRequest::new("hi", vec![Recipient::new("+18015550001")]);
        let ctx = BatchContext::new(Uuid::new_v4(), &request);
        first
            .storage()
            .create_batch(&ctx, 1)
            .await
            .expect("create failed");

        let batches = first
            .storage()
            .list_batches(10, None)
            .await
            .expect("list failed");
        assert_eq!(batches.len(), 1);

        let batches = second
            .storage()
            .list_batches(10, None)
            .await
            .expect("list failed");
        assert!(batches.is_empty());
    }
}
