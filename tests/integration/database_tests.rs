//! Database integration tests
//!
//! Tests batch log operations using a real in-memory SQLite database.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use textblast_rs::core::batch::{BatchCounters, BatchStatus, DeliveryStatus};
    use uuid::Uuid;

    use crate::common::TestDatabase;
    use crate::common::fixtures::{self, DispatchRequestFactory, OutcomeFactory};

    /// Test that an accepted batch round-trips through the store
    #[tokio::test]
    async fn test_batch_round_trip() {
        let db = TestDatabase::new().await;
        let message_id = Uuid::new_v4();
        let request = DispatchRequestFactory::owned_by_community(3);
        let ctx = fixtures::batch_context(message_id, &request);

        db.storage().create_batch(&ctx, 3).await.unwrap();

        let summary = db.storage().get_batch(message_id).await.unwrap().unwrap();
        assert_eq!(summary.message_id, message_id);
        assert_eq!(summary.body, request.message);
        assert_eq!(summary.status, BatchStatus::Pending);
        assert_eq!(summary.counters.total, 3);
        assert_eq!(summary.counters.pending, 3);
        assert_eq!(summary.counters.sent, 0);
        assert_eq!(summary.owner.as_ref().unwrap().id, "42");
        assert!(summary.started_at.is_none());
        assert!(summary.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_get_unknown_batch_returns_none() {
        let db = TestDatabase::new().await;
        let found = db.storage().get_batch(Uuid::new_v4()).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_mark_batch_started() {
        let db = TestDatabase::new().await;
        let message_id = Uuid::new_v4();
        let request = DispatchRequestFactory::simple(2);
        let ctx = fixtures::batch_context(message_id, &request);

        db.storage().create_batch(&ctx, 2).await.unwrap();
        db.storage().mark_batch_started(message_id).await.unwrap();

        let summary = db.storage().get_batch(message_id).await.unwrap().unwrap();
        assert_eq!(summary.status, BatchStatus::InProgress);
        assert!(summary.started_at.is_some());
    }

    #[tokio::test]
    async fn test_mark_missing_batch_is_not_found() {
        let db = TestDatabase::new().await;
        let err = db
            .storage()
            .mark_batch_started(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    /// Test that repeated flushes of one batch keep moving its counters
    #[tokio::test]
    async fn test_finalize_batch_is_repeatable() {
        let db = TestDatabase::new().await;
        let message_id = Uuid::new_v4();
        let request = DispatchRequestFactory::simple(3);
        let ctx = fixtures::batch_context(message_id, &request);

        db.storage().create_batch(&ctx, 3).await.unwrap();

        // First flush: one recipient still unaccounted
        let counters = BatchCounters {
            total: 3,
            pending: 1,
            sent: 1,
            delivered: 0,
            failed: 1,
        };
        db.storage()
            .finalize_batch(&ctx, &counters, BatchStatus::Errored)
            .await
            .unwrap();

        let summary = db.storage().get_batch(message_id).await.unwrap().unwrap();
        assert_eq!(summary.status, BatchStatus::Errored);
        assert_eq!(summary.counters.pending, 1);
        assert!(summary.completed_at.is_some());

        // Second flush after a late outcome accounted for everyone
        let counters = BatchCounters {
            total: 3,
            pending: 0,
            sent: 2,
            delivered: 0,
            failed: 1,
        };
        db.storage()
            .finalize_batch(&ctx, &counters, BatchStatus::Completed)
            .await
            .unwrap();

        let summary = db.storage().get_batch(message_id).await.unwrap().unwrap();
        assert_eq!(summary.status, BatchStatus::Completed);
        assert_eq!(summary.counters.pending, 0);
        assert_eq!(summary.counters.sent, 2);
        assert_eq!(summary.counters.failed, 1);
    }

    /// Test that the outcome log deduplicates on (batch, recipient)
    #[tokio::test]
    async fn test_insert_outcomes_deduplicates() {
        let db = TestDatabase::new().await;
        let message_id = Uuid::new_v4();
        let request = DispatchRequestFactory::simple(2);
        let ctx = fixtures::batch_context(message_id, &request);
        db.storage().create_batch(&ctx, 2).await.unwrap();

        let outcomes = vec![
            OutcomeFactory::sent(0, "SM0001"),
            OutcomeFactory::failed(1, "carrier rejected"),
        ];

        let inserted = db.storage().insert_outcomes(&ctx, &outcomes).await.unwrap();
        assert_eq!(inserted, 2);

        // A second flush of the same outcomes inserts nothing
        let inserted = db.storage().insert_outcomes(&ctx, &outcomes).await.unwrap();
        assert_eq!(inserted, 0);

        let entries = db.storage().list_outcomes(message_id).await.unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn test_insert_no_outcomes_is_noop() {
        let db = TestDatabase::new().await;
        let ctx = fixtures::batch_context(Uuid::new_v4(), &DispatchRequestFactory::simple(1));
        let inserted = db.storage().insert_outcomes(&ctx, &[]).await.unwrap();
        assert_eq!(inserted, 0);
    }

    /// Test that log rows carry the denormalized batch fields
    #[tokio::test]
    async fn test_log_entries_preserve_fields() {
        let db = TestDatabase::new().await;
        let message_id = Uuid::new_v4();
        let request = DispatchRequestFactory::owned_by_community(2).with_media(vec![
            "https://cdn.example.org/flyer.png".parse().unwrap(),
        ]);
        let ctx = fixtures::batch_context(message_id, &request);
        db.storage().create_batch(&ctx, 2).await.unwrap();

        let outcomes = vec![
            OutcomeFactory::sent(0, "SM0001"),
            OutcomeFactory::failed(1, "carrier rejected"),
        ];
        db.storage().insert_outcomes(&ctx, &outcomes).await.unwrap();

        let entries = db.storage().list_outcomes(message_id).await.unwrap();
        assert_eq!(entries.len(), 2);

        let sent = &entries[0];
        assert_eq!(sent.message_id, message_id);
        assert_eq!(sent.recipient_phone, fixtures::phone(0));
        assert_eq!(sent.status, DeliveryStatus::Sent);
        assert_eq!(sent.provider_sid.as_deref(), Some("SM0001"));
        assert_eq!(sent.body, request.message);
        assert_eq!(sent.media_urls, vec!["https://cdn.example.org/flyer.png"]);
        assert_eq!(sent.owner.as_ref().unwrap().id, "42");
        assert!(sent.delivered_at.is_none());

        let failed = &entries[1];
        assert_eq!(failed.status, DeliveryStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("carrier rejected"));
        assert!(failed.provider_sid.is_none());
    }

    /// Test that a delivery receipt moves one message from sent to delivered
    #[tokio::test]
    async fn test_record_delivery_moves_counters() {
        let db = TestDatabase::new().await;
        let message_id = Uuid::new_v4();
        let request = DispatchRequestFactory::simple(2);
        let ctx = fixtures::batch_context(message_id, &request);
        db.storage().create_batch(&ctx, 2).await.unwrap();

        let outcomes = vec![
            OutcomeFactory::sent(0, "SM0001"),
            OutcomeFactory::sent(1, "SM0002"),
        ];
        db.storage().insert_outcomes(&ctx, &outcomes).await.unwrap();
        let counters = BatchCounters {
            total: 2,
            pending: 0,
            sent: 2,
            delivered: 0,
            failed: 0,
        };
        db.storage()
            .finalize_batch(&ctx, &counters, BatchStatus::Completed)
            .await
            .unwrap();

        let updated = db.storage().record_delivery("SM0001").await.unwrap();
        assert_eq!(updated, Some(message_id));

        let summary = db.storage().get_batch(message_id).await.unwrap().unwrap();
        assert_eq!(summary.counters.sent, 1);
        assert_eq!(summary.counters.delivered, 1);

        let entries = db.storage().list_outcomes(message_id).await.unwrap();
        let delivered = entries
            .iter()
            .find(|e| e.provider_sid.as_deref() == Some("SM0001"))
            .unwrap();
        assert_eq!(delivered.status, DeliveryStatus::Delivered);
        assert!(delivered.delivered_at.is_some());
    }

    /// Test that replayed delivery receipts do not double-count
    #[tokio::test]
    async fn test_record_delivery_is_idempotent() {
        let db = TestDatabase::new().await;
        let message_id = Uuid::new_v4();
        let request = DispatchRequestFactory::simple(1);
        let ctx = fixtures::batch_context(message_id, &request);
        db.storage().create_batch(&ctx, 1).await.unwrap();
        db.storage()
            .insert_outcomes(&ctx, &[OutcomeFactory::sent(0, "SM0001")])
            .await
            .unwrap();
        let counters = BatchCounters {
            total: 1,
            pending: 0,
            sent: 1,
            delivered: 0,
            failed: 0,
        };
        db.storage()
            .finalize_batch(&ctx, &counters, BatchStatus::Completed)
            .await
            .unwrap();

        assert_eq!(
            db.storage().record_delivery("SM0001").await.unwrap(),
            Some(message_id)
        );
        assert_eq!(
            db.storage().record_delivery("SM0001").await.unwrap(),
            Some(message_id)
        );

        let summary = db.storage().get_batch(message_id).await.unwrap().unwrap();
        assert_eq!(summary.counters.sent, 0);
        assert_eq!(summary.counters.delivered, 1);
    }

    /// Test that a late reflush does not erase a recorded delivery
    #[tokio::test]
    async fn test_finalize_after_delivery_keeps_delivered_count() {
        let db = TestDatabase::new().await;
        let message_id = Uuid::new_v4();
        let request = DispatchRequestFactory::simple(2);
        let ctx = fixtures::batch_context(message_id, &request);
        db.storage().create_batch(&ctx, 2).await.unwrap();

        // Errored flush with one recipient still unaccounted
        db.storage()
            .insert_outcomes(&ctx, &[OutcomeFactory::sent(0, "SM0001")])
            .await
            .unwrap();
        let counters = BatchCounters {
            total: 2,
            pending: 1,
            sent: 1,
            delivered: 0,
            failed: 0,
        };
        db.storage()
            .finalize_batch(&ctx, &counters, BatchStatus::Errored)
            .await
            .unwrap();

        // A delivery receipt lands between the errored flush and the
        // late reflush
        assert_eq!(
            db.storage().record_delivery("SM0001").await.unwrap(),
            Some(message_id)
        );

        // A late outcome accounts for the second recipient; the
        // aggregator still counts the delivered one as sent
        let counters = BatchCounters {
            total: 2,
            pending: 0,
            sent: 2,
            delivered: 0,
            failed: 0,
        };
        db.storage()
            .finalize_batch(&ctx, &counters, BatchStatus::Completed)
            .await
            .unwrap();

        let summary = db.storage().get_batch(message_id).await.unwrap().unwrap();
        assert_eq!(summary.status, BatchStatus::Completed);
        assert_eq!(summary.counters.delivered, 1);
        assert_eq!(summary.counters.sent, 1);
        assert_eq!(summary.counters.pending, 0);
        assert_eq!(
            summary.counters.sent + summary.counters.delivered + summary.counters.failed,
            summary.counters.total
        );
    }

    #[tokio::test]
    async fn test_record_delivery_unknown_sid_returns_none() {
        let db = TestDatabase::new().await;
        let updated = db.storage().record_delivery("SMmissing").await.unwrap();
        assert!(updated.is_none());
    }

    /// Test cursor pagination over batch history, newest first
    #[tokio::test]
    async fn test_list_batches_pages_backwards() {
        let db = TestDatabase::new().await;

        let mut ids = Vec::new();
        for i in 0..3 {
            let message_id = Uuid::new_v4();
            let request = DispatchRequestFactory::with_message(&format!("batch {}", i), 1);
            let ctx = fixtures::batch_context(message_id, &request);
            db.storage().create_batch(&ctx, 1).await.unwrap();
            ids.push(message_id);
            // Distinct created_at values keep the cursor unambiguous
            tokio::time::sleep(Duration::from_millis(15)).await;
        }

        let first_page = db.storage().list_batches(2, None).await.unwrap();
        assert_eq!(first_page.len(), 2);
        assert_eq!(first_page[0].message_id, ids[2]);
        assert_eq!(first_page[1].message_id, ids[1]);

        let cursor = first_page.last().unwrap().created_at;
        let second_page = db.storage().list_batches(2, Some(cursor)).await.unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].message_id, ids[0]);
    }
}
