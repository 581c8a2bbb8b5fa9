//! Dispatch lifecycle integration tests
//!
//! Drive the dispatcher end to end against a scripted provider and a
//! real in-memory store: validation, fan-out, progress relay, durable
//! flush, deadline handling, and late-outcome merging.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use textblast_rs::core::batch::{BatchStatus, DeliveryStatus, SendStatus};
    use textblast_rs::{DispatchError, DispatchRequest, Dispatcher, DispatcherConfig, Recipient};
    use uuid::Uuid;

    use crate::common::assertions::{
        assert_completed, assert_errored, drain_progress, statuses, wait_for_close,
    };
    use crate::common::database::wait_for_batch;
    use crate::common::fixtures::{self, DispatchRequestFactory};
    use crate::common::{ScriptedProvider, SendScript, TestDatabase};

    /// Config with deadlines tight enough for tests but roomy enough to
    /// never fire on a healthy batch
    fn quick_config() -> DispatcherConfig {
        DispatcherConfig::new()
            .with_concurrency(4)
            .with_send_timeout(Duration::from_secs(5))
            .with_complete_timeout(Duration::from_secs(5))
            .with_late_grace(Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_batch_runs_to_completion() {
        let db = TestDatabase::new().await;
        let provider = Arc::new(ScriptedProvider::succeeding());
        let dispatcher = Dispatcher::new(provider.clone(), db.storage_arc(), quick_config());

        let (message_id, mut stream) = dispatcher
            .submit_with_stream(DispatchRequestFactory::simple(3))
            .await
            .unwrap();

        let events = drain_progress(&mut stream).await;
        assert_completed(&events, message_id);

        // The subscription attached before the runner spawned, so every
        // status event is observed
        let pairs = statuses(&events);
        assert_eq!(pairs.len(), 3);
        assert!(pairs.iter().all(|(_, status)| *status == SendStatus::Success));

        wait_for_close(&mut stream).await;

        let summary = db.storage().get_batch(message_id).await.unwrap().unwrap();
        assert_eq!(summary.status, BatchStatus::Completed);
        assert_eq!(summary.counters.sent, 3);
        assert_eq!(summary.counters.failed, 0);
        assert_eq!(summary.counters.pending, 0);

        let entries = db.storage().list_outcomes(message_id).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert!(
            entries
                .iter()
                .all(|e| e.status == DeliveryStatus::Sent && e.provider_sid.is_some())
        );
        assert_eq!(provider.calls(), 3);
    }

    /// One failing recipient never stops the rest of the batch
    #[tokio::test]
    async fn test_recipient_failure_is_isolated() {
        let db = TestDatabase::new().await;
        let provider = Arc::new(
            ScriptedProvider::succeeding()
                .script(&fixtures::phone(1), SendScript::Fail("carrier rejected")),
        );
        let dispatcher = Dispatcher::new(provider, db.storage_arc(), quick_config());

        let (message_id, mut stream) = dispatcher
            .submit_with_stream(DispatchRequestFactory::simple(3))
            .await
            .unwrap();

        let events = drain_progress(&mut stream).await;
        assert_completed(&events, message_id);

        let pairs = statuses(&events);
        assert_eq!(pairs.len(), 3);
        let failed: Vec<_> = pairs
            .iter()
            .filter(|(_, status)| *status == SendStatus::Failed)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, fixtures::phone(1));

        wait_for_close(&mut stream).await;

        // A batch with terminal failures still completes
        let summary = db.storage().get_batch(message_id).await.unwrap().unwrap();
        assert_eq!(summary.status, BatchStatus::Completed);
        assert_eq!(summary.counters.sent, 2);
        assert_eq!(summary.counters.failed, 1);

        let entries = db.storage().list_outcomes(message_id).await.unwrap();
        let failed_entry = entries
            .iter()
            .find(|e| e.recipient_phone == fixtures::phone(1))
            .unwrap();
        assert_eq!(failed_entry.status, DeliveryStatus::Failed);
        assert!(
            failed_entry
                .error_message
                .as_deref()
                .unwrap()
                .contains("carrier rejected")
        );
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_recipient_list() {
        let db = TestDatabase::new().await;
        let provider = Arc::new(ScriptedProvider::succeeding());
        let dispatcher = Dispatcher::new(provider.clone(), db.storage_arc(), quick_config());

        let err = dispatcher
            .submit(DispatchRequest::new("hello", vec![]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_submit_rejects_blank_message_without_media() {
        let db = TestDatabase::new().await;
        let provider = Arc::new(ScriptedProvider::succeeding());
        let dispatcher = Dispatcher::new(provider, db.storage_arc(), quick_config());

        let err = dispatcher
            .submit(
                DispatchRequest::new("   ", vec![Recipient::new("+18015550000")]),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
    }

    /// Recipient numbers are normalized to E.164 before the provider
    /// sees them, and duplicates collapse to one send
    #[tokio::test]
    async fn test_submit_normalizes_and_deduplicates_recipients() {
        let db = TestDatabase::new().await;
        let provider = Arc::new(ScriptedProvider::succeeding());
        let dispatcher = Dispatcher::new(provider.clone(), db.storage_arc(), quick_config());

        let request = DispatchRequest::new(
            "hello",
            vec![
                Recipient::new("(801) 555-0000"),
                Recipient::new("801.555.0001"),
                Recipient::new("+18015550000"),
            ],
        );
        let (message_id, mut stream) = dispatcher.submit_with_stream(request).await.unwrap();

        let events = drain_progress(&mut stream).await;
        assert_completed(&events, message_id);
        wait_for_close(&mut stream).await;

        let mut sent_to = provider.sent_to();
        sent_to.sort();
        assert_eq!(sent_to, vec!["+18015550000", "+18015550001"]);
    }

    #[tokio::test]
    async fn test_client_minted_id_is_honored() {
        let db = TestDatabase::new().await;
        let provider = Arc::new(ScriptedProvider::succeeding());
        let dispatcher = Dispatcher::new(provider, db.storage_arc(), quick_config());

        let message_id = Uuid::new_v4();
        let returned = dispatcher
            .submit(DispatchRequestFactory::simple(1), Some(message_id))
            .await
            .unwrap();
        assert_eq!(returned, message_id);

        wait_for_batch(db.storage(), message_id, |s| s.status.is_terminal()).await;
    }

    /// Reusing an id conflicts whether the first batch is in flight or
    /// already finished
    #[tokio::test]
    async fn test_reused_message_id_conflicts() {
        let db = TestDatabase::new().await;
        let provider = Arc::new(ScriptedProvider::succeeding());
        let dispatcher = Dispatcher::new(provider, db.storage_arc(), quick_config());

        let message_id = Uuid::new_v4();
        dispatcher
            .submit(DispatchRequestFactory::simple(1), Some(message_id))
            .await
            .unwrap();

        let err = dispatcher
            .submit(DispatchRequestFactory::simple(1), Some(message_id))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Conflict(_)));

        // Still a conflict once the first batch is done and its relay gone
        wait_for_batch(db.storage(), message_id, |s| s.status.is_terminal()).await;
        let err = dispatcher
            .submit(DispatchRequestFactory::simple(1), Some(message_id))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Conflict(_)));
    }

    /// A recipient that never resolves trips the batch deadline; the
    /// batch flushes as errored with the hung recipient still pending
    #[tokio::test]
    async fn test_batch_deadline_marks_errored() {
        let db = TestDatabase::new().await;
        let provider =
            Arc::new(ScriptedProvider::succeeding().script(&fixtures::phone(1), SendScript::Hang));
        let config = DispatcherConfig::new()
            .with_concurrency(2)
            .with_send_timeout(Duration::from_secs(30))
            .with_complete_timeout(Duration::from_millis(250))
            .with_late_grace(Duration::from_millis(100));
        let dispatcher = Dispatcher::new(provider, db.storage_arc(), config);

        let (message_id, mut stream) = dispatcher
            .submit_with_stream(DispatchRequestFactory::simple(2))
            .await
            .unwrap();

        let events = drain_progress(&mut stream).await;
        let reason = assert_errored(&events);
        assert!(reason.contains("did not complete"));

        let pairs = statuses(&events);
        assert!(
            pairs
                .iter()
                .any(|(r, s)| r == &fixtures::phone(0) && *s == SendStatus::Success)
        );

        let summary =
            wait_for_batch(db.storage(), message_id, |s| s.status == BatchStatus::Errored).await;
        assert_eq!(summary.counters.sent, 1);
        assert_eq!(summary.counters.pending, 1);

        // The resolved recipient made it into the durable log
        let entries = db.storage().list_outcomes(message_id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].recipient_phone, fixtures::phone(0));
    }

    /// Outcomes landing after the deadline merge during the grace
    /// window; full accounting upgrades the batch to completed
    #[tokio::test]
    async fn test_late_outcomes_upgrade_errored_batch() {
        let db = TestDatabase::new().await;
        let provider = Arc::new(
            ScriptedProvider::succeeding()
                .script(&fixtures::phone(1), SendScript::Delay(Duration::from_millis(400))),
        );
        let config = DispatcherConfig::new()
            .with_concurrency(2)
            .with_send_timeout(Duration::from_secs(5))
            .with_complete_timeout(Duration::from_millis(150))
            .with_late_grace(Duration::from_secs(2));
        let dispatcher = Dispatcher::new(provider, db.storage_arc(), config);

        let (message_id, mut stream) = dispatcher
            .submit_with_stream(DispatchRequestFactory::simple(2))
            .await
            .unwrap();

        // Subscribers see the deadline as a terminal error
        let events = drain_progress(&mut stream).await;
        assert_errored(&events);

        // The durable record tells the upgraded story
        let summary = wait_for_batch(db.storage(), message_id, |s| {
            s.status == BatchStatus::Completed
        })
        .await;
        assert_eq!(summary.counters.sent, 2);
        assert_eq!(summary.counters.pending, 0);

        let entries = db.storage().list_outcomes(message_id).await.unwrap();
        assert_eq!(entries.len(), 2);
    }

    /// Media-only dispatches are valid
    #[tokio::test]
    async fn test_media_only_dispatch() {
        let db = TestDatabase::new().await;
        let provider = Arc::new(ScriptedProvider::succeeding());
        let dispatcher = Dispatcher::new(provider, db.storage_arc(), quick_config());

        let request = DispatchRequest::new("", vec![Recipient::new("+18015550000")]).with_media(
            vec!["https://cdn.example.org/flyer.png".parse().unwrap()],
        );
        let (message_id, mut stream) = dispatcher.submit_with_stream(request).await.unwrap();

        let events = drain_progress(&mut stream).await;
        assert_completed(&events, message_id);
        wait_for_close(&mut stream).await;

        let entries = db.storage().list_outcomes(message_id).await.unwrap();
        assert_eq!(entries[0].media_urls, vec!["https://cdn.example.org/flyer.png"]);
    }
}
