//! Progress channel and stream semantics
//!
//! The relay registry backs both embedded subscribers and the SSE
//! surface. These tests pin down adoption of pre-subscriptions, relay
//! teardown, and lag behavior.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use textblast_rs::core::batch::{BatchStatus, ProgressChannels};
    use textblast_rs::{DispatchError, Dispatcher, DispatcherConfig, ProgressEvent};
    use uuid::Uuid;

    use crate::common::assertions::{assert_completed, drain_progress, statuses};
    use crate::common::database::wait_for_batch;
    use crate::common::fixtures::DispatchRequestFactory;
    use crate::common::{ScriptedProvider, TestDatabase};

    #[tokio::test]
    async fn test_open_claims_id_exactly_once() {
        let channels = ProgressChannels::new(16);
        let id = Uuid::new_v4();

        let _channel = channels.open(id).unwrap();
        assert!(channels.is_active(id));

        let err = channels.open(id).unwrap_err();
        assert!(matches!(err, DispatchError::Conflict(_)));

        // The id is reusable at the channel layer once the relay is gone
        channels.close(id);
        assert!(!channels.is_active(id));
        assert!(channels.open(id).is_ok());
    }

    #[tokio::test]
    async fn test_relay_reaches_subscriber_and_close_ends_stream() {
        let channels = ProgressChannels::new(16);
        let id = Uuid::new_v4();

        let mut stream = channels.subscribe(id);
        let _channel = channels.open(id).unwrap();

        channels.relay(id, ProgressEvent::Connected);
        channels.close(id);

        assert_eq!(stream.recv().await.unwrap(), Some(ProgressEvent::Connected));
        assert_eq!(stream.recv().await.unwrap(), None);
    }

    /// A subscriber may attach before any dispatch claims the id
    #[tokio::test]
    async fn test_pre_subscription_is_adopted_by_dispatch() {
        let channels = ProgressChannels::new(16);
        let id = Uuid::new_v4();

        let stream = channels.subscribe(id);
        assert!(!channels.is_active(id));
        assert_eq!(channels.active_count(), 0);

        let _channel = channels.open(id).unwrap();
        assert!(channels.is_active(id));
        assert_eq!(channels.active_count(), 1);

        // Adoption outlives the subscriber
        drop(stream);
        assert!(channels.is_active(id));
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_events() {
        let channels = ProgressChannels::new(16);
        let id = Uuid::new_v4();

        let mut first = channels.subscribe(id);
        let mut second = channels.subscribe(id);
        let _channel = channels.open(id).unwrap();

        channels.relay(id, ProgressEvent::Connected);
        channels.close(id);

        for stream in [&mut first, &mut second] {
            assert_eq!(stream.recv().await.unwrap(), Some(ProgressEvent::Connected));
            assert_eq!(stream.recv().await.unwrap(), None);
        }
    }

    /// Events relayed with no subscriber attached are dropped, and a
    /// late subscriber only sees what follows its attach
    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let channels = ProgressChannels::new(16);
        let id = Uuid::new_v4();

        let _channel = channels.open(id).unwrap();
        channels.relay(id, ProgressEvent::Connected);

        let mut late = channels.subscribe(id);
        channels.relay(id, ProgressEvent::Complete { message_id: id });
        channels.close(id);

        assert_eq!(
            late.recv().await.unwrap(),
            Some(ProgressEvent::Complete { message_id: id })
        );
        assert_eq!(late.recv().await.unwrap(), None);
    }

    /// The client-minted-id flow: subscribe first, dispatch second,
    /// observe the batch from its first event
    #[tokio::test]
    async fn test_subscribe_before_dispatch_sees_every_event() {
        let db = TestDatabase::new().await;
        let provider = Arc::new(ScriptedProvider::succeeding());
        let dispatcher = Dispatcher::new(
            provider,
            db.storage_arc(),
            DispatcherConfig::new().with_concurrency(2),
        );

        let message_id = Uuid::new_v4();
        let mut stream = dispatcher.channels().subscribe(message_id);

        dispatcher
            .submit(DispatchRequestFactory::simple(2), Some(message_id))
            .await
            .unwrap();

        let events = drain_progress(&mut stream).await;
        assert_eq!(statuses(&events).len(), 2);
        assert_completed(&events, message_id);
    }

    /// A subscriber that stops polling gets a lag error instead of a
    /// silently gapped sequence
    #[tokio::test]
    async fn test_lagged_subscriber_gets_transport_error() {
        let db = TestDatabase::new().await;
        let provider = Arc::new(ScriptedProvider::succeeding());
        let config = DispatcherConfig {
            concurrency: 4,
            send_timeout: Duration::from_secs(5),
            complete_timeout: Duration::from_secs(5),
            late_grace: Duration::from_millis(100),
            event_buffer: 1,
        };
        let dispatcher = Dispatcher::new(provider, db.storage_arc(), config);

        let message_id = Uuid::new_v4();
        let mut stream = dispatcher.channels().subscribe(message_id);
        dispatcher
            .submit(DispatchRequestFactory::simple(8), Some(message_id))
            .await
            .unwrap();

        // Let the batch finish without polling the stream once
        wait_for_batch(db.storage(), message_id, |s| {
            s.status == BatchStatus::Completed
        })
        .await;

        let err = stream.recv().await.unwrap_err();
        assert!(matches!(err, DispatchError::StreamClosed(_)));
        assert!(err.to_string().contains("lagged"));

        // The stream recovers to deliver what the buffer retained
        assert_eq!(
            stream.recv().await.unwrap(),
            Some(ProgressEvent::Complete { message_id })
        );
    }
}
