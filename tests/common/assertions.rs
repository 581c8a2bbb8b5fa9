//! Custom test assertions
//!
//! Provides domain-specific helpers for progress streams and wire events.

use std::time::Duration;

use textblast_rs::core::batch::SendStatus;
use textblast_rs::{ProgressEvent, ProgressStream};
use uuid::Uuid;

const STREAM_WAIT: Duration = Duration::from_secs(5);

/// Receive events until a terminal event arrives or the relay closes
///
/// Returns everything observed, terminal event included when one arrived.
pub async fn drain_progress(stream: &mut ProgressStream) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    loop {
        match tokio::time::timeout(STREAM_WAIT, stream.recv()).await {
            Ok(Ok(Some(event))) => {
                let terminal = event.is_terminal();
                events.push(event);
                if terminal {
                    break;
                }
            }
            Ok(Ok(None)) => break,
            Ok(Err(err)) => panic!("progress stream failed: {}", err),
            Err(_) => panic!("progress stream produced no event within {:?}", STREAM_WAIT),
        }
    }
    events
}

/// Wait until the relay closes
///
/// The completed-path runner flushes durable state before tearing the
/// relay down, so tests can read the database as soon as this returns.
pub async fn wait_for_close(stream: &mut ProgressStream) {
    loop {
        match tokio::time::timeout(STREAM_WAIT, stream.recv()).await {
            Ok(Ok(Some(_))) => continue,
            Ok(Ok(None)) => return,
            // A lagged subscriber can still observe the close
            Ok(Err(_)) => continue,
            Err(_) => panic!("relay did not close within {:?}", STREAM_WAIT),
        }
    }
}

/// Status events as (recipient, status) pairs, in arrival order
pub fn statuses(events: &[ProgressEvent]) -> Vec<(String, SendStatus)> {
    events
        .iter()
        .filter_map(|event| match event {
            ProgressEvent::Status {
                recipient, status, ..
            } => Some((recipient.clone(), *status)),
            _ => None,
        })
        .collect()
}

/// Assert the last event is `Complete` for the given batch
pub fn assert_completed(events: &[ProgressEvent], message_id: Uuid) {
    match events.last() {
        Some(ProgressEvent::Complete { message_id: id }) => assert_eq!(*id, message_id),
        other => panic!("expected terminal Complete event, got {:?}", other),
    }
}

/// Assert the last event is `Error` and return its reason
pub fn assert_errored(events: &[ProgressEvent]) -> String {
    match events.last() {
        Some(ProgressEvent::Error { error, .. }) => error.clone(),
        other => panic!("expected terminal Error event, got {:?}", other),
    }
}

/// Assert a collection contains an item matching a predicate
#[macro_export]
macro_rules! assert_contains {
    ($collection:expr, $predicate:expr) => {
        assert!(
            $collection.iter().any($predicate),
            "Collection does not contain expected item"
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statuses_extracts_pairs_in_order() {
        let id = Uuid::new_v4();
        let events = vec![
            ProgressEvent::Connected,
            ProgressEvent::Status {
                message_id: id,
                recipient: "+18015550000".to_string(),
                status: SendStatus::Success,
                error: None,
            },
            ProgressEvent::Status {
                message_id: id,
                recipient: "+18015550001".to_string(),
                status: SendStatus::Failed,
                error: Some("carrier rejected".to_string()),
            },
            ProgressEvent::Complete { message_id: id },
        ];

        let pairs = statuses(&events);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], ("+18015550000".to_string(), SendStatus::Success));
        assert_eq!(pairs[1], ("+18015550001".to_string(), SendStatus::Failed));
        assert_completed(&events, id);
    }

    #[test]
    #[should_panic(expected = "expected terminal Complete event")]
    fn test_assert_completed_panics_on_error_event() {
        let id = Uuid::new_v4();
        let events = vec![ProgressEvent::Error {
            message_id: id,
            error: "batch timed out".to_string(),
        }];
        assert_completed(&events, id);
    }

    #[test]
    fn test_contains_macro() {
        let items = [1, 2, 3, 4, 5];
        assert_contains!(items, |&x| x == 3);
    }
}
