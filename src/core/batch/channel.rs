//! Per-batch progress channels
//!
//! Each in-flight batch owns two links: a bounded mpsc spine carrying
//! fan-out events to the batch runner, and a broadcast relay carrying
//! wire events from the runner to subscribers. The registry tracks
//! relays by message id and enforces one active batch per id.
//!
//! Subscribers may attach before the dispatch arrives. Such a relay is
//! created inactive and adopted by the dispatch when it claims the id,
//! which is what lets clients open their event stream first and trigger
//! the send second without losing events.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::debug;
use uuid::Uuid;

use super::types::{FanoutEvent, ProgressEvent};
use crate::utils::error::{DispatchError, Result};

struct RelayEntry {
    tx: broadcast::Sender<ProgressEvent>,
    /// True once a dispatch owns the id; pre-subscriptions start false
    active: bool,
}

/// Links handed to the batch runner at dispatch time
#[derive(Debug)]
pub struct BatchChannel {
    pub message_id: Uuid,
    /// Cloned into each fan-out worker
    pub outcomes_tx: mpsc::Sender<FanoutEvent>,
    /// Consumed by the batch runner
    pub outcomes_rx: mpsc::Receiver<FanoutEvent>,
}

/// Registry of progress relays for in-flight batches
#[derive(Clone)]
pub struct ProgressChannels {
    relays: Arc<DashMap<Uuid, RelayEntry>>,
    capacity: usize,
}

impl ProgressChannels {
    /// `capacity` bounds both the event spine and each relay buffer
    pub fn new(capacity: usize) -> Self {
        Self {
            relays: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Claim `message_id` for a dispatch and build its event spine
    ///
    /// A pre-subscribed relay is adopted. An id already claimed by an
    /// in-flight batch is a conflict.
    pub fn open(&self, message_id: Uuid) -> Result<BatchChannel> {
        match self.relays.entry(message_id) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.active {
                    return Err(DispatchError::Conflict(format!(
                        "batch {} is already in flight",
                        message_id
                    )));
                }
                entry.active = true;
            }
            Entry::Vacant(vacant) => {
                let (tx, _) = broadcast::channel(self.capacity);
                vacant.insert(RelayEntry { tx, active: true });
            }
        }

        let (outcomes_tx, outcomes_rx) = mpsc::channel(self.capacity);
        Ok(BatchChannel {
            message_id,
            outcomes_tx,
            outcomes_rx,
        })
    }

    /// Attach a subscriber to `message_id`
    ///
    /// When no dispatch has claimed the id yet the relay is pre-created,
    /// so the subscriber will see the batch from its first event.
    pub fn subscribe(&self, message_id: Uuid) -> ProgressStream {
        let rx = match self.relays.entry(message_id) {
            Entry::Occupied(occupied) => occupied.get().tx.subscribe(),
            Entry::Vacant(vacant) => {
                let (tx, rx) = broadcast::channel(self.capacity);
                vacant.insert(RelayEntry { tx, active: false });
                rx
            }
        };
        ProgressStream {
            message_id,
            inner: Some(BroadcastStream::new(rx)),
            channels: self.clone(),
        }
    }

    /// Relay a wire event to subscribers
    ///
    /// A relay with no subscribers drops the event; that is not an error.
    pub fn relay(&self, message_id: Uuid, event: ProgressEvent) {
        if let Some(entry) = self.relays.get(&message_id) {
            let _ = entry.tx.send(event);
        }
    }

    /// Tear down the relay; subscribers observe end-of-stream
    pub fn close(&self, message_id: Uuid) {
        if self.relays.remove(&message_id).is_some() {
            debug!(message_id = %message_id, "progress relay closed");
        }
    }

    pub fn is_active(&self, message_id: Uuid) -> bool {
        self.relays
            .get(&message_id)
            .map(|entry| entry.active)
            .unwrap_or(false)
    }

    /// Number of batches currently claimed by a dispatch
    pub fn active_count(&self) -> usize {
        self.relays.iter().filter(|entry| entry.active).count()
    }

    /// Drop a pre-subscription relay once its last subscriber detaches
    fn release_if_idle(&self, message_id: Uuid) {
        self.relays
            .remove_if(&message_id, |_, entry| {
                !entry.active && entry.tx.receiver_count() == 0
            });
    }
}

/// A subscriber's view of one batch's progress events
pub struct ProgressStream {
    message_id: Uuid,
    inner: Option<BroadcastStream<ProgressEvent>>,
    channels: ProgressChannels,
}

impl ProgressStream {
    pub fn message_id(&self) -> Uuid {
        self.message_id
    }

    /// Receive the next relayed event
    ///
    /// `Ok(None)` means the relay closed. A lagged subscriber gets an
    /// error instead of a gapped sequence it would misinterpret.
    pub async fn recv(&mut self) -> Result<Option<ProgressEvent>> {
        use tokio_stream::StreamExt;

        let Some(inner) = self.inner.as_mut() else {
            return Ok(None);
        };
        match inner.next().await {
            Some(Ok(event)) => Ok(Some(event)),
            Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                Err(DispatchError::StreamClosed(format!(
                    "subscriber lagged {} events behind batch {}",
                    skipped, self.message_id
                )))
            }
            None => Ok(None),
        }
    }
}

impl Drop for ProgressStream {
    fn drop(&mut self) {
        // Release the receiver before the idle check counts subscribers
        self.inner.take();
        self.channels.release_if_idle(self.message_id);
    }
}
