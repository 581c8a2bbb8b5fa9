//! Batch dispatch pipeline
//!
//! A dispatch flows through three cooperating parts: the `Dispatcher`
//! validates and launches batches, the `FanoutSender` delivers to each
//! recipient under a concurrency bound, and `BatchProgress` aggregates
//! outcome events into wire events and durable counters. Progress
//! subscribers attach through the `ProgressChannels` registry.

mod channel;
mod initiator;
mod progress;
mod sender;
mod types;


// Re-export all public types
pub use channel::{BatchChannel, ProgressChannels, ProgressStream};
pub use initiator::{Dispatcher, DispatcherConfig};
pub use progress::{BatchProgress, ProgressState};
pub use sender::{FanoutConfig, FanoutSender};
pub use types::{
    BatchContext, BatchCounters, BatchJob, BatchStatus, BatchSummary, DeliveryStatus,
    DispatchRequest, FanoutEvent, MessageLogEntry, Owner, OwnerKind, ProgressEvent,
    ProgressSnapshot, Recipient, RecipientOutcome, SendStatus,
};
