//! Batch progress aggregation
//!
//! [`BatchProgress`] is the single accounting authority for one batch. It
//! consumes fan-out events, deduplicates outcomes per recipient, and
//! decides which wire events subscribers see. All mutation goes through
//! one owner task, so the struct itself needs no locking.

use ahash::AHashSet;
use tracing::{debug, warn};
use uuid::Uuid;

use super::types::{
    BatchCounters, BatchStatus, FanoutEvent, ProgressEvent, ProgressSnapshot, RecipientOutcome,
    SendStatus,
};

/// Aggregation state of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    /// Accepting outcomes and relaying them
    Open,
    /// Every recipient accounted for
    Complete,
    /// Ended without full accounting; still merging late outcomes
    Errored,
}

/// Accounting for one in-flight batch
#[derive(Debug)]
pub struct BatchProgress {
    message_id: Uuid,
    total: usize,
    successful: usize,
    failed: usize,
    state: ProgressState,
    seen: AHashSet<String>,
    outcomes: Vec<RecipientOutcome>,
}

impl BatchProgress {
    pub fn new(message_id: Uuid, total: usize) -> Self {
        Self {
            message_id,
            total,
            successful: 0,
            failed: 0,
            state: ProgressState::Open,
            seen: AHashSet::with_capacity(total),
            outcomes: Vec::with_capacity(total),
        }
    }

    /// Fold one fan-out event into the accounting
    ///
    /// Returns the wire event subscribers should see, or `None` when the
    /// event changes nothing visible: duplicates, outcomes arriving after
    /// `Complete`, and late outcomes merged while `Errored`.
    pub fn apply(&mut self, event: FanoutEvent) -> Option<ProgressEvent> {
        match event {
            FanoutEvent::Outcome(outcome) => self.apply_outcome(outcome),
            FanoutEvent::Complete => self.apply_complete(),
        }
    }

    fn apply_outcome(&mut self, outcome: RecipientOutcome) -> Option<ProgressEvent> {
        if self.state == ProgressState::Complete {
            debug!(
                message_id = %self.message_id,
                recipient = %outcome.recipient.phone,
                "dropping outcome received after complete"
            );
            return None;
        }

        // Idempotence: one outcome per recipient, first wins
        if !self.seen.insert(outcome.recipient.phone.clone()) {
            debug!(
                message_id = %self.message_id,
                recipient = %outcome.recipient.phone,
                "ignoring duplicate outcome"
            );
            return None;
        }

        let wire = ProgressEvent::Status {
            message_id: self.message_id,
            recipient: outcome.recipient.phone.clone(),
            status: if outcome.is_success() {
                SendStatus::Success
            } else {
                SendStatus::Failed
            },
            error: outcome.error.clone(),
        };

        if outcome.is_success() {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.outcomes.push(outcome);

        match self.state {
            ProgressState::Open => Some(wire),
            // Late merge: counted, but subscribers already saw a terminal event
            ProgressState::Errored => None,
            ProgressState::Complete => unreachable!("complete handled above"),
        }
    }

    fn apply_complete(&mut self) -> Option<ProgressEvent> {
        match self.state {
            ProgressState::Open => {
                if !self.is_fully_accounted() {
                    warn!(
                        message_id = %self.message_id,
                        completed = self.completed(),
                        total = self.total,
                        "complete signal arrived before every recipient resolved"
                    );
                }
                self.state = ProgressState::Complete;
                Some(ProgressEvent::Complete {
                    message_id: self.message_id,
                })
            }
            ProgressState::Errored => {
                // The fan-out finished after the deadline. Upgrade only
                // when the late drain accounted for everyone.
                if self.is_fully_accounted() {
                    self.state = ProgressState::Complete;
                }
                None
            }
            ProgressState::Complete => None,
        }
    }

    /// Transition to Errored and produce the terminal wire event
    ///
    /// No-op when the batch already reached a terminal state.
    pub fn mark_errored(&mut self, reason: &str) -> Option<ProgressEvent> {
        if self.state != ProgressState::Open {
            return None;
        }
        self.state = ProgressState::Errored;
        Some(ProgressEvent::Error {
            message_id: self.message_id,
            error: reason.to_string(),
        })
    }

    pub fn message_id(&self) -> Uuid {
        self.message_id
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn successful(&self) -> usize {
        self.successful
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn completed(&self) -> usize {
        self.successful + self.failed
    }

    pub fn state(&self) -> ProgressState {
        self.state
    }

    pub fn is_fully_accounted(&self) -> bool {
        self.completed() == self.total
    }

    /// Batch status the accounting maps to at flush time
    pub fn final_status(&self) -> BatchStatus {
        match self.state {
            ProgressState::Complete => BatchStatus::Completed,
            ProgressState::Errored => BatchStatus::Errored,
            ProgressState::Open => BatchStatus::InProgress,
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total,
            completed: self.completed(),
            successful: self.successful,
            failed: self.failed,
        }
    }

    /// Persistent counters derived from the accounting
    ///
    /// Delivery confirmations arrive out-of-band after flush, so the
    /// delivered counter is always zero here.
    pub fn counters(&self) -> BatchCounters {
        BatchCounters {
            total: self.total as i32,
            pending: self.total.saturating_sub(self.completed()) as i32,
            sent: self.successful as i32,
            delivered: 0,
            failed: self.failed as i32,
        }
    }

    pub fn outcomes(&self) -> &[RecipientOutcome] {
        &self.outcomes
    }
}
