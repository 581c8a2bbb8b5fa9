//! Bounded-concurrency fan-out
//!
//! One provider call per recipient, at most `concurrency` in flight at a
//! time. Every call resolves to exactly one outcome event on the spine,
//! and a single `Complete` follows after the last call has resolved:
//! each outcome is enqueued before its future finishes, so `Complete`
//! cannot overtake a status event.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::core::providers::SmsProvider;
use crate::utils::limiter::SendPacer;

use super::types::{BatchJob, FanoutEvent, Recipient, RecipientOutcome};

/// Configuration for the fan-out sender
#[derive(Debug, Clone)]
pub struct FanoutConfig {
    /// Maximum concurrent provider calls (default: 10)
    pub concurrency: usize,
    /// Timeout per individual send (default: 30s)
    pub send_timeout: Duration,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            send_timeout: Duration::from_secs(30),
        }
    }
}

impl FanoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency limit
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set the timeout per send
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }
}

/// Fans one batch out to its recipients
pub struct FanoutSender {
    provider: Arc<dyn SmsProvider>,
    pacer: Option<Arc<SendPacer>>,
    config: FanoutConfig,
}

impl FanoutSender {
    pub fn new(provider: Arc<dyn SmsProvider>, config: FanoutConfig) -> Self {
        Self {
            provider,
            pacer: None,
            config,
        }
    }

    /// Throttle provider calls through a shared pacer
    pub fn with_pacer(mut self, pacer: Arc<SendPacer>) -> Self {
        self.pacer = Some(pacer);
        self
    }

    pub fn config(&self) -> &FanoutConfig {
        &self.config
    }

    /// Send to every recipient and emit events on the spine
    ///
    /// A failed recipient never stops the others. If the receiver is
    /// gone the remaining sends still run so the messages go out; only
    /// the accounting is lost.
    pub async fn run(&self, job: BatchJob, events: mpsc::Sender<FanoutEvent>) {
        let message_id = job.message_id;
        let total = job.total();
        info!(
            message_id = %message_id,
            recipients = total,
            concurrency = self.config.concurrency,
            "starting batch fan-out"
        );

        let BatchJob {
            body,
            media_urls,
            recipients,
            ..
        } = job;

        let _: Vec<()> = stream::iter(recipients)
            .map(|recipient| self.send_one(message_id, recipient, &body, &media_urls, &events))
            .buffer_unordered(self.config.concurrency)
            .collect()
            .await;

        info!(message_id = %message_id, "fan-out complete");
        if events.send(FanoutEvent::Complete).await.is_err() {
            debug!(message_id = %message_id, "complete receiver is gone");
        }
    }

    async fn send_one(
        &self,
        message_id: Uuid,
        recipient: Recipient,
        body: &str,
        media_urls: &[Url],
        events: &mpsc::Sender<FanoutEvent>,
    ) {
        if let Some(pacer) = self.pacer.as_deref() {
            pacer.acquire().await;
        }

        let outcome = match tokio::time::timeout(
            self.config.send_timeout,
            self.provider.send(&recipient.phone, body, media_urls),
        )
        .await
        {
            Ok(Ok(receipt)) => {
                debug!(
                    message_id = %message_id,
                    recipient = %recipient.phone,
                    sid = %receipt.sid,
                    "provider accepted message"
                );
                RecipientOutcome::sent(recipient, receipt)
            }
            Ok(Err(err)) => {
                debug!(
                    message_id = %message_id,
                    recipient = %recipient.phone,
                    error = %err,
                    "send failed"
                );
                RecipientOutcome::failed(recipient, err.to_string())
            }
            Err(_) => {
                let reason = format!("send timed out after {:?}", self.config.send_timeout);
                debug!(
                    message_id = %message_id,
                    recipient = %recipient.phone,
                    "{}", reason
                );
                RecipientOutcome::failed(recipient, reason)
            }
        };

        if events.send(FanoutEvent::Outcome(outcome)).await.is_err() {
            debug!(message_id = %message_id, "outcome receiver is gone");
        }
    }
}
