//! Dispatch initiation and batch lifecycle
//!
//! The `Dispatcher` validates a request, claims its correlation id,
//! records the pending batch, and spawns a detached runner. The runner
//! drives `BatchProgress` from the event spine, relays accepted events
//! to subscribers, and flushes outcomes plus the batch summary once the
//! batch reaches a terminal state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::providers::SmsProvider;
use crate::storage::StorageLayer;
use crate::utils::error::{DispatchError, Result};
use crate::utils::limiter::SendPacer;
use crate::utils::validation::validate_dispatch;

use super::channel::{BatchChannel, ProgressChannels, ProgressStream};
use super::progress::{BatchProgress, ProgressState};
use super::sender::{FanoutConfig, FanoutSender};
use super::types::{BatchContext, BatchJob, DispatchRequest, FanoutEvent};

/// Configuration for the dispatcher and its batch runners
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Concurrent provider calls per batch
    pub concurrency: usize,
    /// Timeout per individual send
    pub send_timeout: Duration,
    /// Deadline for a batch to account for every recipient
    pub complete_timeout: Duration,
    /// How long an errored batch keeps merging late outcomes
    pub late_grace: Duration,
    /// Capacity of the event spine and of each progress relay
    pub event_buffer: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            send_timeout: Duration::from_secs(30),
            complete_timeout: Duration::from_secs(60),
            late_grace: Duration::from_secs(30),
            event_buffer: 1024,
        }
    }
}

impl DispatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &crate::config::DispatchConfig) -> Self {
        Self {
            concurrency: settings.concurrency,
            send_timeout: Duration::from_secs(settings.send_timeout),
            complete_timeout: Duration::from_secs(settings.complete_timeout),
            late_grace: Duration::from_secs(settings.late_grace),
            event_buffer: settings.event_buffer,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn with_complete_timeout(mut self, timeout: Duration) -> Self {
        self.complete_timeout = timeout;
        self
    }

    pub fn with_late_grace(mut self, grace: Duration) -> Self {
        self.late_grace = grace;
        self
    }

    fn fanout(&self) -> FanoutConfig {
        FanoutConfig::new()
            .with_concurrency(self.concurrency)
            .with_send_timeout(self.send_timeout)
    }
}

/// Accepts dispatch requests and runs their batches to completion
#[derive(Clone)]
pub struct Dispatcher {
    provider: Arc<dyn SmsProvider>,
    storage: Arc<StorageLayer>,
    channels: ProgressChannels,
    pacer: Option<Arc<SendPacer>>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        provider: Arc<dyn SmsProvider>,
        storage: Arc<StorageLayer>,
        config: DispatcherConfig,
    ) -> Self {
        let channels = ProgressChannels::new(config.event_buffer);
        Self {
            provider,
            storage,
            channels,
            pacer: None,
            config,
        }
    }

    /// Throttle outbound sends through a shared pacer
    pub fn with_pacer(mut self, pacer: Arc<SendPacer>) -> Self {
        self.pacer = Some(pacer);
        self
    }

    /// Registry used to subscribe to batch progress
    pub fn channels(&self) -> &ProgressChannels {
        &self.channels
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Validate and dispatch a batch, returning its correlation id
    ///
    /// The id is settled before any network call, so a client that
    /// minted its own id can subscribe to progress before submitting.
    /// Reusing the id of an in-flight or already-recorded batch is a
    /// conflict.
    pub async fn submit(
        &self,
        request: DispatchRequest,
        message_id: Option<Uuid>,
    ) -> Result<Uuid> {
        let request = validate_dispatch(request)?;

        let message_id = match message_id {
            Some(id) => {
                // The relay registry only knows in-flight batches; a
                // client-minted id may also collide with a finished one.
                if self.storage.get_batch(id).await?.is_some() {
                    return Err(DispatchError::Conflict(format!(
                        "batch {} already exists",
                        id
                    )));
                }
                id
            }
            None => Uuid::new_v4(),
        };

        self.launch(request, message_id).await
    }

    /// Dispatch a batch and subscribe to its progress in one step
    ///
    /// The subscription attaches before the runner spawns, so the
    /// stream observes every relayed event.
    pub async fn submit_with_stream(
        &self,
        request: DispatchRequest,
    ) -> Result<(Uuid, ProgressStream)> {
        let request = validate_dispatch(request)?;
        let message_id = Uuid::new_v4();
        let stream = self.channels.subscribe(message_id);
        self.launch(request, message_id).await?;
        Ok((message_id, stream))
    }

    /// Expects a validated request
    async fn launch(&self, request: DispatchRequest, message_id: Uuid) -> Result<Uuid> {
        let channel = self.channels.open(message_id)?;
        let job = BatchJob::new(message_id, &request);
        let ctx = BatchContext::new(message_id, &request);

        if let Err(err) = self.storage.create_batch(&ctx, job.total() as i32).await {
            self.channels.close(message_id);
            return Err(DispatchError::Submission(format!(
                "failed to record batch {}: {}",
                message_id, err
            )));
        }

        info!(
            message_id = %message_id,
            recipients = job.total(),
            "batch accepted for dispatch"
        );

        let runner = self.clone();
        tokio::spawn(async move {
            runner.run_batch(job, ctx, channel).await;
        });

        Ok(message_id)
    }

    /// Drive one batch from first send to durable terminal state
    async fn run_batch(self, job: BatchJob, ctx: BatchContext, channel: BatchChannel) {
        let BatchChannel {
            message_id,
            outcomes_tx,
            mut outcomes_rx,
        } = channel;

        let mut progress = BatchProgress::new(message_id, job.total());

        if let Err(err) = self.storage.mark_batch_started(message_id).await {
            warn!(
                message_id = %message_id,
                error = %err,
                "failed to mark batch in progress"
            );
        }

        let mut sender = FanoutSender::new(Arc::clone(&self.provider), self.config.fanout());
        if let Some(pacer) = &self.pacer {
            sender = sender.with_pacer(Arc::clone(pacer));
        }
        tokio::spawn(async move {
            sender.run(job, outcomes_tx).await;
        });

        let deadline = Instant::now() + self.config.complete_timeout;
        let mut failure: Option<String> = None;

        loop {
            match timeout_at(deadline, outcomes_rx.recv()).await {
                Ok(Some(event)) => {
                    if let Some(wire) = progress.apply(event) {
                        let terminal = wire.is_terminal();
                        self.channels.relay(message_id, wire);
                        if terminal {
                            break;
                        }
                    }
                }
                Ok(None) => {
                    failure =
                        Some("dispatch ended before all recipients were accounted for".to_string());
                    break;
                }
                Err(_) => {
                    failure = Some(format!(
                        "batch did not complete within {:?}",
                        self.config.complete_timeout
                    ));
                    break;
                }
            }
        }

        match failure {
            None => {
                info!(
                    message_id = %message_id,
                    successful = progress.successful(),
                    failed = progress.failed(),
                    "batch completed"
                );
                // Flush before tearing the relay down so a subscriber
                // racing the shutdown re-reads a finalized row
                self.flush(&ctx, &progress).await;
                self.channels.close(message_id);
            }
            Some(reason) => {
                error!(message_id = %message_id, reason = %reason, "batch errored");
                if let Some(wire) = progress.mark_errored(&reason) {
                    self.channels.relay(message_id, wire);
                }
                self.channels.close(message_id);
                self.flush(&ctx, &progress).await;
                self.drain_late(&ctx, &mut progress, &mut outcomes_rx).await;
            }
        }
    }

    /// Keep merging late outcomes into an errored batch for a bounded
    /// grace window; a late `Complete` that accounts for every
    /// recipient upgrades the batch.
    async fn drain_late(
        &self,
        ctx: &BatchContext,
        progress: &mut BatchProgress,
        outcomes_rx: &mut mpsc::Receiver<FanoutEvent>,
    ) {
        let deadline = Instant::now() + self.config.late_grace;
        let accounted_before = progress.completed();

        loop {
            match timeout_at(deadline, outcomes_rx.recv()).await {
                Ok(Some(event)) => {
                    progress.apply(event);
                    if progress.state() == ProgressState::Complete {
                        break;
                    }
                }
                Ok(None) => break,
                Err(_) => break,
            }
        }

        let upgraded = progress.state() == ProgressState::Complete;
        if upgraded || progress.completed() > accounted_before {
            debug!(
                message_id = %ctx.message_id,
                merged = progress.completed() - accounted_before,
                upgraded,
                "merged late outcomes"
            );
            self.flush(ctx, progress).await;
        }
    }

    /// Best-effort durable flush; the runner is detached, so failures
    /// are logged rather than propagated
    async fn flush(&self, ctx: &BatchContext, progress: &BatchProgress) {
        if let Err(err) = self.storage.insert_outcomes(ctx, progress.outcomes()).await {
            error!(
                message_id = %ctx.message_id,
                error = %err,
                "failed to persist batch outcomes"
            );
        }

        let counters = progress.counters();
        if let Err(err) = self
            .storage
            .finalize_batch(ctx, &counters, progress.final_status())
            .await
        {
            error!(
                message_id = %ctx.message_id,
                error = %err,
                "failed to finalize batch summary"
            );
        }
    }
}
