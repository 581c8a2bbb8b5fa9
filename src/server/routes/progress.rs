//! Batch progress event stream

use crate::core::batch::{BatchStatus, BatchSummary, ProgressEvent};
use crate::server::routes::errors;
use crate::server::sse::SseEvent;
use crate::server::state::AppState;
use crate::utils::error::DispatchError;
use actix_web::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use actix_web::{HttpResponse, HttpResponseBuilder, Result as ActixResult, web};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Stream progress for one batch as server-sent events
///
/// A live batch yields `connected`, then `status` events as recipients
/// resolve, then exactly one `complete` or `error`. A batch that already
/// finished replays `connected` plus its terminal event from the durable
/// row, so late subscribers always get an answer. An id with neither a
/// relay nor a durable row is held open as a pre-subscription, which is
/// what lets a client mint an id, open its event stream, and only then
/// trigger the send.
pub async fn stream_progress(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let Ok(message_id) = Uuid::parse_str(&path) else {
        return Ok(errors::validation_error("message id is not a UUID"));
    };

    // Subscribe before consulting the store: a batch that finishes in
    // between closes the relay, and the stream below falls back to the
    // durable row instead of hanging on a relay nobody will ever feed.
    let mut stream = state.dispatcher.channels().subscribe(message_id);

    if !state.dispatcher.channels().is_active(message_id) {
        match state.storage.get_batch(message_id).await {
            Ok(Some(summary)) => {
                // Finished batch: the durable row is authoritative.
                // Dropping the subscription releases the idle relay.
                drop(stream);
                debug!(%message_id, "replaying terminal state to late subscriber");
                return replay_response(&summary);
            }
            Ok(None) => {
                debug!(%message_id, "holding pre-subscription for undispatched id");
            }
            Err(e) => return Ok(errors::dispatch_error_to_response(e)),
        }
    }

    let storage = Arc::clone(&state.storage);

    let sse_stream = async_stream::stream! {
        match SseEvent::progress(&ProgressEvent::Connected) {
            Ok(frame) => yield Ok::<_, DispatchError>(frame.to_bytes()),
            Err(e) => {
                yield Err(e);
                return;
            }
        }

        loop {
            match stream.recv().await {
                Ok(Some(event)) => {
                    let terminal = event.is_terminal();
                    match SseEvent::progress(&event) {
                        Ok(frame) => yield Ok(frame.to_bytes()),
                        Err(e) => {
                            yield Err(e);
                            break;
                        }
                    }
                    if terminal {
                        break;
                    }
                }
                Ok(None) => {
                    // Relay closed before this subscriber saw a terminal
                    // event; the durable row is authoritative by now.
                    let event = match storage.get_batch(message_id).await {
                        Ok(Some(summary)) => terminal_event(&summary),
                        _ => ProgressEvent::Error {
                            message_id,
                            error: "progress stream closed before completion".to_string(),
                        },
                    };
                    if let Ok(frame) = SseEvent::progress(&event) {
                        yield Ok(frame.to_bytes());
                    }
                    break;
                }
                Err(e) => {
                    warn!(%message_id, error = %e, "progress subscriber fell behind");
                    let event = ProgressEvent::Error {
                        message_id,
                        error: "progress stream lagged; re-read the batch for final status"
                            .to_string(),
                    };
                    if let Ok(frame) = SseEvent::progress(&event) {
                        yield Ok(frame.to_bytes());
                    }
                    break;
                }
            }
        }
    };

    Ok(sse_response().streaming(sse_stream))
}

/// Response builder with the SSE header set
fn sse_response() -> HttpResponseBuilder {
    let mut builder = HttpResponse::Ok();
    builder
        .insert_header((CONTENT_TYPE, "text/event-stream"))
        .insert_header((CACHE_CONTROL, "no-cache"))
        .insert_header(("Connection", "keep-alive"));
    builder
}

/// Replay `connected` plus the terminal event for a finished batch
fn replay_response(summary: &BatchSummary) -> ActixResult<HttpResponse> {
    let events = [ProgressEvent::Connected, terminal_event(summary)];

    let mut frames = Vec::with_capacity(events.len());
    for event in &events {
        match SseEvent::progress(event) {
            Ok(frame) => frames.push(Ok::<_, DispatchError>(frame.to_bytes())),
            Err(e) => return Ok(errors::internal_error(&e.to_string())),
        }
    }

    Ok(sse_response().streaming(futures::stream::iter(frames)))
}

/// Terminal event equivalent to a batch's durable state
fn terminal_event(summary: &BatchSummary) -> ProgressEvent {
    match summary.status {
        BatchStatus::Completed => ProgressEvent::Complete {
            message_id: summary.message_id,
        },
        BatchStatus::Errored => {
            let accounted =
                summary.counters.sent + summary.counters.delivered + summary.counters.failed;
            ProgressEvent::Error {
                message_id: summary.message_id,
                error: format!(
                    "batch ended in status errored with {} of {} recipients accounted",
                    accounted, summary.counters.total
                ),
            }
        }
        BatchStatus::Pending | BatchStatus::InProgress => ProgressEvent::Error {
            message_id: summary.message_id,
            error: format!(
                "batch is in status {} but no longer streaming progress",
                summary.status.as_str()
            ),
        },
    }
}
