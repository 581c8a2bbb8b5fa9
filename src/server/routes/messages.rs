//! Batch message endpoints

use crate::core::batch::DispatchRequest;
use crate::server::routes::{ApiResponse, errors};
use crate::server::state::AppState;
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::progress::stream_progress;

/// Configure message routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/v1/messages")
            .route("", web::post().to(send_message))
            .route("", web::get().to(list_messages))
            .route("/{message_id}", web::get().to(get_message))
            .route("/{message_id}/log", web::get().to(get_message_log))
            .route("/{message_id}/events", web::get().to(stream_progress)),
    );
}

/// Query parameters for message submission
#[derive(Debug, Clone, Deserialize)]
pub struct SendQuery {
    /// Client-minted correlation id
    pub message_id: Option<Uuid>,
}

/// Body returned when a batch is accepted
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendAccepted {
    pub message_id: Uuid,
}

/// Accept a batch for dispatch
///
/// The correlation id comes from the `message_id` query parameter or the
/// `X-Message-Id` header (query wins), letting clients subscribe to the
/// event stream before submitting. Returns 202 with the batch id.
pub async fn send_message(
    state: web::Data<AppState>,
    query: web::Query<SendQuery>,
    http_request: HttpRequest,
    request: web::Json<DispatchRequest>,
) -> ActixResult<HttpResponse> {
    debug!(
        "Batch dispatch requested for {} recipients",
        request.recipients.len()
    );

    let header_id = match http_request.headers().get("x-message-id") {
        Some(value) => match value.to_str().ok().and_then(|v| Uuid::parse_str(v).ok()) {
            Some(id) => Some(id),
            None => {
                return Ok(errors::validation_error("X-Message-Id header is not a UUID"));
            }
        },
        None => None,
    };
    let message_id = query.message_id.or(header_id);

    match state
        .dispatcher
        .submit(request.into_inner(), message_id)
        .await
    {
        Ok(message_id) => {
            info!(%message_id, "batch accepted for dispatch");
            Ok(HttpResponse::Accepted().json(ApiResponse::success(SendAccepted { message_id })))
        }
        Err(e) => Ok(errors::dispatch_error_to_response(e)),
    }
}

/// Fetch one batch summary
pub async fn get_message(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let Ok(message_id) = Uuid::parse_str(&path) else {
        return Ok(errors::validation_error("message id is not a UUID"));
    };

    match state.storage.get_batch(message_id).await {
        Ok(Some(summary)) => Ok(HttpResponse::Ok().json(ApiResponse::success(summary))),
        Ok(None) => Ok(errors::not_found_error(&format!(
            "batch {} not found",
            message_id
        ))),
        Err(e) => Ok(errors::dispatch_error_to_response(e)),
    }
}

/// Fetch the per-recipient outcome log for one batch
pub async fn get_message_log(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let Ok(message_id) = Uuid::parse_str(&path) else {
        return Ok(errors::validation_error("message id is not a UUID"));
    };

    match state.storage.get_batch(message_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return Ok(errors::not_found_error(&format!(
                "batch {} not found",
                message_id
            )));
        }
        Err(e) => return Ok(errors::dispatch_error_to_response(e)),
    }

    match state.storage.list_outcomes(message_id).await {
        Ok(entries) => {
            let meta = serde_json::json!({ "count": entries.len() });
            Ok(HttpResponse::Ok().json(ApiResponse::success_with_meta(entries, meta)))
        }
        Err(e) => Ok(errors::dispatch_error_to_response(e)),
    }
}

/// Query parameters for listing batches
#[derive(Debug, Clone, Deserialize)]
pub struct ListQuery {
    /// Page size
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Only return batches created strictly before this cursor
    pub after: Option<DateTime<Utc>>,
}

fn default_limit() -> u64 {
    20
}

impl ListQuery {
    fn validate(&self) -> Result<(), String> {
        if self.limit == 0 {
            return Err("Limit must be greater than 0".to_string());
        }
        if self.limit > 200 {
            return Err("Limit cannot exceed 200".to_string());
        }
        Ok(())
    }
}

/// List batches newest first
pub async fn list_messages(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> ActixResult<HttpResponse> {
    if let Err(e) = query.validate() {
        return Ok(errors::validation_error(&e));
    }

    match state.storage.list_batches(query.limit, query.after).await {
        Ok(batches) => {
            let meta = serde_json::json!({
                "count": batches.len(),
                "nextAfter": batches.last().map(|batch| batch.created_at),
            });
            Ok(HttpResponse::Ok().json(ApiResponse::success_with_meta(batches, meta)))
        }
        Err(e) => Ok(errors::dispatch_error_to_response(e)),
    }
}
