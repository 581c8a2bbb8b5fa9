//! Provider delivery receipt webhook

use crate::server::state::AppState;
use actix_web::{HttpResponse, Result as ActixResult, web};
use serde::Deserialize;
use tracing::{debug, warn};

/// Configure webhook routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/v1/webhooks").route("/delivery", web::post().to(delivery_callback)));
}

/// Twilio status callback form body
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryCallback {
    #[serde(rename = "MessageSid")]
    pub message_sid: String,
    #[serde(rename = "MessageStatus")]
    pub message_status: String,
}

/// Record a delivery receipt
///
/// The provider retries on non-2xx, so this always returns 200; a failed
/// write is logged and the retry gets another chance.
pub async fn delivery_callback(
    state: web::Data<AppState>,
    form: web::Form<DeliveryCallback>,
) -> ActixResult<HttpResponse> {
    debug!(
        sid = %form.message_sid,
        status = %form.message_status,
        "delivery callback received"
    );

    if form.message_status.eq_ignore_ascii_case("delivered") {
        match state.storage.record_delivery(&form.message_sid).await {
            Ok(Some(message_id)) => debug!(%message_id, "delivery recorded"),
            Ok(None) => debug!(sid = %form.message_sid, "no outcome matches delivery receipt"),
            Err(e) => {
                warn!(sid = %form.message_sid, error = %e, "failed to record delivery");
            }
        }
    }

    Ok(HttpResponse::Ok().finish())
}
