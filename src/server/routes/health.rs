//! Health check and status endpoints

use crate::server::routes::ApiResponse;
use crate::server::state::AppState;
use actix_web::{HttpResponse, Result as ActixResult, web};
use std::borrow::Cow;

use tracing::debug;

/// Configure health check routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/version", web::get().to(version_info));
}

/// Health check endpoint
///
/// Pings the batch log database; a dispatcher that cannot persist
/// outcomes reports `degraded` so orchestration can rotate it out.
pub async fn health_check(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    debug!("Health check requested");

    let database = match state.storage.health_check().await {
        Ok(status) => status.database,
        Err(_) => false,
    };

    let health_status = HealthStatus {
        status: if database {
            Cow::Borrowed("healthy")
        } else {
            Cow::Borrowed("degraded")
        },
        timestamp: chrono::Utc::now(),
        version: Cow::Borrowed(env!("CARGO_PKG_VERSION")),
        components: HealthComponents { database },
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(health_status)))
}

/// Version information endpoint
pub async fn version_info() -> HttpResponse {
    debug!("Version info requested");

    let version_info = VersionInfo {
        version: Cow::Borrowed(env!("CARGO_PKG_VERSION")),
        build_time: Cow::Borrowed(env!("BUILD_TIME")),
        git_hash: Cow::Borrowed(env!("GIT_HASH")),
    };

    HttpResponse::Ok().json(ApiResponse::success(version_info))
}

/// Basic health status
#[derive(Debug, Clone, serde::Serialize)]
struct HealthStatus {
    status: Cow<'static, str>,
    timestamp: chrono::DateTime<chrono::Utc>,
    version: Cow<'static, str>,
    components: HealthComponents,
}

/// Per-backend health flags
#[derive(Debug, Clone, serde::Serialize)]
struct HealthComponents {
    database: bool,
}

/// Version information
#[derive(Debug, Clone, serde::Serialize)]
struct VersionInfo {
    version: Cow<'static, str>,
    build_time: Cow<'static, str>,
    git_hash: Cow<'static, str>,
}
