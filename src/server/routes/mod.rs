//! HTTP route modules
//!
//! This module contains all HTTP route handlers organized by functionality.

pub mod health;
pub mod messages;
pub mod progress;
pub mod webhooks;

use actix_web::HttpResponse;

/// Standard API response structure
#[derive(Debug, Clone, serde::Serialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (if successful)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Additional metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl<T> ApiResponse<T>
where
    T: serde::Serialize,
{
    /// Create a successful response
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: None,
        }
    }

    /// Create a successful response with metadata
    pub fn success_with_meta(data: T, meta: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: Some(meta),
        }
    }

    /// Create an error response
    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
            meta: None,
        }
    }
}

/// Error response helpers
pub mod errors {
    use super::*;
    use crate::utils::error::DispatchError;

    /// Convert DispatchError to HTTP response
    pub fn dispatch_error_to_response(error: DispatchError) -> HttpResponse {
        let (status, message) = match error {
            DispatchError::NotFound(msg) => (actix_web::http::StatusCode::NOT_FOUND, msg),
            DispatchError::Conflict(msg) => (actix_web::http::StatusCode::CONFLICT, msg),
            DispatchError::Validation(msg) => (actix_web::http::StatusCode::BAD_REQUEST, msg),
            DispatchError::Submission(msg) => (actix_web::http::StatusCode::BAD_GATEWAY, msg),
            DispatchError::Provider(err) => {
                (actix_web::http::StatusCode::BAD_GATEWAY, err.to_string())
            }
            DispatchError::Timeout(msg) => (actix_web::http::StatusCode::GATEWAY_TIMEOUT, msg),
            _ => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        HttpResponse::build(status).json(ApiResponse::<()>::error(message))
    }

    /// Create a validation error response
    pub fn validation_error(message: &str) -> HttpResponse {
        HttpResponse::BadRequest().json(ApiResponse::<()>::error(message.to_string()))
    }

    /// Create a not found error response
    pub fn not_found_error(message: &str) -> HttpResponse {
        HttpResponse::NotFound().json(ApiResponse::<()>::error(message.to_string()))
    }

    /// Create an internal server error response
    pub fn internal_error(message: &str) -> HttpResponse {
        HttpResponse::InternalServerError().json(ApiResponse::<()>::error(message.to_string()))
    }
}
