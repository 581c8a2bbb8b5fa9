//! Error handling for the dispatcher
//!
//! This module defines all error types used throughout the dispatcher.

use crate::core::providers::ProviderError;
use thiserror::Error;

/// Result type alias for the dispatcher
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Main error type for the dispatcher
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Batch submission failures before any fan-out started
    #[error("Submission error: {0}")]
    Submission(String),

    /// A batch with the same correlation id is already in flight
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Batch completion window elapsed
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Progress stream ended or lagged before a terminal event
    #[error("Stream transport error: {0}")]
    StreamClosed(String),

    /// SMS provider errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    pub fn submission<S: Into<String>>(message: S) -> Self {
        Self::Submission(message.into())
    }

    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::Conflict(message.into())
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound(message.into())
    }

    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    pub fn stream_closed<S: Into<String>>(message: S) -> Self {
        Self::StreamClosed(message.into())
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }
}
