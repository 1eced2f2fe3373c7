//! Application error types
//!
//! Unified error handling for the send path and server setup.

use std::fmt;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client payload errors (send path)
    #[error("Payload expected.")]
    EmptyPayload,

    #[error("Broken JSON encoding.")]
    BrokenJson,

    #[error("Message queue full")]
    QueueFull,

    #[error("{0}")]
    BadRequest(String),

    // Resource errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Internal errors
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    /// Get HTTP status code for this error
    ///
    /// The SockJS protocol reports bad send payloads as 500, not 4xx.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::EmptyPayload
            | Self::BrokenJson
            | Self::QueueFull
            | Self::BadRequest(_)
            | Self::Config(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Create a not found error for a resource
    #[must_use]
    pub fn not_found(resource: impl fmt::Display) -> Self {
        Self::NotFound(resource.to_string())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
