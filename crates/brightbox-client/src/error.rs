//! Brightbox client errors

use thiserror::Error;

/// Errors that can occur when interacting with the Brightbox API
#[derive(Debug, Error)]
pub enum BrightboxError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Brightbox API returned an error status
    #[error("Brightbox API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the API
        status: u16,
        /// Response body or summary
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (invalid credentials, expired token, etc.)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g., missing required fields)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Client configuration is unusable
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl BrightboxError {
    /// True when the API reported that the resource does not exist.
    ///
    /// Callers use this to drive create-versus-update branching, so it must
    /// never be true for transport or authentication failures.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
