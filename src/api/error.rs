//! Error types for the collaborator API.

use thiserror::Error;

/// Errors from talking to the annotation server.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Base URL or endpoint could not be built
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Connection, TLS or body transfer failure
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Server returned {status} for {url}")]
    Status { status: u16, url: String },

    /// Response body was not the expected JSON
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether the server reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}
