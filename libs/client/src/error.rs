//! Errors returned by the API client.

use thiserror::Error;

/// Client-side errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl ClientError {
    /// Create an API error from response details.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Returns true if the backend reported the addressed record as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }

    /// HTTP status of an API error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
