//! ML client error types.

use poster_media::MediaError;
use thiserror::Error;

/// Result type for ML service calls.
pub type MlResult<T> = Result<T, MlClientError>;

/// Errors that can occur when talking to the detection or editing services.
#[derive(Debug, Error)]
pub enum MlClientError {
    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Service returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] MediaError),
}

impl MlClientError {
    pub fn not_configured(msg: impl Into<String>) -> Self {
        Self::NotConfigured(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// True when the failure is due to missing configuration rather than the service.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, MlClientError::NotConfigured(_))
    }
}
