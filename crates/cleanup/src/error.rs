use std::time::Duration;

use thiserror::Error;
use thumbnail::ThumbnailError;

#[derive(Error, Debug)]
pub enum CleanupError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },
    #[error("Cleanup job failed: {0}")]
    JobFailed(String),
    #[error("Cleanup job did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),
}

impl CleanupError {
    /// Worth retrying: transport failures, rate limiting and server-side errors.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(err) => !err.is_decode() && !err.is_builder(),
            Self::Status { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<CleanupError> for ThumbnailError {
    fn from(err: CleanupError) -> Self {
        match err {
            CleanupError::Transport(e) => ThumbnailError::Network(e.to_string()),
            CleanupError::Status { status: 422, body, .. } => ThumbnailError::RemoteJob(body),
            e @ CleanupError::Status { .. } => ThumbnailError::Network(e.to_string()),
            CleanupError::JobFailed(message) => ThumbnailError::RemoteJob(message),
            e @ CleanupError::TimedOut(_) => ThumbnailError::Timeout(e.to_string()),
            CleanupError::MalformedResponse(message) => ThumbnailError::RemoteJob(message),
            CleanupError::Decode(e) => ThumbnailError::Decode(e.to_string()),
        }
    }
}
