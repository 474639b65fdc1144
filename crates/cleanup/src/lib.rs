//! Remote artwork cleanup through a queued image-edit API, plus the HTTP
//! image fetcher the pipeline uses for source downloads.

pub mod client;
pub mod config;
pub mod error;
pub mod job;
pub mod retry;

pub use client::{CleanupClient, HttpFetcher};
pub use config::{CleanupConfig, DEFAULT_ENDPOINT, RetryPolicy};
pub use error::CleanupError;
pub use job::{JobEvent, JobHandle, JobState, PollLimits, QueueStatus};

/// Convenience: clean one image with default settings.
pub async fn clean_image(
    api_key: &str,
    request: &thumbnail::CleanupRequest,
) -> Result<image::DynamicImage, CleanupError> {
    CleanupClient::new(api_key, CleanupConfig::default())?
        .clean_image(request)
        .await
}
