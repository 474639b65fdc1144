use std::time::Instant;

use image::DynamicImage;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use thumbnail::{Cleaner, CleanupRequest, ImageFetcher, ThumbnailError};
use tracing::{debug, info, warn};

use crate::config::{CleanupConfig, RetryPolicy};
use crate::error::CleanupError;
use crate::job::{JobEvent, JobHandle, JobState, PollLimits, QueueStatus};

#[derive(Debug, Serialize)]
struct SubmitPayload<'a> {
    prompt: &'a str,
    image_size: &'a str,
    image_urls: [&'a str; 1],
    seed: u64,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    request_id: Option<String>,
    status_url: Option<String>,
    response_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultImage {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ResultResponse {
    #[serde(default)]
    images: Vec<ResultImage>,
}

fn handle_from(response: SubmitResponse) -> Result<JobHandle, CleanupError> {
    let status_url = response
        .status_url
        .ok_or_else(|| {
            CleanupError::MalformedResponse("submission response has no status_url".into())
        })?;
    let response_url = response
        .response_url
        .or_else(|| status_url.strip_suffix("/status").map(str::to_string));
    Ok(JobHandle { request_id: response.request_id, status_url, response_url })
}

fn first_image_url(response: ResultResponse) -> Result<String, CleanupError> {
    response
        .images
        .into_iter()
        .next()
        .map(|image| image.url)
        .ok_or_else(|| CleanupError::MalformedResponse("job result contains no images".into()))
}

/// Turn non-2xx responses into [`CleanupError::Status`] with the body attached.
async fn check(operation: &str, response: Response) -> Result<Response, CleanupError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CleanupError::Status { operation: operation.to_string(), status: status.as_u16(), body })
}

/// Downloads and decodes images over HTTP, retrying transient failures.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(config: &CleanupConfig) -> Result<Self, CleanupError> {
        let http = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self { http, retry: config.retry.clone() })
    }

    pub fn with_client(http: Client, retry: RetryPolicy) -> Self {
        Self { http, retry }
    }

    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, CleanupError> {
        let http = &self.http;
        self.retry
            .run("fetch", || async move {
                let response = check("fetch", http.get(url).send().await?).await?;
                Ok::<_, CleanupError>(response.bytes().await?.to_vec())
            })
            .await
    }

    pub async fn fetch_image(&self, url: &str) -> Result<DynamicImage, CleanupError> {
        let bytes = self.fetch_bytes(url).await?;
        debug!(url, bytes = bytes.len(), "downloaded image");
        Ok(image::load_from_memory(&bytes)?)
    }
}

impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> thumbnail::Result<DynamicImage> {
        Ok(self.fetch_image(url).await?)
    }
}

/// Client for the queued image-edit endpoint that removes text, frames and signatures.
#[derive(Debug, Clone)]
pub struct CleanupClient {
    api_key: String,
    config: CleanupConfig,
    fetcher: HttpFetcher,
}

impl CleanupClient {
    pub fn new(api_key: impl Into<String>, config: CleanupConfig) -> Result<Self, CleanupError> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self { api_key: api_key.into(), config, fetcher })
    }

    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }

    fn authorization(&self) -> String {
        format!("Key {}", self.api_key)
    }

    async fn submit(&self, request: &CleanupRequest) -> Result<JobHandle, CleanupError> {
        let payload = SubmitPayload {
            prompt: &request.prompt,
            image_size: &request.image_size,
            image_urls: [&request.image_url],
            seed: request.seed,
        };
        let response = self
            .fetcher
            .http
            .post(&self.config.endpoint)
            .header(AUTHORIZATION, self.authorization())
            .json(&payload)
            .send()
            .await?;
        let response: SubmitResponse = check("submit", response).await?.json().await?;
        handle_from(response)
    }

    async fn poll(&self, handle: &JobHandle) -> Result<QueueStatus, CleanupError> {
        let response = self
            .fetcher
            .http
            .get(&handle.status_url)
            .header(AUTHORIZATION, self.authorization())
            .send()
            .await?;
        let status: StatusResponse = check("status", response).await?.json().await?;
        Ok(QueueStatus::parse(&status.status, status.error))
    }

    async fn result_url(&self, handle: &JobHandle) -> Result<String, CleanupError> {
        let url = handle
            .response_url
            .as_deref()
            .ok_or_else(|| {
                CleanupError::MalformedResponse("completed job has no response_url".into())
            })?;
        let http = &self.fetcher.http;
        let authorization = self.authorization();
        let authorization = authorization.as_str();
        let response: ResultResponse = self
            .config
            .retry
            .run("result", || async move {
                let response = http.get(url).header(AUTHORIZATION, authorization).send().await?;
                let body = check("result", response).await?;
                Ok::<_, CleanupError>(body.json::<ResultResponse>().await?)
            })
            .await?;
        first_image_url(response)
    }

    /// Submit a job and wait for it, returning the URL of the cleaned image.
    pub async fn run_job(&self, request: &CleanupRequest) -> Result<String, CleanupError> {
        let limits = PollLimits {
            timeout: self.config.timeout(),
            max_consecutive_failures: self.config.max_poll_failures,
        };
        let handle = self.config.retry.run("submit", || self.submit(request)).await?;
        let started = Instant::now();
        info!(request_id = ?handle.request_id, "cleanup job submitted");
        let mut state =
            JobState::Submitting.on(JobEvent::Submitted(handle), started.elapsed(), &limits);

        loop {
            state = match state {
                JobState::Polling { ref handle, polls, .. } => {
                    let event = match self.poll(handle).await {
                        Ok(status) => {
                            debug!(polls, ?status, "cleanup job status");
                            JobEvent::StatusReported(status)
                        }
                        Err(err) if err.is_transient() => {
                            warn!(error = %err, "status poll failed");
                            JobEvent::PollFailed(err.to_string())
                        }
                        Err(err) => return Err(err),
                    };
                    let next = state.on(event, started.elapsed(), &limits);
                    if matches!(next, JobState::Polling { .. }) {
                        tokio::time::sleep(self.config.poll_interval()).await;
                    }
                    next
                }
                JobState::Completed(handle) => {
                    info!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "cleanup job completed"
                    );
                    return self.result_url(&handle).await;
                }
                JobState::Failed(message) => return Err(CleanupError::JobFailed(message)),
                JobState::TimedOut(elapsed) => return Err(CleanupError::TimedOut(elapsed)),
                JobState::Submitting => {
                    return Err(CleanupError::MalformedResponse("job was never submitted".into()));
                }
            };
        }
    }

    /// Run a job and download its output.
    pub async fn clean_image(
        &self,
        request: &CleanupRequest,
    ) -> Result<DynamicImage, CleanupError> {
        let url = self.run_job(request).await?;
        self.fetcher.fetch_image(&url).await
    }
}

impl Cleaner for CleanupClient {
    async fn clean(&self, request: &CleanupRequest) -> thumbnail::Result<DynamicImage> {
        self.clean_image(request).await.map_err(ThumbnailError::from)
    }
}
