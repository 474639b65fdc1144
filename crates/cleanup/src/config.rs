use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "https://queue.fal.run/fal-ai/bytedance/seedream/v4/edit";

/// Retry schedule for transient HTTP failures: `initial_delay_ms * multiplier^attempt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            multiplier: 2.0,
        }
    }
}

/// Configuration for the remote cleanup job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct CleanupConfig {
    /// Queue submission endpoint
    pub endpoint: String,
    /// Delay between status polls
    pub poll_interval_ms: u64,
    /// Overall deadline for a job, from submission to completion
    pub timeout_secs: u64,
    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,
    /// Polling gives up after this many failed status requests in a row
    pub max_poll_failures: u32,
    pub retry: RetryPolicy,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            poll_interval_ms: 3000,
            timeout_secs: 300,
            request_timeout_secs: 30,
            max_poll_failures: 5,
            retry: RetryPolicy::default(),
        }
    }
}

impl CleanupConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
