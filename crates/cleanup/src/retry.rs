use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::RetryPolicy;
use crate::error::CleanupError;

impl RetryPolicy {
    /// Delay before retry number `attempt + 1` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(0.0).powi(attempt as i32);
        Duration::from_millis((self.initial_delay_ms as f64 * factor).round() as u64)
    }

    /// Run `operation`, retrying transient failures with backoff.
    ///
    /// Non-transient errors and the last transient error are returned as-is.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, CleanupError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CleanupError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt + 1 < attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation = label,
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
