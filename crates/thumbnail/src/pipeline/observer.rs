use std::time::Duration;

use tracing::info;

use super::Stage;
use crate::traits::PipelineObserver;

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Reports stage progress through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn stage_started(&self, stage: Stage) {
        info!(%stage, "stage started");
    }

    fn stage_finished(&self, stage: Stage, elapsed: Duration) {
        info!(%stage, elapsed_ms = elapsed.as_millis() as u64, "stage finished");
    }

    fn message(&self, stage: Stage, message: &str) {
        info!(%stage, "{message}");
    }
}
