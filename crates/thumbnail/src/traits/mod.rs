use std::future::Future;
use std::time::Duration;

use image::{DynamicImage, RgbImage};

use crate::error::Result;
use crate::pipeline::Stage;
use crate::types::{CleanupRequest, Segmentation};

/// Downloads a source image.
pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<DynamicImage>> + Send;
}

/// Remote cleanup: strips text, frames and signatures and recenters the subject.
pub trait Cleaner: Send + Sync {
    fn clean(&self, request: &CleanupRequest) -> impl Future<Output = Result<DynamicImage>> + Send;
}

/// Foreground/background separation.
pub trait Segmenter: Send + Sync {
    fn segment(&self, image: &RgbImage) -> impl Future<Output = Result<Segmentation>> + Send;
}

/// Progress hooks for a render.
pub trait PipelineObserver: Send + Sync {
    fn stage_started(&self, _stage: Stage) {}

    fn stage_finished(&self, _stage: Stage, _elapsed: Duration) {}

    fn message(&self, _stage: Stage, _message: &str) {}
}

impl<T: PipelineObserver + ?Sized> PipelineObserver for std::sync::Arc<T> {
    fn stage_started(&self, stage: Stage) {
        (**self).stage_started(stage)
    }

    fn stage_finished(&self, stage: Stage, elapsed: Duration) {
        (**self).stage_finished(stage, elapsed)
    }

    fn message(&self, stage: Stage, message: &str) {
        (**self).message(stage, message)
    }
}
