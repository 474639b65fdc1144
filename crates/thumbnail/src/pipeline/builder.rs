use std::sync::Arc;

use super::{CanvasGeometry, Compositor, NoopObserver, Pipeline, PipelineOptions};
use crate::error::Result;
use crate::text::{GlyphBackend, TextEngine};
use crate::traits::{Cleaner, ImageFetcher, PipelineObserver, Segmenter};
use crate::types::Concept;

/// Builder for a [`Pipeline`] with a fluent API
pub struct PipelineBuilder<F, C, S, B> {
    fetcher: F,
    cleaner: C,
    segmenter: S,
    text: TextEngine<B>,
    options: PipelineOptions,
    observer: Arc<dyn PipelineObserver>,
}

impl<F, C, S, B> PipelineBuilder<F, C, S, B>
where
    F: ImageFetcher,
    C: Cleaner,
    S: Segmenter,
    B: GlyphBackend,
{
    pub fn new(fetcher: F, cleaner: C, segmenter: S, text: TextEngine<B>) -> Self {
        Self {
            fetcher,
            cleaner,
            segmenter,
            text,
            options: PipelineOptions::default(),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Replace all options at once
    pub fn options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn geometry(mut self, geometry: CanvasGeometry) -> Self {
        self.options.geometry = geometry;
        self
    }

    /// Default concept for requests that don't pick one
    pub fn concept(mut self, concept: Concept) -> Self {
        self.options.concept = concept;
        self
    }

    /// Default cleanup seed for requests that don't carry one
    pub fn seed(mut self, seed: u64) -> Self {
        self.options.seed = seed;
        self
    }

    pub fn observer<O>(mut self, observer: O) -> Self
    where
        O: PipelineObserver + 'static,
    {
        self.observer = Arc::new(observer);
        self
    }

    /// Validate the geometry and assemble the pipeline
    pub fn build(self) -> Result<Pipeline<F, C, S, B>> {
        self.options.geometry.validate()?;
        let compositor = Compositor::new(self.text, self.options, self.observer);
        Ok(Pipeline::new(self.fetcher, self.cleaner, self.segmenter, compositor))
    }
}
