//! # Thumbnail Compositing Library
//!
//! Turns a raw game artwork URL plus a title and provider name into a
//! 512x640 marketing thumbnail: the artwork is cleaned remotely, the subject
//! is cut out, the background is inpainted and softened, a palette-driven
//! veil fades into a color panel, and the title and provider are set at the
//! bottom.
//!
//! ## Core Features
//!
//! - **Trait seams**: fetching, cleanup and segmentation are injected, so the
//!   compositor runs without network or Python in tests
//! - **Pure image stages**: masks, inpainting, color extraction, gradients
//!   and blending live in [`algorithms`] and work on plain `image` buffers
//! - **Text layout**: font-size fitting and word wrapping behind a
//!   [`GlyphBackend`] so layout can be checked without font files
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use thumbnail::{Pipeline, RenderRequest, TracingObserver, FontBackend, TextEngine};
//! # async fn run<F: thumbnail::ImageFetcher, C: thumbnail::Cleaner, S: thumbnail::Segmenter>(
//! #     fetcher: F, cleaner: C, segmenter: S,
//! # ) -> thumbnail::Result<()> {
//! let text = TextEngine::new(
//!     FontBackend::load("Inter-Regular.ttf")?,
//!     FontBackend::load("Inter-Bold.ttf")?,
//! );
//! let pipeline = Pipeline::builder(fetcher, cleaner, segmenter, text)
//!     .observer(TracingObserver)
//!     .build()?;
//!
//! let request = RenderRequest::new("https://cdn.example.com/art.png", "15DragonCoins", "Booongo");
//! pipeline.render(&request).await?.save("thumbnail.png")?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod types;
pub mod traits;
pub mod algorithms;
pub mod text;
pub mod pipeline;

pub use error::{Result, ThumbnailError};
pub use types::*;
pub use traits::*;
pub use text::{FontBackend, GlyphBackend, TextEngine, split_title};
pub use pipeline::{
    CanvasGeometry, Compositor, NoopObserver, Pipeline, PipelineBuilder, PipelineOptions,
    RenderRequest, Stage, TracingObserver,
};
