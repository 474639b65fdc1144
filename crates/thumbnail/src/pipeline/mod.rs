pub mod builder;
pub mod config;
pub mod observer;

use std::sync::Arc;
use std::time::Instant;

use image::imageops::{FilterType, resize};
use image::{DynamicImage, RgbImage};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use tracing::{debug, info};

use crate::algorithms::{
    ExtractorConfig, InpaintConfig, blend_masked_region_blur, blend_with_mask, extend_with_panel,
    extract_dominant_colors, gaussian_blur, grow_and_blur, inpaint, invert, paste_at,
    stack_vertical, synthesize, transition_mask,
};
use crate::error::Result;
use crate::text::{GlyphBackend, TextEngine, split_title};
use crate::traits::{Cleaner, ImageFetcher, PipelineObserver, Segmenter};
use crate::types::{
    CleanupRequest, Color, Concept, Direction, GradientSpec, Interpolation, RenderArtifacts,
    Segmentation, TextBlock,
};

pub use builder::PipelineBuilder;
pub use config::{CanvasGeometry, PipelineOptions, RenderRequest};
pub use observer::{NoopObserver, TracingObserver};

/// Steps of a render, in execution order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, IntoStaticStr, VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Fetch,
    Cleanup,
    Segmentation,
    MaskProcessing,
    Inpainting,
    BackgroundBlur,
    ColorExtraction,
    Canvas,
    SubjectComposite,
    Gradient,
    Veil,
    Downscale,
    Text,
}

/// Everything after segmentation: pure image work, no I/O.
pub struct Compositor<B> {
    text: TextEngine<B>,
    options: PipelineOptions,
    observer: Arc<dyn PipelineObserver>,
}

impl<B: GlyphBackend> Compositor<B> {
    pub fn new(
        text: TextEngine<B>,
        options: PipelineOptions,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        Self { text, options, observer }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn observer(&self) -> &Arc<dyn PipelineObserver> {
        &self.observer
    }

    fn stage<T>(&self, stage: Stage, work: impl FnOnce() -> Result<T>) -> Result<T> {
        self.observer.stage_started(stage);
        let started = Instant::now();
        let out = work()?;
        self.observer.stage_finished(stage, started.elapsed());
        Ok(out)
    }

    /// Build the final thumbnail from a cleaned image and its segmentation.
    pub fn compose(
        &self,
        cleaned: &RgbImage,
        segmentation: &Segmentation,
        game_title: &str,
        provider: &str,
        concept: Concept,
    ) -> Result<RenderArtifacts> {
        let g = &self.options.geometry;
        g.validate()?;
        let size = g.clean_size;

        let cleaned = if cleaned.dimensions() != (size, size) {
            resize(cleaned, size, size, FilterType::Nearest)
        } else {
            cleaned.clone()
        };
        let alpha = if segmentation.alpha.dimensions() != (size, size) {
            resize(&segmentation.alpha, size, size, FilterType::Triangle)
        } else {
            segmentation.alpha.clone()
        };

        let background_mask = self.stage(Stage::MaskProcessing, || {
            Ok(grow_and_blur(&invert(&alpha), g.mask_grow, g.mask_blur))
        })?;

        let inpainted = self.stage(Stage::Inpainting, || {
            inpaint(
                &cleaned,
                &background_mask,
                &InpaintConfig { radius: g.inpaint_radius, post_blur: 0 },
            )
        })?;

        let background = self.stage(Stage::BackgroundBlur, || match concept {
            Concept::V1 => {
                blend_masked_region_blur(&inpainted, &background_mask, g.background_blur)
            }
            Concept::V2 => Ok(inpainted.clone()),
        })?;

        let colors = self.stage(Stage::ColorExtraction, || {
            let config = ExtractorConfig {
                num_colors: 2,
                seed: self.options.color_seed,
                ..Default::default()
            };
            extract_dominant_colors(&background, Some(&background_mask), &config)
        })?;
        let primary = colors.first().copied().unwrap_or(Color::BLACK);
        let secondary = colors.get(1).copied().unwrap_or(primary);
        self.observer.message(
            Stage::ColorExtraction,
            &format!("palette {} / {}", primary.to_hex(), secondary.to_hex()),
        );

        let canvas = self.stage(Stage::Canvas, || {
            Ok(extend_with_panel(&background, g.panel_height, primary))
        })?;

        let composite = self.stage(Stage::SubjectComposite, || {
            let foreground = if segmentation.foreground.dimensions() != (size, size) {
                resize(&segmentation.foreground, size, size, FilterType::Lanczos3)
            } else {
                segmentation.foreground.clone()
            };
            paste_at(&canvas, &foreground, &alpha, 0, 0)
        })?;

        let canvas_height = g.canvas_height();
        let gradient = self.stage(Stage::Gradient, || {
            let band = |height: u32, start: Color, end: Color| {
                synthesize(&GradientSpec {
                    width: size,
                    height,
                    start,
                    end,
                    direction: Direction::Vertical,
                    interpolation: Interpolation::LinearRgb,
                })
            };
            let top = band(g.gradient_split, primary, primary);
            let bottom = band(canvas_height - g.gradient_split, primary, secondary);
            Ok(gaussian_blur(&stack_vertical(&top, &bottom), g.gradient_blur))
        })?;

        let (transition, veiled) = self.stage(Stage::Veil, || {
            let mask = transition_mask(
                size,
                canvas_height,
                g.transition_start,
                g.transition_end,
                g.transition_blur,
            )?;
            let veiled = blend_with_mask(&composite, &gradient, &mask)?;
            Ok((mask, veiled))
        })?;

        let downscaled = self.stage(Stage::Downscale, || {
            Ok(resize(&veiled, g.output_width, g.output_height, FilterType::Lanczos3))
        })?;

        let output = self.stage(Stage::Text, || {
            let title = split_title(game_title);
            debug!(%title, "title split");
            let title_block = TextBlock {
                text: title,
                anchor_y: g.title_y(),
                font_size: g.title_font_size,
                color: Color::WHITE,
                max_width: Some(g.title_max_width()),
                bold: true,
            };
            let with_title = self.text.draw_centered_multiline(
                &downscaled,
                &title_block,
                g.title_min_font_size,
                g.title_line_spacing,
            );
            let provider_block = TextBlock {
                text: provider.trim().to_string(),
                anchor_y: g.provider_y(),
                font_size: g.provider_font_size,
                color: Color::WHITE,
                max_width: None,
                bold: false,
            };
            Ok(self.text.draw_centered(&with_title, &provider_block))
        })?;

        Ok(RenderArtifacts {
            cleaned,
            alpha,
            background_mask,
            inpainted,
            background,
            colors,
            composite,
            gradient,
            transition,
            veiled,
            output,
        })
    }
}

/// Fetch, clean, segment and compose a marketing thumbnail.
pub struct Pipeline<F, C, S, B> {
    fetcher: F,
    cleaner: C,
    segmenter: S,
    compositor: Compositor<B>,
}

impl<F, C, S, B> Pipeline<F, C, S, B>
where
    F: ImageFetcher,
    C: Cleaner,
    S: Segmenter,
    B: GlyphBackend,
{
    pub fn builder(
        fetcher: F,
        cleaner: C,
        segmenter: S,
        text: TextEngine<B>,
    ) -> PipelineBuilder<F, C, S, B> {
        PipelineBuilder::new(fetcher, cleaner, segmenter, text)
    }

    pub fn new(fetcher: F, cleaner: C, segmenter: S, compositor: Compositor<B>) -> Self {
        Self { fetcher, cleaner, segmenter, compositor }
    }

    pub fn options(&self) -> &PipelineOptions {
        self.compositor.options()
    }

    /// Render one thumbnail: `output_width x output_height` RGB.
    pub async fn render(&self, request: &RenderRequest) -> Result<RgbImage> {
        Ok(self.render_with_artifacts(request).await?.output)
    }

    pub async fn render_with_artifacts(&self, request: &RenderRequest) -> Result<RenderArtifacts> {
        request.validate()?;
        let options = self.compositor.options();
        let geometry = &options.geometry;
        let observer = self.compositor.observer().clone();
        let concept = request.concept.unwrap_or(options.concept);
        info!(
            url = %request.image_url,
            title = %request.game_title,
            %concept,
            "rendering thumbnail"
        );
        let render_started = Instant::now();

        observer.stage_started(Stage::Fetch);
        let started = Instant::now();
        let source = self.fetcher.fetch(&request.image_url).await?;
        let source = normalize(source, geometry.fetch_size);
        observer.message(
            Stage::Fetch,
            &format!("source normalized to {}x{}", source.width(), source.height()),
        );
        observer.stage_finished(Stage::Fetch, started.elapsed());

        observer.stage_started(Stage::Cleanup);
        let started = Instant::now();
        let cleanup = CleanupRequest {
            image_url: request.image_url.clone(),
            prompt: options.prompt.clone(),
            image_size: options.image_size.clone(),
            seed: request.seed.unwrap_or(options.seed),
        };
        let cleaned = normalize(self.cleaner.clean(&cleanup).await?, geometry.clean_size);
        observer.stage_finished(Stage::Cleanup, started.elapsed());

        observer.stage_started(Stage::Segmentation);
        let started = Instant::now();
        let segmentation = self.segmenter.segment(&cleaned).await?;
        observer.stage_finished(Stage::Segmentation, started.elapsed());

        let artifacts = self.compositor.compose(
            &cleaned,
            &segmentation,
            &request.game_title,
            &request.provider,
            concept,
        )?;
        observer.message(
            Stage::Text,
            &format!("render finished in {} ms", render_started.elapsed().as_millis()),
        );
        Ok(artifacts)
    }
}

/// Square RGB at `size`, nearest-neighbor.
fn normalize(image: DynamicImage, size: u32) -> RgbImage {
    let rgb = image.to_rgb8();
    if rgb.dimensions() == (size, size) {
        rgb
    } else {
        resize(&rgb, size, size, FilterType::Nearest)
    }
}
