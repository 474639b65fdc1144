use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ThumbnailError};
use crate::types::Concept;

pub const DEFAULT_CLEANUP_PROMPT: &str = "Remove signatures and text from this image, \
    as well as frames and labels. Place the foreground in the center of the image.";
pub const DEFAULT_CLEANUP_SEED: u64 = 2069714305;
pub const DEFAULT_IMAGE_SIZE: &str = "square_hd";

/// Every size and position used while composing a thumbnail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CanvasGeometry {
    /// Side of the square the fetched source is normalized to.
    pub fetch_size: u32,
    /// Side of the square the cleaned image is normalized to; also the canvas width.
    pub clean_size: u32,
    /// Height of the solid color band added under the background.
    pub panel_height: u32,
    /// Height of the flat top part of the veil gradient.
    pub gradient_split: u32,
    pub transition_start: u32,
    pub transition_end: u32,
    pub transition_blur: u32,
    pub gradient_blur: u32,
    pub mask_grow: u32,
    pub mask_blur: u32,
    pub inpaint_radius: u32,
    pub background_blur: u32,
    pub output_width: u32,
    pub output_height: u32,
    /// Provider line center, measured up from the bottom edge.
    pub provider_offset: u32,
    /// Distance from the provider center up to the title's last line.
    pub title_gap: u32,
    /// Horizontal margin on each side of the title.
    pub title_margin: u32,
    pub title_font_size: u32,
    pub title_min_font_size: u32,
    pub title_line_spacing: f32,
    pub provider_font_size: u32,
}

impl Default for CanvasGeometry {
    fn default() -> Self {
        Self {
            fetch_size: 512,
            clean_size: 1024,
            panel_height: 256,
            gradient_split: 768,
            transition_start: 360,
            transition_end: 960,
            transition_blur: 300,
            gradient_blur: 31,
            mask_grow: 7,
            mask_blur: 5,
            inpaint_radius: 64,
            background_blur: 11,
            output_width: 512,
            output_height: 640,
            provider_offset: 50,
            title_gap: 34,
            title_margin: 100,
            title_font_size: 50,
            title_min_font_size: 28,
            title_line_spacing: 1.15,
            provider_font_size: 18,
        }
    }
}

impl CanvasGeometry {
    pub fn canvas_height(&self) -> u32 {
        self.clean_size + self.panel_height
    }

    pub fn provider_y(&self) -> i32 {
        self.output_height as i32 - self.provider_offset as i32
    }

    pub fn title_y(&self) -> i32 {
        self.provider_y() - self.title_gap as i32
    }

    pub fn title_max_width(&self) -> u32 {
        self.output_width.saturating_sub(2 * self.title_margin)
    }

    /// Reject geometries the compositor cannot honor.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ThumbnailError::InvalidArgument(msg));
        if self.clean_size == 0
            || self.fetch_size == 0
            || self.output_width == 0
            || self.output_height == 0
        {
            return invalid("image sizes must be non-zero".into());
        }
        if self.gradient_split > self.canvas_height() {
            return invalid(format!(
                "gradient split {} exceeds canvas height {}",
                self.gradient_split,
                self.canvas_height()
            ));
        }
        if self.transition_start > self.transition_end {
            return invalid(format!(
                "transition start {} is after its end {}",
                self.transition_start, self.transition_end
            ));
        }
        if self.title_min_font_size == 0 || self.title_min_font_size > self.title_font_size {
            return invalid("title font sizes must satisfy 0 < min <= initial".into());
        }
        Ok(())
    }
}

/// Per-pipeline settings, overridable per render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PipelineOptions {
    pub geometry: CanvasGeometry,
    pub concept: Concept,
    /// Seed forwarded to the cleanup service.
    pub seed: u64,
    /// Seed for dominant-color clustering.
    pub color_seed: u64,
    pub prompt: String,
    pub image_size: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            geometry: CanvasGeometry::default(),
            concept: Concept::default(),
            seed: DEFAULT_CLEANUP_SEED,
            color_seed: 42,
            prompt: DEFAULT_CLEANUP_PROMPT.to_string(),
            image_size: DEFAULT_IMAGE_SIZE.to_string(),
        }
    }
}

/// One thumbnail to produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderRequest {
    pub image_url: String,
    pub game_title: String,
    pub provider: String,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub concept: Option<Concept>,
}

impl RenderRequest {
    pub fn new(
        image_url: impl Into<String>,
        game_title: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            image_url: image_url.into(),
            game_title: game_title.into(),
            provider: provider.into(),
            seed: None,
            concept: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_concept(mut self, concept: Concept) -> Self {
        self.concept = Some(concept);
        self
    }

    /// Both texts must be non-blank and the URL must be absolute http(s).
    pub fn validate(&self) -> Result<()> {
        if self.game_title.trim().is_empty() {
            return Err(ThumbnailError::Input("game title is empty".into()));
        }
        if self.provider.trim().is_empty() {
            return Err(ThumbnailError::Input("provider is empty".into()));
        }
        let url = url::Url::parse(&self.image_url).map_err(|e| {
            ThumbnailError::Input(format!("invalid image url {:?}: {e}", self.image_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ThumbnailError::Input(format!(
                "image url must be http(s), got {:?}",
                url.scheme()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry_layout() {
        let g = CanvasGeometry::default();
        assert_eq!(g.canvas_height(), 1280);
        assert_eq!(g.provider_y(), 590);
        assert_eq!(g.title_y(), 556);
        assert_eq!(g.title_max_width(), 312);
        g.validate().expect("Should be valid");
    }

    #[test]
    fn test_invalid_geometry() {
        let g = CanvasGeometry { transition_start: 900, transition_end: 100, ..Default::default() };
        assert!(g.validate().is_err());
        let g = CanvasGeometry { gradient_split: 5000, ..Default::default() };
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_request_validation() {
        let ok = RenderRequest::new("https://cdn.example.com/a.png", "15DragonCoins", "Booongo");
        ok.validate().expect("Should be valid");
        assert!(RenderRequest::new("https://x.test/a.png", "  ", "P").validate().is_err());
        assert!(RenderRequest::new("https://x.test/a.png", "T", "").validate().is_err());
        assert!(RenderRequest::new("ftp://x.test/a.png", "T", "P").validate().is_err());
        assert!(RenderRequest::new("not a url", "T", "P").validate().is_err());
    }

    #[test]
    fn test_options_from_partial_json() {
        let json = r#"{"concept": "v2", "geometry": {"output_width": 256}}"#;
        let options: PipelineOptions = serde_json::from_str(json).expect("Should parse");
        assert_eq!(options.concept, Concept::V2);
        assert_eq!(options.geometry.output_width, 256);
        assert_eq!(options.geometry.output_height, 640);
        assert_eq!(options.seed, DEFAULT_CLEANUP_SEED);
    }
}
