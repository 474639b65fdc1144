use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{GrayImage, Luma};
use imageproc::drawing::{draw_text_mut, text_size};
use tracing::debug;

use crate::error::{Result, ThumbnailError};

/// Measures and rasterizes single lines of text for one font face.
pub trait GlyphBackend: Send + Sync {
    /// `(width, height)` in pixels of `text` at `size` px.
    fn measure(&self, text: &str, size: u32) -> (u32, u32);

    /// Ascent above the baseline (positive) and descent below it (negative) at `size` px.
    fn vertical_metrics(&self, size: u32) -> (f32, f32);

    /// Accumulate glyph coverage (0..255) with the line's left edge at `x` and its
    /// ascent line at `y`, so the baseline sits at `y + ascent`.
    fn draw(&self, coverage: &mut GrayImage, text: &str, size: u32, x: i32, y: i32);
}

/// Glyph backend over a TrueType/OpenType font.
#[derive(Clone)]
pub struct FontBackend {
    font: FontArc,
}

impl FontBackend {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| ThumbnailError::Font(format!("invalid font data: {e}")))?;
        Ok(Self { font })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| ThumbnailError::Font(format!("cannot read {}: {e}", path.display())))?;
        debug!(path = %path.display(), "loaded font");
        Self::from_bytes(bytes)
    }

    /// Load a font by file name through [`resolve_font`].
    pub fn load(name: &str) -> Result<Self> {
        Self::from_path(resolve_font(name)?)
    }
}

impl GlyphBackend for FontBackend {
    fn measure(&self, text: &str, size: u32) -> (u32, u32) {
        text_size(PxScale::from(size as f32), &self.font, text)
    }

    fn vertical_metrics(&self, size: u32) -> (f32, f32) {
        let scaled = self.font.as_scaled(PxScale::from(size as f32));
        (scaled.ascent(), scaled.descent())
    }

    fn draw(&self, coverage: &mut GrayImage, text: &str, size: u32, x: i32, y: i32) {
        draw_text_mut(coverage, Luma([255]), x, y, PxScale::from(size as f32), &self.font, text);
    }
}

/// Places searched for a font file, in order.
pub fn font_search_paths(name: &str) -> Vec<PathBuf> {
    vec![
        PathBuf::from(name),
        Path::new("/usr/share/fonts/truetype").join(name),
        Path::new("/usr/share/fonts").join(name),
        Path::new("./fonts").join(name),
        Path::new("fonts").join(name),
    ]
}

/// First existing candidate from [`font_search_paths`].
pub fn resolve_font(name: &str) -> Result<PathBuf> {
    font_search_paths(name)
        .into_iter()
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| ThumbnailError::Font(format!("font {name:?} not found in any search path")))
}
