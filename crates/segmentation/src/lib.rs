//! Foreground segmentation through a Python `rembg` subprocess.

use std::path::PathBuf;

use image::{DynamicImage, GrayImage, ImageFormat, Luma, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use thumbnail::{Segmentation, Segmenter, ThumbnailError};
use tokio::process::Command as TokioCommand;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SegmentationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Segmentation script failed: {0}")]
    Process(String),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Unexpected script output: {0}")]
    Output(#[from] serde_json::Error),
    #[error("Segmented image has no alpha channel")]
    MissingAlpha,
}

impl From<SegmentationError> for ThumbnailError {
    fn from(err: SegmentationError) -> Self {
        ThumbnailError::Segmentation(err.to_string())
    }
}

/// How to launch the segmentation script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct RembgConfig {
    /// Python interpreter, used when `uv_env_path` is unset
    pub python: String,
    /// Run through `uv run python` with this `uv` binary instead
    pub uv_env_path: Option<String>,
    pub script: PathBuf,
    /// rembg model name
    pub model: String,
}

impl Default for RembgConfig {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            uv_env_path: None,
            script: PathBuf::from("crates/segmentation/scripts/rembg_segment.py"),
            model: "u2net".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScriptSummary {
    width: u32,
    height: u32,
    model: String,
}

/// Alpha channel of an RGBA image as a mask (255 = subject).
pub fn alpha_mask(image: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| Luma([image.get_pixel(x, y)[3]]))
}

/// Split a decoded cut-out into foreground and alpha; images without alpha are rejected.
pub fn split_cutout(image: DynamicImage) -> Result<Segmentation, SegmentationError> {
    if !image.color().has_alpha() {
        return Err(SegmentationError::MissingAlpha);
    }
    let foreground = image.to_rgba8();
    let alpha = alpha_mask(&foreground);
    Ok(Segmentation { foreground, alpha })
}

pub struct RembgSegmenter {
    config: RembgConfig,
}

impl RembgSegmenter {
    pub fn new(config: RembgConfig) -> Self {
        Self { config }
    }

    fn command(&self) -> TokioCommand {
        if let Some(uv_path) = &self.config.uv_env_path {
            let mut c = TokioCommand::new(uv_path);
            c.arg("run").arg("python").arg(&self.config.script);
            c
        } else {
            let mut c = TokioCommand::new(&self.config.python);
            c.arg(&self.config.script);
            c
        }
    }

    pub async fn cut_out(&self, image: &RgbImage) -> Result<Segmentation, SegmentationError> {
        let temp_input = tempfile::NamedTempFile::with_suffix(".png")?;
        let temp_output = tempfile::NamedTempFile::with_suffix(".png")?;
        image.save_with_format(temp_input.path(), ImageFormat::Png)?;

        let output = self
            .command()
            .arg("--input")
            .arg(temp_input.path())
            .arg("--output")
            .arg(temp_output.path())
            .arg("--model")
            .arg(&self.config.model)
            .output()
            .await?;

        if !output.status.success() {
            return Err(SegmentationError::Process(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let summary: ScriptSummary = serde_json::from_slice(&output.stdout)?;
        debug!(
            width = summary.width,
            height = summary.height,
            model = %summary.model,
            "rembg finished"
        );

        let segmentation = split_cutout(image::open(temp_output.path())?)?;
        info!(
            coverage = segmentation.alpha.pixels().filter(|p| p[0] > 0).count(),
            "foreground extracted"
        );
        Ok(segmentation)
    }
}

impl Segmenter for RembgSegmenter {
    async fn segment(&self, image: &RgbImage) -> thumbnail::Result<Segmentation> {
        Ok(self.cut_out(image).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba};

    #[test]
    fn test_split_cutout() {
        let cutout =
            RgbaImage::from_fn(4, 4, |x, _| Rgba([10, 20, 30, if x < 2 { 255 } else { 0 }]));
        let segmentation = split_cutout(DynamicImage::ImageRgba8(cutout)).expect("Should split");
        assert_eq!(segmentation.alpha.get_pixel(0, 0)[0], 255);
        assert_eq!(segmentation.alpha.get_pixel(3, 3)[0], 0);
        assert_eq!(segmentation.foreground.get_pixel(1, 1).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_opaque_output_rejected() {
        let opaque = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([1, 2, 3])));
        assert!(matches!(split_cutout(opaque), Err(SegmentationError::MissingAlpha)));
    }

    #[tokio::test]
    async fn test_failing_script_reports_process_error() {
        let segmenter = RembgSegmenter::new(RembgConfig {
            python: "python3".to_string(),
            script: PathBuf::from("/nonexistent/rembg_segment.py"),
            ..Default::default()
        });
        let err = segmenter.segment(&RgbImage::new(4, 4)).await.expect_err("Should fail");
        assert!(matches!(err, ThumbnailError::Segmentation(_)));
    }
}
