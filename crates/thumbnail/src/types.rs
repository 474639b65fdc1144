use std::fmt;

use image::{GrayImage, Rgb, RgbImage, Rgba, RgbaImage};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::error::{Result, ThumbnailError};

/// An opaque 8-bit sRGB color.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` (the leading `#` is optional, case-insensitive).
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(ThumbnailError::InvalidArgument(format!(
                "expected a #RRGGBB color, got {hex:?}"
            )));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| {
                ThumbnailError::InvalidArgument(format!("invalid hex digits in color {hex:?}"))
            })
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Lowercase `#rrggbb`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn channels(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    pub fn to_rgb(&self) -> Rgb<u8> {
        Rgb(self.channels())
    }

    pub fn to_rgba(&self, alpha: u8) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, alpha])
    }
}

impl From<[u8; 3]> for Color {
    fn from(value: [u8; 3]) -> Self {
        Self::new(value[0], value[1], value[2])
    }
}

impl From<Rgb<u8>> for Color {
    fn from(value: Rgb<u8>) -> Self {
        Self::from(value.0)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Hex strings for a ranked palette, in the same order.
pub fn colors_to_hex(colors: &[Color]) -> Vec<String> {
    colors.iter().map(Color::to_hex).collect()
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, IntoStaticStr, VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    #[default]
    Vertical,
    Horizontal,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, IntoStaticStr, VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Interpolation {
    /// Interpolate in linear-light space, then re-encode as sRGB.
    #[default]
    LinearRgb,
    /// Interpolate the encoded sRGB values directly.
    Srgb,
}

/// Visual treatment of the cleaned background.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, IntoStaticStr, VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Concept {
    /// Background regions are softened with a masked blur.
    #[default]
    V1,
    /// Background keeps the inpainted detail.
    V2,
}

/// A two-stop gradient description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GradientSpec {
    pub width: u32,
    pub height: u32,
    pub start: Color,
    pub end: Color,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub interpolation: Interpolation,
}

/// Foreground cut-out produced by a segmenter.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub foreground: RgbaImage,
    /// 255 = subject, 0 = background.
    pub alpha: GrayImage,
}

/// What gets sent to the remote cleanup service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupRequest {
    pub image_url: String,
    pub prompt: String,
    pub image_size: String,
    pub seed: u64,
}

/// A single piece of text to lay out horizontally centered on a canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub text: String,
    /// Vertical center of the (last) line.
    pub anchor_y: i32,
    pub font_size: u32,
    pub color: Color,
    /// Width available to the text; the full canvas width when `None`.
    pub max_width: Option<u32>,
    pub bold: bool,
}

/// Every intermediate the compositor produces, mostly useful for debugging and tests.
#[derive(Debug, Clone)]
pub struct RenderArtifacts {
    pub cleaned: RgbImage,
    pub alpha: GrayImage,
    pub background_mask: GrayImage,
    pub inpainted: RgbImage,
    pub background: RgbImage,
    pub colors: Vec<Color>,
    pub composite: RgbImage,
    pub gradient: RgbImage,
    pub transition: GrayImage,
    pub veiled: RgbImage,
    pub output: RgbImage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_hex_parsing() {
        let color = Color::from_hex("#1A2b3C").expect("Should parse hex color");
        assert_eq!(color, Color::new(0x1a, 0x2b, 0x3c));
        assert_eq!(color.to_hex(), "#1a2b3c");
        assert_eq!(Color::from_hex("ffffff").expect("Should parse"), Color::WHITE);
    }

    #[test]
    fn test_invalid_hex_rejected() {
        assert!(Color::from_hex("#12345").is_err());
        assert!(Color::from_hex("#gg0000").is_err());
        assert!(Color::from_hex("#ééé").is_err());
    }

    #[test]
    fn test_enum_names() {
        assert_eq!(Direction::from_str("horizontal").expect("Should parse"), Direction::Horizontal);
        assert_eq!(Interpolation::LinearRgb.to_string(), "linear_rgb");
        assert!(Direction::from_str("diagonal").is_err());
        assert_eq!(Concept::default(), Concept::V1);
    }
}
