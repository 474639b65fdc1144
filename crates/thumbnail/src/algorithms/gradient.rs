use std::str::FromStr;

use image::{Rgb, RgbImage};

use super::color_space::{linear_to_srgb_rgb, srgb_to_linear_rgb};
use crate::error::{Result, ThumbnailError};
use crate::types::{Color, Direction, GradientSpec, Interpolation};

/// Render a two-stop gradient.
///
/// Row `y` (or column `x`) uses `t = y / (height - 1)`; a single row or column uses `t = 0`.
pub fn synthesize(spec: &GradientSpec) -> RgbImage {
    let span = match spec.direction {
        Direction::Vertical => spec.height,
        Direction::Horizontal => spec.width,
    };
    let ramp: Vec<Rgb<u8>> = (0..span)
        .map(|i| {
            let t = if span > 1 { i as f64 / (span - 1) as f64 } else { 0.0 };
            Rgb(mix(spec.start, spec.end, t, spec.interpolation))
        })
        .collect();

    RgbImage::from_fn(spec.width, spec.height, |x, y| match spec.direction {
        Direction::Vertical => ramp[y as usize],
        Direction::Horizontal => ramp[x as usize],
    })
}

/// String-typed entry point; unknown directions or interpolation modes are rejected.
pub fn create_gradient(
    width: u32,
    height: u32,
    start_hex: &str,
    end_hex: &str,
    direction: &str,
    interpolation: &str,
) -> Result<RgbImage> {
    let direction = Direction::from_str(direction).map_err(|_| {
        ThumbnailError::InvalidArgument(format!("unknown gradient direction {direction:?}"))
    })?;
    let interpolation = Interpolation::from_str(interpolation).map_err(|_| {
        ThumbnailError::InvalidArgument(format!("unknown interpolation {interpolation:?}"))
    })?;
    Ok(synthesize(&GradientSpec {
        width,
        height,
        start: Color::from_hex(start_hex)?,
        end: Color::from_hex(end_hex)?,
        direction,
        interpolation,
    }))
}

fn mix(start: Color, end: Color, t: f64, interpolation: Interpolation) -> [u8; 3] {
    match interpolation {
        Interpolation::LinearRgb => {
            let a = srgb_to_linear_rgb(start.channels());
            let b = srgb_to_linear_rgb(end.channels());
            linear_to_srgb_rgb([0, 1, 2].map(|c| a[c] * (1.0 - t) + b[c] * t))
        }
        Interpolation::Srgb => {
            let (a, b) = (start.channels(), end.channels());
            [0, 1, 2].map(|c| {
                (a[c] as f64 * (1.0 - t) + b[c] as f64 * t).round().clamp(0.0, 255.0) as u8
            })
        }
    }
}
