//! Image composition: masked pastes, blends, stacking and the veil transition mask.

use image::imageops::{FilterType, resize};
use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

use super::filter::{gaussian_blur, odd_kernel_size, to_u8};
use crate::error::{Result, ThumbnailError, ensure_same_dimensions};
use crate::types::Color;

fn mix(base: u8, top: u8, weight: f32) -> u8 {
    to_u8(base as f32 * (1.0 - weight) + top as f32 * weight)
}

/// Paste `overlay` over `base` through `mask`, scaling both to the base size first.
pub fn paste(base: &RgbImage, overlay: &RgbaImage, mask: &GrayImage) -> Result<RgbImage> {
    let (width, height) = base.dimensions();
    let overlay = if overlay.dimensions() != (width, height) {
        resize(overlay, width, height, FilterType::Lanczos3)
    } else {
        overlay.clone()
    };
    let mask = if mask.dimensions() != (width, height) {
        resize(mask, width, height, FilterType::Triangle)
    } else {
        mask.clone()
    };
    paste_at(base, &overlay, &mask, 0, 0)
}

/// Paste `overlay` with its top-left corner at `(x, y)`; whatever falls outside `base` is clipped.
///
/// `out = base * (1 - m) + overlay * m` with `m = mask / 255`.
pub fn paste_at(
    base: &RgbImage,
    overlay: &RgbaImage,
    mask: &GrayImage,
    x: i64,
    y: i64,
) -> Result<RgbImage> {
    ensure_same_dimensions("paste mask", overlay.dimensions(), mask.dimensions())?;
    let mut out = base.clone();
    for (ox, oy, pixel) in overlay.enumerate_pixels() {
        let (tx, ty) = (x + ox as i64, y + oy as i64);
        if tx < 0 || ty < 0 || tx >= base.width() as i64 || ty >= base.height() as i64 {
            continue;
        }
        let weight = mask.get_pixel(ox, oy)[0] as f32 / 255.0;
        if weight <= 0.0 {
            continue;
        }
        let target = out.get_pixel_mut(tx as u32, ty as u32);
        for c in 0..3 {
            target[c] = mix(target[c], pixel[c], weight);
        }
    }
    Ok(out)
}

/// Per-pixel `base * (1 - m) + top * m`; all three inputs must share dimensions.
pub fn blend_with_mask(base: &RgbImage, top: &RgbImage, mask: &GrayImage) -> Result<RgbImage> {
    ensure_same_dimensions("blend layer", base.dimensions(), top.dimensions())?;
    ensure_same_dimensions("blend mask", base.dimensions(), mask.dimensions())?;
    Ok(RgbImage::from_fn(base.width(), base.height(), |x, y| {
        let weight = mask.get_pixel(x, y)[0] as f32 / 255.0;
        let (b, t) = (base.get_pixel(x, y), top.get_pixel(x, y));
        Rgb([0, 1, 2].map(|c| mix(b[c], t[c], weight)))
    }))
}

/// Blur only where the mask is set: `image * (1 - m) + blur(image) * m`.
pub fn blend_masked_region_blur(
    image: &RgbImage,
    mask: &GrayImage,
    kernel_size: u32,
) -> Result<RgbImage> {
    let blurred = gaussian_blur(image, odd_kernel_size(kernel_size));
    blend_with_mask(image, &blurred, mask)
}

/// `top` above `bottom`, left-aligned; the narrower one is padded with black.
pub fn stack_vertical(top: &RgbImage, bottom: &RgbImage) -> RgbImage {
    let width = top.width().max(bottom.width());
    let mut out = RgbImage::new(width, top.height() + bottom.height());
    for (x, y, p) in top.enumerate_pixels() {
        out.put_pixel(x, y, *p);
    }
    for (x, y, p) in bottom.enumerate_pixels() {
        out.put_pixel(x, top.height() + y, *p);
    }
    out
}

/// Grow `image` downward by a solid `panel_height` band of `color`.
pub fn extend_with_panel(image: &RgbImage, panel_height: u32, color: Color) -> RgbImage {
    let panel = RgbImage::from_pixel(image.width(), panel_height, color.to_rgb());
    stack_vertical(image, &panel)
}

/// Vertical 0..255 ramp between `start` and `end` rows, then Gaussian-feathered.
///
/// Rows above `start` are 0, rows below `end` are 255, and rows in between
/// rise linearly (truncated). Every row is constant, so the blur reduces to a
/// 1-D pass over the row profile.
pub fn transition_mask(
    width: u32,
    height: u32,
    start: u32,
    end: u32,
    blur_size: u32,
) -> Result<GrayImage> {
    if start > end {
        return Err(ThumbnailError::InvalidArgument(format!(
            "transition start {start} is below its end {end}"
        )));
    }
    let span = (end - start).max(1) as f32;
    let column = GrayImage::from_fn(1, height, |_, y| {
        let value = if y < start {
            0
        } else if y > end {
            255
        } else {
            ((y - start) as f32 / span * 255.0).floor() as u8
        };
        Luma([value])
    });
    // A one-pixel-wide column only sees the vertical pass.
    let column = gaussian_blur(&column, odd_kernel_size(blur_size));
    Ok(GrayImage::from_fn(width, height, |_, y| *column.get_pixel(0, y)))
}

/// Alpha-composite `gradient` over `base` at a uniform `opacity` in `[0, 1]`.
///
/// The gradient is scaled to the base size first if they differ.
pub fn apply_gradient_overlay(
    base: &RgbaImage,
    gradient: &RgbaImage,
    opacity: f32,
) -> Result<RgbaImage> {
    if !(0.0..=1.0).contains(&opacity) {
        return Err(ThumbnailError::InvalidArgument(format!("opacity {opacity} is outside [0, 1]")));
    }
    let gradient = if gradient.dimensions() != base.dimensions() {
        resize(gradient, base.width(), base.height(), FilterType::Lanczos3)
    } else {
        gradient.clone()
    };
    Ok(RgbaImage::from_fn(base.width(), base.height(), |x, y| {
        let (b, g) = (base.get_pixel(x, y), gradient.get_pixel(x, y));
        let src_a = opacity;
        let dst_a = b[3] as f32 / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);
        if out_a <= 0.0 {
            return Rgba([0, 0, 0, 0]);
        }
        let channel = |c: usize| {
            to_u8((g[c] as f32 * src_a + b[c] as f32 * dst_a * (1.0 - src_a)) / out_a)
        };
        Rgba([channel(0), channel(1), channel(2), to_u8(out_a * 255.0)])
    }))
}
