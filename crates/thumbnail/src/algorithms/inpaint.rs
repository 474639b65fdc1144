//! Hole filling with the Fast Marching Method (Telea).
//!
//! Filling proceeds outward-in from the hole boundary in order of arrival time;
//! each pixel is a weighted average of already-known pixels within `radius`.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use image::imageops::{FilterType, resize};
use image::RgbImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::filter::{gaussian_blur, odd_kernel_size, to_u8};
use super::masks::coverage;
use crate::error::{Result, ensure_same_dimensions};

/// Radius used once holes cover more than half of the image.
pub const REDUCED_RADIUS: u32 = 32;
/// Above this coverage the image is inpainted at half resolution.
pub const DOWNSCALE_COVERAGE: f64 = 0.95;
pub const REDUCED_RADIUS_COVERAGE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct InpaintConfig {
    pub radius: u32,
    /// Gaussian blur applied to the whole result; 0 disables it.
    pub post_blur: u32,
}

impl Default for InpaintConfig {
    fn default() -> Self {
        Self { radius: 64, post_blur: 5 }
    }
}

/// How hard the filler has to work, chosen from the hole coverage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InpaintStrategy {
    /// Nothing to fill.
    Skip,
    Full { radius: u32 },
    Downscaled { radius: u32, factor: f32 },
}

impl InpaintStrategy {
    pub fn plan(coverage: f64, radius: u32) -> Self {
        if coverage <= 0.0 {
            Self::Skip
        } else if coverage > DOWNSCALE_COVERAGE {
            Self::Downscaled { radius: radius.min(REDUCED_RADIUS), factor: 0.5 }
        } else if coverage > REDUCED_RADIUS_COVERAGE {
            Self::Full { radius: radius.min(REDUCED_RADIUS) }
        } else {
            Self::Full { radius }
        }
    }
}

/// Fill every pixel where `mask > 0` from the surrounding known pixels.
pub fn inpaint(
    image: &RgbImage,
    mask: &image::GrayImage,
    config: &InpaintConfig,
) -> Result<RgbImage> {
    ensure_same_dimensions("inpaint mask", image.dimensions(), mask.dimensions())?;

    let hole_coverage = coverage(mask);
    let strategy = InpaintStrategy::plan(hole_coverage, config.radius);
    info!(coverage = hole_coverage, ?strategy, "inpainting");

    let filled = match strategy {
        InpaintStrategy::Skip => image.clone(),
        InpaintStrategy::Full { radius } => telea(image, mask, radius),
        InpaintStrategy::Downscaled { radius, factor } => {
            let (width, height) = image.dimensions();
            let sw = ((width as f32 * factor) as u32).max(1);
            let sh = ((height as f32 * factor) as u32).max(1);
            let small = resize(image, sw, sh, FilterType::Triangle);
            let small_mask = resize(mask, sw, sh, FilterType::Nearest);
            let small_filled = telea(&small, &small_mask, radius);
            resize(&small_filled, width, height, FilterType::Triangle)
        }
    };

    if config.post_blur == 0 {
        return Ok(filled);
    }
    Ok(gaussian_blur(&filled, odd_kernel_size(config.post_blur)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flag {
    Known,
    Band,
    Inside,
}

const FAR: f32 = 1.0e6;

#[derive(Debug, Clone, Copy)]
struct Arrival {
    time: f32,
    index: usize,
}

impl PartialEq for Arrival {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Arrival {}

impl PartialOrd for Arrival {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Arrival {
    // Reversed so the max-heap pops the earliest arrival first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.index.cmp(&self.index))
    }
}

struct Field {
    width: usize,
    height: usize,
    flags: Vec<Flag>,
    times: Vec<f32>,
}

impl Field {
    fn at(&self, x: isize, y: isize) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            None
        } else {
            Some(y as usize * self.width + x as usize)
        }
    }

    fn flag(&self, x: isize, y: isize) -> Flag {
        self.at(x, y).map_or(Flag::Inside, |i| self.flags[i])
    }

    fn time(&self, x: isize, y: isize) -> f32 {
        self.at(x, y).map_or(FAR, |i| self.times[i])
    }

    /// Eikonal update from one horizontal and one vertical neighbor.
    fn solve(&self, a: (isize, isize), b: (isize, isize)) -> f32 {
        let (fa, fb) = (self.flag(a.0, a.1), self.flag(b.0, b.1));
        let (ta, tb) = (self.time(a.0, a.1), self.time(b.0, b.1));
        match (fa != Flag::Inside, fb != Flag::Inside) {
            (true, true) => {
                if (ta - tb).abs() >= 1.0 {
                    1.0 + ta.min(tb)
                } else {
                    (ta + tb + (2.0 - (ta - tb) * (ta - tb)).sqrt()) * 0.5
                }
            }
            (true, false) => 1.0 + ta,
            (false, true) => 1.0 + tb,
            (false, false) => 1.0 + ta.min(tb),
        }
    }

    fn arrival(&self, x: isize, y: isize) -> f32 {
        [
            self.solve((x - 1, y), (x, y - 1)),
            self.solve((x + 1, y), (x, y - 1)),
            self.solve((x - 1, y), (x, y + 1)),
            self.solve((x + 1, y), (x, y + 1)),
        ]
        .into_iter()
        .fold(FAR, f32::min)
    }

    /// Central difference of arrival time where both sides are settled.
    fn gradient_axis(&self, x: isize, y: isize, dx: isize, dy: isize) -> f32 {
        let here = self.time(x, y);
        let fwd = self.flag(x + dx, y + dy) != Flag::Inside;
        let back = self.flag(x - dx, y - dy) != Flag::Inside;
        match (fwd, back) {
            (true, true) => (self.time(x + dx, y + dy) - self.time(x - dx, y - dy)) * 0.5,
            (true, false) => self.time(x + dx, y + dy) - here,
            (false, true) => here - self.time(x - dx, y - dy),
            (false, false) => 0.0,
        }
    }
}

fn telea(image: &RgbImage, mask: &image::GrayImage, radius: u32) -> RgbImage {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let n = width * height;
    let holes: Vec<bool> = mask.as_raw().iter().map(|v| *v > 0).collect();
    if holes.iter().all(|h| *h) || !holes.iter().any(|h| *h) {
        // Nothing known to propagate from, or nothing to fill.
        return image.clone();
    }

    let mut field = Field {
        width,
        height,
        flags: holes.iter().map(|h| if *h { Flag::Inside } else { Flag::Known }).collect(),
        times: holes.iter().map(|h| if *h { FAR } else { 0.0 }).collect(),
    };
    let mut values: Vec<f32> = image.as_raw().iter().map(|v| *v as f32).collect();
    let mut heap = BinaryHeap::new();

    const NEIGHBORS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
    for index in 0..n {
        if holes[index] {
            continue;
        }
        let (x, y) = ((index % width) as isize, (index / width) as isize);
        let borders_hole = NEIGHBORS
            .iter()
            .any(|(dx, dy)| field.at(x + dx, y + dy).is_some_and(|j| holes[j]));
        if borders_hole {
            field.flags[index] = Flag::Band;
            heap.push(Arrival { time: 0.0, index });
        }
    }

    let r = radius.max(1) as isize;
    let offsets: Vec<(isize, isize)> = (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
        .filter(|(dx, dy)| (dx * dx + dy * dy) <= r * r && (*dx, *dy) != (0, 0))
        .collect();

    let mut filled = 0usize;
    while let Some(Arrival { time, index }) = heap.pop() {
        if field.flags[index] == Flag::Known || time > field.times[index] {
            continue;
        }
        field.flags[index] = Flag::Known;
        let (x, y) = ((index % width) as isize, (index / width) as isize);

        for (dx, dy) in NEIGHBORS {
            let (qx, qy) = (x + dx, y + dy);
            let Some(q) = field.at(qx, qy) else { continue };
            if field.flags[q] != Flag::Inside {
                continue;
            }
            let t = field.arrival(qx, qy);
            field.times[q] = t;
            let color = weighted_fill(&field, &values, &offsets, qx, qy);
            if let Some(color) = color {
                values[q * 3..q * 3 + 3].copy_from_slice(&color);
            }
            field.flags[q] = Flag::Band;
            heap.push(Arrival { time: t, index: q });
            filled += 1;
        }
    }
    debug!(filled, radius, "fast marching finished");

    let mut out = RgbImage::new(image.width(), image.height());
    let dst: &mut [u8] = &mut out;
    for (d, v) in dst.iter_mut().zip(values) {
        *d = to_u8(v);
    }
    out
}

fn weighted_fill(
    field: &Field,
    values: &[f32],
    offsets: &[(isize, isize)],
    x: isize,
    y: isize,
) -> Option<[f32; 3]> {
    let gx = field.gradient_axis(x, y, 1, 0);
    let gy = field.gradient_axis(x, y, 0, 1);
    let here = field.time(x, y);

    let mut sum = [0.0f32; 3];
    let mut total = 0.0f32;
    for (dx, dy) in offsets {
        let Some(k) = field.at(x + dx, y + dy) else { continue };
        if field.flags[k] == Flag::Inside {
            continue;
        }
        // Vector from the sample to the pixel being filled.
        let (rx, ry) = (-*dx as f32, -*dy as f32);
        let len2 = rx * rx + ry * ry;
        let distance = 1.0 / (len2 * len2.sqrt());
        let level = 1.0 / (1.0 + (field.times[k] - here).abs());
        let mut direction = (rx * gx + ry * gy).abs();
        if direction <= 0.01 {
            direction = 1.0e-6;
        }
        let weight = (distance * level * direction).abs();
        for c in 0..3 {
            sum[c] += weight * values[k * 3 + c];
        }
        total += weight;
    }
    (total > 0.0).then(|| sum.map(|s| s / total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb};

    fn square_hole(size: u32, from: u32, to: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            let inside = (from..to).contains(&x) && (from..to).contains(&y);
            Luma([if inside { 255 } else { 0 }])
        })
    }

    #[test]
    fn test_plan_thresholds() {
        assert_eq!(InpaintStrategy::plan(0.0, 64), InpaintStrategy::Skip);
        assert_eq!(InpaintStrategy::plan(0.3, 64), InpaintStrategy::Full { radius: 64 });
        assert_eq!(InpaintStrategy::plan(0.7, 64), InpaintStrategy::Full { radius: 32 });
        assert_eq!(InpaintStrategy::plan(0.7, 8), InpaintStrategy::Full { radius: 8 });
        assert_eq!(
            InpaintStrategy::plan(0.97, 64),
            InpaintStrategy::Downscaled { radius: 32, factor: 0.5 }
        );
    }

    #[test]
    fn test_uniform_surround_fills_uniformly() {
        let mut image = RgbImage::from_pixel(24, 24, Rgb([60, 120, 180]));
        let mask = square_hole(24, 8, 16);
        for (x, y, p) in image.enumerate_pixels_mut() {
            if mask.get_pixel(x, y)[0] > 0 {
                *p = Rgb([255, 0, 255]);
            }
        }
        let config = InpaintConfig { radius: 5, post_blur: 0 };
        let out = inpaint(&image, &mask, &config).expect("Should inpaint");
        assert!(out.pixels().all(|p| *p == Rgb([60, 120, 180])));
    }

    #[test]
    fn test_known_pixels_untouched_without_blur() {
        let image = RgbImage::from_fn(20, 20, |x, y| Rgb([(x * 10) as u8, (y * 10) as u8, 7]));
        let mask = square_hole(20, 5, 9);
        let out = inpaint(&image, &mask, &InpaintConfig { radius: 4, post_blur: 0 })
            .expect("Should inpaint");
        for (x, y, p) in out.enumerate_pixels() {
            if mask.get_pixel(x, y)[0] == 0 {
                assert_eq!(p, image.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn test_fill_is_bounded_by_neighbors() {
        // Left half dark, right half bright, hole straddling the seam.
        let image = RgbImage::from_fn(30, 30, |x, _| {
            if x < 15 { Rgb([20, 20, 20]) } else { Rgb([220, 220, 220]) }
        });
        let mask = square_hole(30, 10, 20);
        let out = inpaint(&image, &mask, &InpaintConfig { radius: 6, post_blur: 0 })
            .expect("Should inpaint");
        for p in out.pixels() {
            assert!(p[0] >= 20 && p[0] <= 220);
        }
        assert!(out.get_pixel(11, 15)[0] < out.get_pixel(18, 15)[0]);
    }

    #[test]
    fn test_empty_mask_is_identity() {
        let image = RgbImage::from_fn(10, 10, |x, y| Rgb([x as u8, y as u8, 3]));
        let config = InpaintConfig { radius: 3, post_blur: 0 };
        let out = inpaint(&image, &GrayImage::new(10, 10), &config).expect("Should inpaint");
        assert_eq!(out, image);
    }

    #[test]
    fn test_full_mask_takes_downscaled_path_and_keeps_size() {
        let image = RgbImage::from_pixel(11, 7, Rgb([5, 6, 7]));
        let mask = GrayImage::from_pixel(11, 7, Luma([255]));
        assert!(matches!(
            InpaintStrategy::plan(coverage(&mask), 64),
            InpaintStrategy::Downscaled { .. }
        ));
        let out = inpaint(&image, &mask, &InpaintConfig::default()).expect("Should inpaint");
        assert_eq!(out.dimensions(), (11, 7));
        assert_eq!(out, image);
    }

    #[test]
    fn test_mostly_masked_image_keeps_size() {
        let image = RgbImage::from_fn(40, 30, |x, y| Rgb([(x * 6) as u8, (y * 8) as u8, 50]));
        let mask = GrayImage::from_fn(40, 30, |x, y| Luma([if x == 0 && y < 2 { 0 } else { 255 }]));
        let out = inpaint(&image, &mask, &InpaintConfig { radius: 8, post_blur: 3 })
            .expect("Should inpaint");
        assert_eq!(out.dimensions(), (40, 30));
    }

    #[test]
    fn test_dimension_mismatch() {
        let image = RgbImage::new(10, 10);
        assert!(inpaint(&image, &GrayImage::new(9, 10), &InpaintConfig::default()).is_err());
    }
}
