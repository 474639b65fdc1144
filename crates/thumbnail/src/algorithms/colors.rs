//! Dominant-color extraction: masked sampling, brightness filtering and
//! seeded k-means over a weighted color histogram.

use std::collections::BTreeMap;

use image::{GrayImage, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, ensure_same_dimensions};
use crate::types::Color;

/// Pixels whose channel mean is at or below this are treated as near-black.
pub const DARK_CUTOFF: f64 = 10.0;
/// Pixels whose channel mean is at or above this are treated as near-white.
pub const BRIGHT_CUTOFF: f64 = 245.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ExtractorConfig {
    pub num_colors: usize,
    pub seed: u64,
    /// Mask values strictly above this count as covered.
    pub coverage_threshold: u8,
    /// The brightness filter is dropped if it leaves fewer than
    /// `num_colors * min_samples_per_color` pixels.
    pub min_samples_per_color: usize,
    pub restarts: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            num_colors: 2,
            seed: 42,
            coverage_threshold: 128,
            min_samples_per_color: 10,
            restarts: 10,
            max_iterations: 300,
            tolerance: 1e-4,
        }
    }
}

/// A distinct color and the number of pixels carrying it.
#[derive(Debug, Clone, Copy, PartialEq)]
struct WeightedPoint {
    value: [f64; 3],
    weight: f64,
}

#[derive(Debug, Clone)]
struct Clustering {
    centers: Vec<[f64; 3]>,
    counts: Vec<f64>,
    inertia: f64,
}

/// The `num_colors` most dominant colors of `image`, most frequent first.
///
/// With a mask only pixels above the coverage threshold are sampled; an empty
/// selection falls back to the whole image. Always returns exactly
/// `num_colors` entries (black for an empty image).
pub fn extract_dominant_colors(
    image: &RgbImage,
    mask: Option<&GrayImage>,
    config: &ExtractorConfig,
) -> Result<Vec<Color>> {
    if let Some(mask) = mask {
        ensure_same_dimensions("color extraction mask", image.dimensions(), mask.dimensions())?;
    }
    let k = config.num_colors;
    if k == 0 {
        return Ok(Vec::new());
    }

    let mut samples: Vec<[u8; 3]> = match mask {
        Some(mask) => image
            .pixels()
            .zip(mask.pixels())
            .filter(|(_, m)| m[0] > config.coverage_threshold)
            .map(|(p, _)| p.0)
            .collect(),
        None => image.pixels().map(|p| p.0).collect(),
    };
    if samples.is_empty() {
        if mask.is_some() {
            warn!("mask selects no pixels, sampling the whole image");
        }
        samples = image.pixels().map(|p| p.0).collect();
    }
    if samples.is_empty() {
        return Ok(vec![Color::BLACK; k]);
    }

    let filtered: Vec<[u8; 3]> = samples
        .iter()
        .copied()
        .filter(|p| {
            let brightness = (p[0] as f64 + p[1] as f64 + p[2] as f64) / 3.0;
            brightness > DARK_CUTOFF && brightness < BRIGHT_CUTOFF
        })
        .collect();
    let minimum = k * config.min_samples_per_color;
    let pixels = if filtered.len() < minimum {
        debug!(
            kept = filtered.len(),
            minimum,
            "brightness filter too aggressive, using all samples"
        );
        samples
    } else {
        filtered
    };

    Ok(cluster_colors(&pixels, config))
}

/// Two-color palette from the four `sample_size` square corners of an image.
pub fn extract_corner_colors(image: &RgbImage, sample_size: u32) -> Vec<Color> {
    let (width, height) = image.dimensions();
    let sx = sample_size.min(width);
    let sy = sample_size.min(height);
    let origins = [(0, 0), (width - sx, 0), (0, height - sy), (width - sx, height - sy)];

    let mut pixels = Vec::with_capacity((sx * sy * 4) as usize);
    for (ox, oy) in origins {
        for y in oy..oy + sy {
            for x in ox..ox + sx {
                pixels.push(image.get_pixel(x, y).0);
            }
        }
    }
    if pixels.is_empty() {
        return vec![Color::BLACK; 2];
    }
    cluster_colors(&pixels, &ExtractorConfig::default())
}

/// Run k-means on raw pixels and rank the centers by membership.
fn cluster_colors(pixels: &[[u8; 3]], config: &ExtractorConfig) -> Vec<Color> {
    let points = histogram(pixels);
    let k = config.num_colors;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut best: Option<Clustering> = None;
    for _ in 0..config.restarts.max(1) {
        let run = lloyd(&points, kmeans_plus_plus(&points, k, &mut rng), config);
        if best.as_ref().is_none_or(|b| run.inertia < b.inertia) {
            best = Some(run);
        }
    }
    let Some(best) = best else {
        return vec![Color::BLACK; k];
    };

    let mut order: Vec<usize> = (0..best.centers.len()).collect();
    order.sort_by(|a, b| best.counts[*b].total_cmp(&best.counts[*a]));
    let mut colors: Vec<Color> = order
        .into_iter()
        .map(|i| Color::from(best.centers[i].map(|c| c.clamp(0.0, 255.0) as u8)))
        .collect();
    if let Some(last) = colors.last().copied() {
        colors.resize(k, last);
    }
    colors
}

/// Collapse identical pixels into weighted points, ordered by color.
fn histogram(pixels: &[[u8; 3]]) -> Vec<WeightedPoint> {
    let mut counts: BTreeMap<[u8; 3], usize> = BTreeMap::new();
    for p in pixels {
        *counts.entry(*p).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(color, count)| WeightedPoint {
            value: color.map(|c| c as f64),
            weight: count as f64,
        })
        .collect()
}

fn distance_squared(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (0..3).map(|i| (a[i] - b[i]) * (a[i] - b[i])).sum()
}

/// Index of the nearest center; ties go to the lower index.
fn nearest(point: &[f64; 3], centers: &[[f64; 3]]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centers.iter().enumerate() {
        let d = distance_squared(point, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

/// Pick a point with probability proportional to `weights`.
fn sample_weighted(weights: &[f64], rng: &mut StdRng) -> Option<usize> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return None;
    }
    let mut target = rng.random::<f64>() * total;
    for (i, w) in weights.iter().enumerate() {
        if target < *w {
            return Some(i);
        }
        target -= w;
    }
    weights.iter().rposition(|w| *w > 0.0)
}

fn kmeans_plus_plus(points: &[WeightedPoint], k: usize, rng: &mut StdRng) -> Vec<[f64; 3]> {
    let weights: Vec<f64> = points.iter().map(|p| p.weight).collect();
    let first = sample_weighted(&weights, rng).unwrap_or(0);
    let mut centers = vec![points[first].value];

    while centers.len() < k {
        let scores: Vec<f64> = points
            .iter()
            .map(|p| p.weight * nearest(&p.value, &centers).1)
            .collect();
        // Fewer distinct colors than clusters: duplicate the last center.
        let next = sample_weighted(&scores, rng)
            .map(|i| points[i].value)
            .unwrap_or(centers[centers.len() - 1]);
        centers.push(next);
    }
    centers
}

fn lloyd(
    points: &[WeightedPoint],
    mut centers: Vec<[f64; 3]>,
    config: &ExtractorConfig,
) -> Clustering {
    let k = centers.len();

    for iteration in 0..config.max_iterations.max(1) {
        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0.0f64; k];
        for p in points {
            let (best, _) = nearest(&p.value, &centers);
            for c in 0..3 {
                sums[best][c] += p.value[c] * p.weight;
            }
            counts[best] += p.weight;
        }

        let mut shift = 0.0;
        for i in 0..k {
            // Empty clusters keep their previous center.
            if counts[i] > 0.0 {
                let updated = sums[i].map(|s| s / counts[i]);
                shift += distance_squared(&updated, &centers[i]);
                centers[i] = updated;
            }
        }
        if shift <= config.tolerance {
            debug!(iteration, "k-means converged");
            break;
        }
    }

    let mut counts = vec![0.0f64; k];
    let mut inertia = 0.0;
    for p in points {
        let (best, d) = nearest(&p.value, &centers);
        counts[best] += p.weight;
        inertia += d * p.weight;
    }
    Clustering { centers, counts, inertia }
}
