use image::{GrayImage, Luma};
use imageproc::map::map_pixels;

use super::filter::{gaussian_blur, odd_kernel_size};

/// 255 - v for every pixel.
pub fn invert(mask: &GrayImage) -> GrayImage {
    map_pixels(mask, |_, _, Luma([v])| Luma([255 - v]))
}

/// Grayscale dilation with a `(2 * radius + 1)` square structuring element.
///
/// Run as a row max followed by a column max; the square kernel is separable.
pub fn grow(mask: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 || mask.width() == 0 || mask.height() == 0 {
        return mask.clone();
    }
    let (width, height) = (mask.width() as usize, mask.height() as usize);
    let r = radius as usize;
    let src = mask.as_raw();

    let mut rows = vec![0u8; src.len()];
    for y in 0..height {
        let line = &src[y * width..(y + 1) * width];
        for x in 0..width {
            let lo = x.saturating_sub(r);
            let hi = (x + r).min(width - 1);
            rows[y * width + x] = line[lo..=hi].iter().copied().max().unwrap_or(0);
        }
    }

    let mut out = GrayImage::new(mask.width(), mask.height());
    let dst: &mut [u8] = &mut out;
    for x in 0..width {
        for y in 0..height {
            let lo = y.saturating_sub(r);
            let hi = (y + r).min(height - 1);
            dst[y * width + x] = (lo..=hi).map(|sy| rows[sy * width + x]).max().unwrap_or(0);
        }
    }
    out
}

/// Gaussian-blur a mask; even sizes are bumped to the next odd size.
pub fn blur(mask: &GrayImage, size: u32) -> GrayImage {
    gaussian_blur(mask, odd_kernel_size(size))
}

/// Dilate then feather, the standard treatment for segmentation masks.
pub fn grow_and_blur(mask: &GrayImage, grow_radius: u32, blur_size: u32) -> GrayImage {
    blur(&grow(mask, grow_radius), blur_size)
}

/// Fraction of pixels with a non-zero value.
pub fn coverage(mask: &GrayImage) -> f64 {
    let total = mask.as_raw().len();
    if total == 0 {
        return 0.0;
    }
    mask.as_raw().iter().filter(|v| **v > 0).count() as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(size: u32, at: (u32, u32)) -> GrayImage {
        let mut mask = GrayImage::new(size, size);
        mask.put_pixel(at.0, at.1, Luma([255]));
        mask
    }

    #[test]
    fn test_invert_twice_is_identity() {
        let mask = GrayImage::from_fn(7, 5, |x, y| Luma([(x * 30 + y * 7) as u8]));
        assert_eq!(invert(&invert(&mask)), mask);
        assert_eq!(invert(&mask).get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn test_grow_makes_square() {
        let grown = grow(&dot(15, (7, 7)), 2);
        for y in 0..15 {
            for x in 0..15 {
                let inside = (5..=9).contains(&x) && (5..=9).contains(&y);
                assert_eq!(grown.get_pixel(x, y)[0] == 255, inside, "pixel {x},{y}");
            }
        }
    }

    #[test]
    fn test_grow_never_shrinks() {
        let mask = GrayImage::from_fn(23, 17, |x, y| Luma([((x * 37 + y * 91) % 256) as u8]));
        for radius in [1, 3, 8] {
            let grown = grow(&mask, radius);
            for (p, g) in mask.pixels().zip(grown.pixels()) {
                assert!(g[0] >= p[0]);
            }
        }
    }

    #[test]
    fn test_grow_clips_at_border() {
        let grown = grow(&dot(6, (0, 0)), 3);
        assert_eq!(grown.get_pixel(3, 3)[0], 255);
        assert_eq!(grown.get_pixel(4, 0)[0], 0);
    }

    #[test]
    fn test_grow_and_blur_zero_is_identity() {
        let mask = dot(9, (4, 4));
        assert_eq!(grow_and_blur(&mask, 0, 0), mask);
    }

    #[test]
    fn test_coverage() {
        let mut mask = GrayImage::new(4, 4);
        mask.put_pixel(0, 0, Luma([1]));
        mask.put_pixel(1, 0, Luma([200]));
        assert!((coverage(&mask) - 2.0 / 16.0).abs() < 1e-12);
        assert_eq!(coverage(&GrayImage::new(0, 0)), 0.0);
    }
}
