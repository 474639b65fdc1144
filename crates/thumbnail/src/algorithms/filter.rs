//! Separable Gaussian blur with OpenCV's kernel-size conventions.

use image::Pixel;
use imageproc::definitions::Image;
use imageproc::filter::separable_filter_equal;
use imageproc::map::{ChannelMap, WithChannel, map_subpixels};

/// Kernel sizes are forced odd; 0 behaves like 1 (identity).
pub fn odd_kernel_size(size: u32) -> u32 {
    if size % 2 == 0 { size + 1 } else { size }
}

/// Normalized 1-D Gaussian taps for an odd `size`, sigma derived from the size.
pub fn gaussian_kernel(size: u32) -> Vec<f32> {
    let size = odd_kernel_size(size) as usize;
    match size {
        1 => return vec![1.0],
        3 => return vec![0.25, 0.5, 0.25],
        5 => return vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
        7 => {
            return vec![0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125];
        }
        _ => {}
    }

    let sigma = 0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size / 2) as f64;
    let raw: Vec<f64> = (0..size)
        .map(|i| {
            let x = i as f64 - center;
            (-(x * x) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|v| (v / sum) as f32).collect()
}

/// Gaussian blur over every channel of an 8-bit image.
///
/// Borders replicate the edge pixel. Both passes run on `f32` samples and the
/// result is rounded once.
pub fn gaussian_blur<P>(image: &Image<P>, size: u32) -> Image<P>
where
    P: Pixel<Subpixel = u8> + WithChannel<f32>,
    ChannelMap<P, f32>: WithChannel<u8, Pixel = P>,
{
    let kernel = gaussian_kernel(size);
    if kernel.len() == 1 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    let samples = map_subpixels(image, f32::from);
    let blurred = separable_filter_equal(&samples, &kernel);
    map_subpixels(&blurred, to_u8)
}

pub(crate) fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn test_kernel_is_normalized_and_odd() {
        for size in [0, 2, 11, 30, 31, 301] {
            let kernel = gaussian_kernel(size);
            assert_eq!(kernel.len() % 2, 1);
            assert_eq!(kernel.len() as u32, odd_kernel_size(size).max(1));
            let sum: f32 = kernel.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4, "size {size} sums to {sum}");
        }
    }

    #[test]
    fn test_constant_image_unchanged() {
        let image = RgbImage::from_pixel(16, 9, Rgb([40, 120, 250]));
        let blurred = gaussian_blur(&image, 11);
        assert!(blurred.pixels().all(|p| *p == Rgb([40, 120, 250])));
    }

    #[test]
    fn test_blur_spreads_a_step() {
        let mut image = GrayImage::new(20, 1);
        for x in 10..20 {
            image.put_pixel(x, 0, Luma([255]));
        }
        let blurred = gaussian_blur(&image, 5);
        assert_eq!(blurred.get_pixel(0, 0)[0], 0);
        assert_eq!(blurred.get_pixel(19, 0)[0], 255);
        let edge = blurred.get_pixel(10, 0)[0];
        assert!(edge > 128 && edge < 255);
    }

    #[test]
    fn test_wide_kernels_keep_flat_images_exact() {
        let image = RgbImage::from_pixel(40, 30, Rgb([40, 120, 255]));
        for size in [11, 31, 45, 61, 301] {
            let blurred = gaussian_blur(&image, size);
            assert!(blurred.pixels().all(|p| *p == Rgb([40, 120, 255])), "size {size}");
        }
        let mask = GrayImage::from_pixel(3, 50, Luma([255]));
        assert!(gaussian_blur(&mask, 301).pixels().all(|p| p[0] == 255));
    }
}
