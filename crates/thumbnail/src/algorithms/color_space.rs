//! sRGB transfer functions.

/// Decode one 8-bit sRGB channel value into linear light in `[0, 1]`.
pub fn srgb_to_linear(value: f64) -> f64 {
    let c = (value / 255.0).clamp(0.0, 1.0);
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Encode linear light back into an 8-bit sRGB channel value.
pub fn linear_to_srgb(value: f64) -> u8 {
    let l = value.clamp(0.0, 1.0);
    let c = if l <= 0.0031308 {
        12.92 * l
    } else {
        1.055 * l.powf(1.0 / 2.4) - 0.055
    };
    (c * 255.0).round().clamp(0.0, 255.0) as u8
}

pub fn srgb_to_linear_rgb(rgb: [u8; 3]) -> [f64; 3] {
    rgb.map(|c| srgb_to_linear(c as f64))
}

pub fn linear_to_srgb_rgb(linear: [f64; 3]) -> [u8; 3] {
    linear.map(linear_to_srgb)
}
