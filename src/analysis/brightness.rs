//! Mean luminance of an image region.

use image::{imageops, RgbImage};

/// Returns the mean gray level of `image` in `[0, 255]`.
///
/// The image is reduced to a single luminance channel first. An empty
/// image has brightness `0.0`.
pub fn brightness(image: &RgbImage) -> f64 {
    let gray = imageops::grayscale(image);
    let count = gray.as_raw().len();
    if count == 0 {
        return 0.0;
    }

    let sum: u64 = gray.as_raw().iter().map(|&v| u64::from(v)).sum();
    sum as f64 / count as f64
}
