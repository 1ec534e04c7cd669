use crate::common::BoundingBox;
use image::{imageops, GrayImage, RgbImage};

/// Grayscale conversion followed by a single histogram-equalization pass.
pub fn normalize(frame: &RgbImage) -> GrayImage {
    let mut gray = imageops::grayscale(frame);
    equalize_histogram(&mut gray);
    gray
}

/// Spreads the intensity histogram over the full 0..=255 range in place.
///
/// Uniform images are left untouched.
pub fn equalize_histogram(image: &mut GrayImage) {
    let mut histogram = [0u64; 256];
    for pixel in image.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    let cdf_min = histogram.iter().copied().find(|&count| count > 0).unwrap_or(0);
    if total == 0 || total == cdf_min {
        return;
    }

    let mut lut = [0u8; 256];
    let mut cumulative = 0u64;
    let scale = 255.0 / (total - cdf_min) as f64;
    for (value, count) in histogram.iter().enumerate() {
        cumulative += count;
        let mapped = (cumulative.saturating_sub(cdf_min)) as f64 * scale;
        lut[value] = mapped.round().clamp(0.0, 255.0) as u8;
    }

    for pixel in image.pixels_mut() {
        pixel.0[0] = lut[pixel.0[0] as usize];
    }
}

/// Copies `region` out of `image`. The region must already be clamped to the image.
pub fn crop(image: &GrayImage, region: BoundingBox) -> GrayImage {
    imageops::crop_imm(image, region.x, region.y, region.width, region.height).to_image()
}
