#[cfg(feature = "quirc")]
mod quirc_strategy;
#[cfg(feature = "rqrr")]
mod rqrr_strategy;

#[cfg(feature = "quirc")]
pub use quirc_strategy::QuircStrategy;
#[cfg(feature = "rqrr")]
pub use rqrr_strategy::RqrrStrategy;

use crate::common::BoundingBox;
use crate::config::DecoderKind;
use crate::error::{ConfigError, DecodeError};
use image::GrayImage;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

/// A decoded code. `bbox` is relative to the image that was scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub text: String,
    pub bbox: Option<BoundingBox>,
}

/// One way of finding and decoding the first QR code in a grayscale image.
pub trait DecodeStrategy {
    fn decode(&mut self, image: &GrayImage) -> Result<Option<Detection>, DecodeError>;
    fn name(&self) -> &'static str;
}

pub struct Decoder {
    strategy: Box<dyn DecodeStrategy>,
}

impl Decoder {
    pub fn new(strategy: Box<dyn DecodeStrategy>) -> Self {
        Self { strategy }
    }

    pub fn from_kind(kind: DecoderKind) -> Result<Self, ConfigError> {
        Ok(Self::new(select_strategy(kind)?))
    }

    /// One decode attempt. Library errors and panics count as "no code".
    pub fn detect(&mut self, image: &GrayImage) -> Option<Detection> {
        if image.width() == 0 || image.height() == 0 {
            return None;
        }
        let strategy = &mut self.strategy;
        match catch_unwind(AssertUnwindSafe(|| strategy.decode(image))) {
            Ok(Ok(detection)) => detection.filter(|detection| !detection.text.is_empty()),
            Ok(Err(err)) => {
                debug!("Decode attempt failed: {}", err);
                None
            }
            Err(_) => {
                warn!(
                    strategy = self.strategy.name(),
                    "Decoder panicked on malformed input, treating as no code"
                );
                None
            }
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }
}

/// Picks the decode strategy once at startup. `Auto` prefers the primary
/// (rqrr) and falls back to quirc when rqrr is not compiled in.
pub fn select_strategy(kind: DecoderKind) -> Result<Box<dyn DecodeStrategy>, ConfigError> {
    match kind {
        DecoderKind::Rqrr => primary(),
        DecoderKind::Quirc => fallback(),
        DecoderKind::Auto => primary().or_else(|_| fallback()),
    }
}

#[cfg(feature = "rqrr")]
fn primary() -> Result<Box<dyn DecodeStrategy>, ConfigError> {
    Ok(Box::new(RqrrStrategy::new()))
}

#[cfg(not(feature = "rqrr"))]
fn primary() -> Result<Box<dyn DecodeStrategy>, ConfigError> {
    Err(unavailable("rqrr"))
}

#[cfg(feature = "quirc")]
fn fallback() -> Result<Box<dyn DecodeStrategy>, ConfigError> {
    Ok(Box::new(QuircStrategy::new()))
}

#[cfg(not(feature = "quirc"))]
fn fallback() -> Result<Box<dyn DecodeStrategy>, ConfigError> {
    Err(unavailable("quirc"))
}

#[cfg(any(not(feature = "rqrr"), not(feature = "quirc")))]
fn unavailable(feature: &str) -> ConfigError {
    ConfigError::Invalid {
        key: "scan.decoder",
        reason: format!("decoder `{}` was not compiled in (enable feature `{}`)", feature, feature),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use image::{imageops, DynamicImage, GrayImage, Luma, RgbImage};
    use qrcode::QrCode;

    /// Pixels per QR module in rendered fixtures.
    pub const MODULE_PX: u32 = 4;

    /// White `width`x`height` frame with `text` encoded as a QR code whose
    /// top-left module sits at (`x`, `y`).
    pub fn qr_frame(text: &str, width: u32, height: u32, x: u32, y: u32) -> RgbImage {
        let code = QrCode::new(text.as_bytes())
            .unwrap()
            .render::<Luma<u8>>()
            .quiet_zone(false)
            .module_dimensions(MODULE_PX, MODULE_PX)
            .build();
        let mut canvas = GrayImage::from_pixel(width, height, Luma([255]));
        imageops::overlay(&mut canvas, &code, i64::from(x), i64::from(y));
        DynamicImage::ImageLuma8(canvas).to_rgb8()
    }
}
