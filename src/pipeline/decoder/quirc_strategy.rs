use super::{DecodeStrategy, Detection};
use crate::common::BoundingBox;
use crate::error::DecodeError;
use image::GrayImage;

/// Fallback strategy backed by quircs. Keeps one decoder instance so its
/// internal buffers are reused between frames.
pub struct QuircStrategy {
    decoder: quircs::Quirc,
}

impl QuircStrategy {
    pub fn new() -> Self {
        Self {
            decoder: quircs::Quirc::default(),
        }
    }
}

impl Default for QuircStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeStrategy for QuircStrategy {
    fn decode(&mut self, image: &GrayImage) -> Result<Option<Detection>, DecodeError> {
        let (width, height) = image.dimensions();
        let mut codes = self
            .decoder
            .identify(width as usize, height as usize, image.as_raw());

        let Some(code) = codes.next() else {
            return Ok(None);
        };
        let code = code.map_err(|err| library_error(format!("{:?}", err)))?;
        let data = code
            .decode()
            .map_err(|err| library_error(format!("{:?}", err)))?;

        let corners: Vec<(i32, i32)> = code.corners.iter().map(|p| (p.x, p.y)).collect();
        Ok(Some(Detection {
            text: String::from_utf8_lossy(&data.payload).into_owned(),
            bbox: BoundingBox::enclosing(&corners),
        }))
    }

    fn name(&self) -> &'static str {
        "quirc"
    }
}

fn library_error(reason: String) -> DecodeError {
    DecodeError::Library {
        strategy: "quirc",
        reason,
    }
}
