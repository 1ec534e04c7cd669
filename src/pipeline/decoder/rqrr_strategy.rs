use super::{DecodeStrategy, Detection};
use crate::common::BoundingBox;
use crate::error::DecodeError;
use image::GrayImage;

/// Primary strategy: rqrr grid detection, first grid only.
#[derive(Debug, Default)]
pub struct RqrrStrategy;

impl RqrrStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl DecodeStrategy for RqrrStrategy {
    fn decode(&mut self, image: &GrayImage) -> Result<Option<Detection>, DecodeError> {
        let (width, height) = image.dimensions();
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            width as usize,
            height as usize,
            |x, y| image.get_pixel(x as u32, y as u32).0[0],
        );

        let grids = prepared.detect_grids();
        let Some(grid) = grids.first() else {
            return Ok(None);
        };

        let (_meta, text) = grid.decode().map_err(|err| DecodeError::Library {
            strategy: self.name(),
            reason: format!("{:?}", err),
        })?;

        let corners: Vec<(i32, i32)> = grid.bounds.iter().map(|p| (p.x, p.y)).collect();
        Ok(Some(Detection {
            text,
            bbox: BoundingBox::enclosing(&corners),
        }))
    }

    fn name(&self) -> &'static str {
        "rqrr"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::FrameSize;
    use crate::pipeline::decoder::fixtures::{qr_frame, MODULE_PX};
    use crate::pipeline::preprocessing::{crop, normalize};
    use image::Luma;

    const CODE_PX: u32 = 21 * MODULE_PX;

    fn assert_near(bbox: BoundingBox, x: u32, y: u32) {
        assert!(
            bbox.x.abs_diff(x) <= MODULE_PX && bbox.y.abs_diff(y) <= MODULE_PX,
            "unexpected position {:?}",
            bbox
        );
        assert!(bbox.width.abs_diff(CODE_PX) <= MODULE_PX, "unexpected width {:?}", bbox);
    }

    #[test]
    fn rendered_code_decodes_in_full_frame_and_roi() {
        let mut strategy = RqrrStrategy::new();
        let frame = normalize(&qr_frame("abc123", 640, 480, 300, 200));

        let full = strategy.decode(&frame).unwrap().expect("code in full frame");
        assert_eq!(full.text, "abc123");
        assert_near(full.bbox.expect("full-frame box"), 300, 200);

        let region =
            BoundingBox::new(300, 200, CODE_PX, CODE_PX).padded(40, FrameSize::new(640, 480));
        let cropped = strategy
            .decode(&crop(&frame, region))
            .unwrap()
            .expect("code inside roi");
        assert_eq!(cropped.text, "abc123");
        assert_near(cropped.bbox.expect("roi box"), 40, 40);
    }

    #[test]
    fn blank_image_has_no_code() {
        let mut strategy = RqrrStrategy::new();
        let image = GrayImage::from_pixel(120, 90, Luma([255]));
        assert!(strategy.decode(&image).unwrap().is_none());
    }

    #[test]
    fn checkerboard_noise_has_no_code() {
        let mut strategy = RqrrStrategy::new();
        let image = GrayImage::from_fn(120, 90, |x, y| {
            if (x / 3 + y / 5) % 2 == 0 {
                Luma([0])
            } else {
                Luma([255])
            }
        });
        // Either no grid or a grid that fails to decode; never a panic.
        assert!(matches!(strategy.decode(&image), Ok(None) | Err(_)));
    }
}
