use super::device::{CaptureDevice, CaptureFormat};
use crate::error::CameraError;
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;

/// Live camera addressed by its system index.
pub struct NokhwaDevice {
    index: u32,
    camera: Option<Camera>,
}

impl NokhwaDevice {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            camera: None,
        }
    }

    fn open_error(&self, err: impl ToString) -> CameraError {
        CameraError::Open {
            device: self.describe(),
            reason: err.to_string(),
        }
    }
}

impl CaptureDevice for NokhwaDevice {
    fn open(&mut self, format: CaptureFormat) -> Result<(), CameraError> {
        self.release();
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            CameraFormat::new(
                Resolution::new(format.width, format.height),
                FrameFormat::MJPEG,
                format.fps,
            ),
        ));
        let mut camera = Camera::new(CameraIndex::Index(self.index), requested)
            .map_err(|e| self.open_error(e))?;
        camera.open_stream().map_err(|e| self.open_error(e))?;
        tracing::debug!(format = ?camera.camera_format(), "Camera stream opened");
        self.camera = Some(camera);
        Ok(())
    }

    fn grab(&mut self) -> Result<RgbImage, CameraError> {
        let camera = self.camera.as_mut().ok_or(CameraError::NotOpen)?;
        let buffer = camera
            .frame()
            .map_err(|e| CameraError::Grab(e.to_string()))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CameraError::Grab(e.to_string()))?;
        let (width, height) = (decoded.width(), decoded.height());
        // Rebuild on our own image version; nokhwa may pin a different one.
        RgbImage::from_raw(width, height, decoded.into_raw())
            .ok_or_else(|| CameraError::Grab("frame buffer size mismatch".into()))
    }

    fn release(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                tracing::debug!("Failed to stop camera stream: {}", e);
            }
        }
    }

    fn is_open(&self) -> bool {
        self.camera.is_some()
    }

    fn describe(&self) -> String {
        format!("camera:{}", self.index)
    }
}

impl Drop for NokhwaDevice {
    fn drop(&mut self) {
        self.release();
    }
}
