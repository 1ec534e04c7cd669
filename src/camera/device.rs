use crate::error::CameraError;
use image::RgbImage;

/// Resolution and frame-rate hints passed to the device on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFormat {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CaptureFormat {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

/// A source of raw RGB frames. Hints are best effort; devices may deliver
/// other sizes.
pub trait CaptureDevice {
    fn open(&mut self, format: CaptureFormat) -> Result<(), CameraError>;
    fn grab(&mut self) -> Result<RgbImage, CameraError>;
    fn release(&mut self);
    fn is_open(&self) -> bool;
    /// Human-readable device name for logs.
    fn describe(&self) -> String;
}

impl<D: CaptureDevice + ?Sized> CaptureDevice for Box<D> {
    fn open(&mut self, format: CaptureFormat) -> Result<(), CameraError> {
        (**self).open(format)
    }

    fn grab(&mut self) -> Result<RgbImage, CameraError> {
        (**self).grab()
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
