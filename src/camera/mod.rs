pub mod device;
pub mod frame_source;
#[cfg(feature = "camera")]
pub mod nokhwa_device;
pub mod replay_device;

pub use device::{CaptureDevice, CaptureFormat};
pub use frame_source::{CameraHealth, FrameSource};
#[cfg(feature = "camera")]
pub use nokhwa_device::NokhwaDevice;
pub use replay_device::ReplayDevice;

use crate::config::{CameraSettings, CaptureSource};
use crate::error::CameraError;

/// Builds the device named by the settings.
pub fn device_from_settings(settings: &CameraSettings) -> Result<Box<dyn CaptureDevice>, CameraError> {
    match settings.source {
        CaptureSource::Replay => Ok(Box::new(ReplayDevice::new(settings.replay_dir.clone()))),
        #[cfg(feature = "camera")]
        CaptureSource::Device => Ok(Box::new(NokhwaDevice::new(settings.device_index))),
        #[cfg(not(feature = "camera"))]
        CaptureSource::Device => Err(CameraError::Open {
            device: format!("camera:{}", settings.device_index),
            reason: "built without the `camera` feature; use camera.source = \"replay\"".into(),
        }),
    }
}
