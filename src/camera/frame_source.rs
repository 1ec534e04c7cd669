use super::device::{CaptureDevice, CaptureFormat};
use crate::common::Frame;
use crate::config::CameraSettings;
use crate::error::CameraError;
use chrono::Utc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraHealth {
    pub consecutive_failures: u32,
}

/// Owns the capture device and keeps it alive: failed grabs are counted and
/// once the threshold is hit the device is released and reopened after a
/// backoff. Nothing here is fatal except the first `open`.
pub struct FrameSource<D> {
    device: D,
    format: CaptureFormat,
    fail_threshold: u32,
    reopen_backoff: Duration,
    health: CameraHealth,
    sequence: u64,
    reopens: u64,
}

impl<D: CaptureDevice> FrameSource<D> {
    pub fn new(device: D, format: CaptureFormat, fail_threshold: u32, reopen_backoff: Duration) -> Self {
        Self {
            device,
            format,
            fail_threshold: fail_threshold.max(1),
            reopen_backoff,
            health: CameraHealth::default(),
            sequence: 0,
            reopens: 0,
        }
    }

    pub fn from_settings(device: D, settings: &CameraSettings) -> Self {
        let format = CaptureFormat {
            width: settings.width,
            height: settings.height,
            fps: settings.fps,
        };
        Self::new(device, format, settings.fail_threshold, settings.reopen_backoff())
    }

    pub fn open(&mut self) -> Result<(), CameraError> {
        self.device.open(self.format)?;
        self.health.consecutive_failures = 0;
        info!(
            device = %self.device.describe(),
            width = self.format.width,
            height = self.format.height,
            fps = self.format.fps,
            "CAMERA_OPEN"
        );
        Ok(())
    }

    /// Next frame, or `None` when the device could not deliver one.
    pub fn read(&mut self) -> Option<Frame> {
        let grabbed = if self.device.is_open() {
            self.device.grab()
        } else {
            Err(CameraError::NotOpen)
        };

        match grabbed {
            Ok(image) => {
                self.health.consecutive_failures = 0;
                self.sequence += 1;
                Some(Frame::new(image, Utc::now(), self.sequence))
            }
            Err(err) => {
                self.health.consecutive_failures += 1;
                if self.health.consecutive_failures == 1 {
                    warn!(device = %self.device.describe(), "CAMERA_FAIL: {}", err);
                }
                if self.health.consecutive_failures >= self.fail_threshold {
                    self.recover();
                }
                None
            }
        }
    }

    pub fn release(&mut self) {
        self.device.release();
    }

    pub fn health(&self) -> CameraHealth {
        self.health
    }

    /// Number of reopen cycles performed so far.
    pub fn reopens(&self) -> u64 {
        self.reopens
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    fn recover(&mut self) {
        warn!(
            device = %self.device.describe(),
            failures = self.health.consecutive_failures,
            backoff_ms = self.reopen_backoff.as_millis() as u64,
            "CAMERA_REOPEN"
        );
        self.device.release();
        if !self.reopen_backoff.is_zero() {
            std::thread::sleep(self.reopen_backoff);
        }
        self.reopens += 1;
        match self.device.open(self.format) {
            Ok(()) => info!(device = %self.device.describe(), "CAMERA_OPEN (reopened)"),
            Err(err) => error!(device = %self.device.describe(), "CAMERA_REOPEN failed: {}", err),
        }
        self.health.consecutive_failures = 0;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::collections::VecDeque;

    /// Scripted device: each grab pops the next result, failing once empty.
    #[derive(Default)]
    pub(crate) struct FakeDevice {
        pub grabs: VecDeque<Result<RgbImage, CameraError>>,
        pub opens: u32,
        pub releases: u32,
        pub fail_open: bool,
        pub open: bool,
    }

    impl FakeDevice {
        pub fn with_frames(count: usize, width: u32, height: u32) -> Self {
            Self {
                grabs: (0..count)
                    .map(|_| Ok(RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))))
                    .collect(),
                ..Self::default()
            }
        }
    }

    impl CaptureDevice for FakeDevice {
        fn open(&mut self, _format: CaptureFormat) -> Result<(), CameraError> {
            self.opens += 1;
            if self.fail_open {
                return Err(CameraError::Open {
                    device: "fake".into(),
                    reason: "unplugged".into(),
                });
            }
            self.open = true;
            Ok(())
        }

        fn grab(&mut self) -> Result<RgbImage, CameraError> {
            self.grabs
                .pop_front()
                .unwrap_or_else(|| Err(CameraError::Grab("no frame".into())))
        }

        fn release(&mut self) {
            self.releases += 1;
            self.open = false;
        }

        fn is_open(&self) -> bool {
            self.open
        }

        fn describe(&self) -> String {
            "fake".into()
        }
    }

    fn source(device: FakeDevice, threshold: u32) -> FrameSource<FakeDevice> {
        FrameSource::new(device, CaptureFormat::default(), threshold, Duration::ZERO)
    }

    #[test]
    fn successful_reads_number_frames() {
        let mut source = source(FakeDevice::with_frames(2, 8, 8), 30);
        source.open().unwrap();
        assert_eq!(source.read().unwrap().sequence(), 1);
        assert_eq!(source.read().unwrap().sequence(), 2);
        assert_eq!(source.health().consecutive_failures, 0);
    }

    #[test]
    fn thirty_failures_trigger_one_reopen() {
        let mut source = source(FakeDevice::default(), 30);
        source.open().unwrap();

        for _ in 0..29 {
            assert!(source.read().is_none());
        }
        assert_eq!(source.health().consecutive_failures, 29);
        assert_eq!(source.device().releases, 0);

        assert!(source.read().is_none());
        assert_eq!(source.device().releases, 1);
        assert_eq!(source.device().opens, 2);
        assert_eq!(source.reopens(), 1);
        assert_eq!(source.health().consecutive_failures, 0);
    }

    #[test]
    fn failed_reopen_still_resets_counter() {
        let mut source = source(FakeDevice::default(), 3);
        source.open().unwrap();
        source.device.fail_open = true;

        for _ in 0..3 {
            source.read();
        }
        assert_eq!(source.reopens(), 1);
        assert!(!source.device().is_open());
        assert_eq!(source.health().consecutive_failures, 0);

        // Reads on the released device count as failures toward the next cycle.
        for _ in 0..3 {
            assert!(source.read().is_none());
        }
        assert_eq!(source.reopens(), 2);
    }

    #[test]
    fn recovery_is_bounded_by_threshold() {
        let mut source = source(FakeDevice::default(), 5);
        source.open().unwrap();
        for _ in 0..50 {
            source.read();
            assert!(source.health().consecutive_failures < 5);
        }
        assert_eq!(source.reopens(), 10);
    }

    #[test]
    fn success_resets_failures() {
        let mut device = FakeDevice::default();
        device.grabs.push_back(Err(CameraError::Grab("blip".into())));
        device
            .grabs
            .push_back(Ok(RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]))));
        let mut source = source(device, 30);
        source.open().unwrap();

        assert!(source.read().is_none());
        assert_eq!(source.health().consecutive_failures, 1);
        assert!(source.read().is_some());
        assert_eq!(source.health().consecutive_failures, 0);
    }

    #[test]
    fn open_failure_is_reported() {
        let device = FakeDevice {
            fail_open: true,
            ..FakeDevice::default()
        };
        let mut source = source(device, 30);
        assert!(matches!(source.open(), Err(CameraError::Open { .. })));
    }
}
