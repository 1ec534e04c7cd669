use super::device::{CaptureDevice, CaptureFormat};
use crate::error::CameraError;
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

/// Plays back the images of a directory in file-name order, looping forever.
pub struct ReplayDevice {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
    paced: bool,
    frame_interval: Duration,
    last_grab: Option<Instant>,
    open: bool,
}

impl ReplayDevice {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Vec::new(),
            cursor: 0,
            paced: true,
            frame_interval: Duration::ZERO,
            last_grab: None,
            open: false,
        }
    }

    /// Whether grabs are throttled to the requested frame rate.
    pub fn paced(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    fn scan_dir(dir: &Path) -> Result<Vec<PathBuf>, CameraError> {
        let entries = std::fs::read_dir(dir).map_err(|e| CameraError::Open {
            device: dir.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn wait_for_next_frame(&mut self) {
        if !self.paced {
            return;
        }
        if let Some(last) = self.last_grab {
            let elapsed = last.elapsed();
            if elapsed < self.frame_interval {
                std::thread::sleep(self.frame_interval - elapsed);
            }
        }
        self.last_grab = Some(Instant::now());
    }
}

impl CaptureDevice for ReplayDevice {
    fn open(&mut self, format: CaptureFormat) -> Result<(), CameraError> {
        let files = Self::scan_dir(&self.dir)?;
        if files.is_empty() {
            return Err(CameraError::Open {
                device: self.describe(),
                reason: "no image files found".into(),
            });
        }
        self.files = files;
        self.cursor = 0;
        self.frame_interval = Duration::from_secs(1) / format.fps.max(1);
        self.last_grab = None;
        self.open = true;
        Ok(())
    }

    fn grab(&mut self) -> Result<RgbImage, CameraError> {
        if !self.open {
            return Err(CameraError::NotOpen);
        }
        self.wait_for_next_frame();
        let path = &self.files[self.cursor % self.files.len()];
        self.cursor = (self.cursor + 1) % self.files.len();
        image::open(path)
            .map(|image| image.to_rgb8())
            .map_err(|e| CameraError::Grab(format!("{}: {}", path.display(), e)))
    }

    fn release(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn describe(&self) -> String {
        format!("replay:{}", self.dir.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn write_frame(dir: &Path, name: &str, shade: u8) {
        RgbImage::from_pixel(4, 3, Rgb([shade, shade, shade]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn frames_play_in_name_order_and_loop() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "b.png", 20);
        write_frame(dir.path(), "a.png", 10);
        std::fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let mut device = ReplayDevice::new(dir.path()).paced(false);
        device.open(CaptureFormat::default()).unwrap();
        assert_eq!(device.files().len(), 2);

        let shades: Vec<u8> = (0..3)
            .map(|_| device.grab().unwrap().get_pixel(0, 0)[0])
            .collect();
        assert_eq!(shades, vec![10, 20, 10]);
    }

    #[test]
    fn empty_directory_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = ReplayDevice::new(dir.path());
        assert!(matches!(
            device.open(CaptureFormat::default()),
            Err(CameraError::Open { .. })
        ));
    }

    #[test]
    fn released_device_refuses_grab() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "a.png", 1);
        let mut device = ReplayDevice::new(dir.path()).paced(false);
        device.open(CaptureFormat::default()).unwrap();
        device.release();
        assert!(!device.is_open());
        assert!(matches!(device.grab(), Err(CameraError::NotOpen)));
    }
}
