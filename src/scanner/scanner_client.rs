use crate::camera::{self, CaptureDevice, FrameSource};
use crate::config::Settings;
use crate::error::{AppError, CameraError};
use crate::notify::NotifyQueue;
use crate::pipeline::{Decoder, Preview, ScanLoop};
use std::sync::mpsc as std_mpsc;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;

/// Runs the scan loop on its own OS thread. The loop and its device are
/// built on that thread; `start` returns once the camera is open or failed.
pub struct ScannerClient {
    cancel_token: CancellationToken,
    scanner_thread: Option<std::thread::JoinHandle<()>>,
}

impl ScannerClient {
    pub fn start(
        settings: Settings,
        queue: NotifyQueue,
        preview_tx: Option<Sender<Preview>>,
        cancel_token: CancellationToken,
    ) -> Result<Self, AppError> {
        let camera_settings = settings.camera.clone();
        Self::start_with(settings, queue, preview_tx, cancel_token, move || {
            camera::device_from_settings(&camera_settings)
        })
    }

    /// Like `start`, with the capture device supplied by `make_device`.
    pub fn start_with<D, F>(
        settings: Settings,
        queue: NotifyQueue,
        preview_tx: Option<Sender<Preview>>,
        cancel_token: CancellationToken,
        make_device: F,
    ) -> Result<Self, AppError>
    where
        D: CaptureDevice + 'static,
        F: FnOnce() -> Result<D, CameraError> + Send + 'static,
    {
        let (ready_tx, ready_rx) = std_mpsc::sync_channel::<Result<(), AppError>>(1);
        let loop_token = cancel_token.clone();

        let scanner_thread = std::thread::Builder::new()
            .name("qr-scanner".into())
            .spawn(move || {
                let scan_loop = make_device()
                    .map_err(AppError::from)
                    .and_then(|device| build_scan_loop(device, &settings, queue, preview_tx));
                match scan_loop {
                    Ok(mut scan_loop) => {
                        if ready_tx.send(Ok(())).is_err() {
                            return;
                        }
                        scan_loop.run(loop_token);
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                    }
                }
            })?;

        let startup = ready_rx.recv();
        let mut client = Self {
            cancel_token,
            scanner_thread: Some(scanner_thread),
        };
        match startup {
            Ok(Ok(())) => Ok(client),
            Ok(Err(err)) => {
                client.stop();
                Err(err)
            }
            Err(_) => {
                client.stop();
                Err(CameraError::StartupAborted.into())
            }
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn is_running(&self) -> bool {
        self.scanner_thread
            .as_ref()
            .map(|thread| !thread.is_finished())
            .unwrap_or(false)
    }

    pub fn stop(&mut self) {
        self.cancel_token.cancel();
        if let Some(thread) = self.scanner_thread.take() {
            if thread.join().is_err() {
                tracing::error!("Scanner thread panicked");
            }
        }
    }
}

impl Drop for ScannerClient {
    fn drop(&mut self) {
        self.stop();
    }
}

fn build_scan_loop<D: CaptureDevice>(
    device: D,
    settings: &Settings,
    queue: NotifyQueue,
    preview_tx: Option<Sender<Preview>>,
) -> Result<ScanLoop<D>, AppError> {
    let mut source = FrameSource::from_settings(device, &settings.camera);
    source.open()?;
    let decoder = Decoder::from_kind(settings.scan.decoder)?;
    let scan_loop = ScanLoop::new(source, decoder, queue, settings)?;
    Ok(match preview_tx {
        Some(preview_tx) => scan_loop.with_preview(preview_tx),
        None => scan_loop,
    })
}
