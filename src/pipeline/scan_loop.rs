use crate::camera::{CaptureDevice, FrameSource};
use crate::common::{BoundingBox, Frame};
use crate::config::Settings;
use crate::error::ConfigError;
use crate::notify::NotifyQueue;
use crate::pipeline::classifier::{preview, Category, Classifier};
use crate::pipeline::debounce::DebounceGate;
use crate::pipeline::decoder::{Decoder, Detection};
use crate::pipeline::dispatcher::{DispatchDecision, Dispatcher};
use crate::pipeline::feedback::{FeedbackPanel, PanelSnapshot};
use crate::pipeline::metrics::{ScanStats, Stage, StatsSnapshot};
use crate::pipeline::preprocessing;
use crate::pipeline::roi_tracker::RoiTracker;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const IDLE_SLEEP: Duration = Duration::from_millis(10);
const PREVIEW_CHARS: usize = 10;

/// What the viewer needs to draw one frame.
#[derive(Debug, Clone)]
pub struct Preview {
    pub frame: Frame,
    pub roi: Option<BoundingBox>,
    pub panel: Option<PanelSnapshot>,
    pub stats: StatsSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// Detection with its box in full-frame coordinates.
    pub detection: Detection,
    pub category: Category,
    pub fired: bool,
    pub decision: DispatchDecision,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No frame this tick.
    Unavailable,
    /// Frame read but not scanned (decimation).
    Skipped,
    /// Frame scanned; `None` when no code was decoded.
    Scanned(Option<ScanResult>),
}

pub struct ScanLoop<D> {
    source: FrameSource<D>,
    roi: RoiTracker,
    decoder: Decoder,
    classifier: Classifier,
    gate: DebounceGate,
    dispatcher: Dispatcher,
    stats: ScanStats,
    every_n_frames: u64,
    log_raw_qr: bool,
    preview_tx: Option<Sender<Preview>>,
    frames_read: u64,
}

impl<D: CaptureDevice> ScanLoop<D> {
    /// `source` must already be open.
    pub fn new(
        source: FrameSource<D>,
        decoder: Decoder,
        queue: NotifyQueue,
        settings: &Settings,
    ) -> Result<Self, ConfigError> {
        let classifier = Classifier::new(settings.token_set()?);
        let dispatcher = Dispatcher::new(
            settings.notify.messages.clone(),
            queue,
            FeedbackPanel::new(settings.ui.hold()),
            settings.ui.show_raw_text,
        );
        Ok(Self {
            source,
            roi: RoiTracker::new(settings.scan.roi_padding, settings.scan.roi_timeout()),
            decoder,
            classifier,
            gate: DebounceGate::new(settings.scan.rearm_window()),
            dispatcher,
            stats: ScanStats::new(settings.logging.stats_interval(), Instant::now()),
            every_n_frames: u64::from(settings.scan.every_n_frames.max(1)),
            log_raw_qr: settings.logging.log_raw_qr,
            preview_tx: None,
            frames_read: 0,
        })
    }

    pub fn with_preview(mut self, preview_tx: Sender<Preview>) -> Self {
        self.preview_tx = Some(preview_tx);
        self
    }

    pub fn run(&mut self, cancel_token: CancellationToken) {
        info!(decoder = self.decoder.strategy_name(), "Scan loop started");
        while !cancel_token.is_cancelled() {
            if self.tick_at(Instant::now()) == TickOutcome::Unavailable {
                std::thread::sleep(IDLE_SLEEP);
            }
        }
        self.source.release();
        let totals = self.stats.totals();
        info!(
            frames_read = totals.frames_read,
            detections = totals.detections,
            fired = totals.fired,
            "Scan loop stopped"
        );
    }

    pub fn tick_at(&mut self, now: Instant) -> TickOutcome {
        // Re-arm before anything is detected, so a gap spent without
        // frames still counts toward the window.
        self.gate.on_tick(now);

        let Some(frame) = self.source.read() else {
            self.stats.unavailable();
            return TickOutcome::Unavailable;
        };
        self.frames_read += 1;
        self.stats.frame_read();

        let outcome = if self.frames_read % self.every_n_frames == 0 {
            TickOutcome::Scanned(self.scan(&frame, now))
        } else {
            TickOutcome::Skipped
        };

        for outcome in self.dispatcher.drain_outcomes(now) {
            self.stats.notify_outcome(outcome.is_success());
        }
        self.stats.maybe_report(now);
        self.publish(frame, now);
        outcome
    }

    fn scan(&mut self, frame: &Frame, now: Instant) -> Option<ScanResult> {
        let size = frame.size();

        let started = Instant::now();
        let gray = preprocessing::normalize(frame.image());
        let region = self.roi.current_region(size, now);
        let roi_scan = !region.is_full(size);
        let view = if roi_scan {
            preprocessing::crop(&gray, region)
        } else {
            gray
        };
        self.stats.time(Stage::Preprocess, started);
        self.stats.scanned(roi_scan);

        let started = Instant::now();
        let detection = self.decoder.detect(&view).map(|detection| Detection {
            bbox: detection
                .bbox
                .map(|bbox| bbox.translated(region.x, region.y)),
            ..detection
        });
        self.stats.time(Stage::Decode, started);

        let result = detection.map(|detection| {
            let category = self.classifier.classify(&detection.text);
            if self.log_raw_qr {
                info!("QR_DETECTED: {} raw={}", category, detection.text);
            } else {
                info!(
                    "QR_DETECTED: {} preview={}",
                    category,
                    preview(&detection.text, PREVIEW_CHARS)
                );
            }

            let fired = self.gate.on_detect(category, now);
            self.stats.detection(fired);

            let started = Instant::now();
            let decision = self
                .dispatcher
                .act(category, &detection.text, fired, now);
            self.stats.time(Stage::Dispatch, started);

            ScanResult {
                detection,
                category,
                fired,
                decision,
            }
        });

        self.roi.update(
            result.as_ref().and_then(|result| result.detection.bbox),
            size,
            now,
        );
        result
    }

    fn publish(&mut self, frame: Frame, now: Instant) {
        let Some(preview_tx) = &self.preview_tx else {
            return;
        };
        let preview = Preview {
            frame,
            roi: self.roi.region(),
            panel: self.dispatcher.panel().visible(now),
            stats: self.stats.totals(),
        };
        match preview_tx.try_send(preview) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!("Dropping preview: channel full");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Preview channel closed, no longer publishing");
                self.preview_tx = None;
            }
        }
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    pub fn roi(&self) -> &RoiTracker {
        &self.roi
    }

    pub fn gate(&self) -> &DebounceGate {
        &self.gate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::frame_source::tests::FakeDevice;
    use crate::camera::CaptureFormat;
    use crate::error::{CameraError, DecodeError, NotifyError};
    use crate::notify::{notify_channel, Notification, NotifyWorker};
    use crate::pipeline::decoder::fixtures::qr_frame;
    use crate::pipeline::decoder::DecodeStrategy;
    use image::{GrayImage, Rgb, RgbImage};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tower::service_fn;
    use tower::util::BoxService;

    type TestService = BoxService<Notification, (), NotifyError>;

    /// Replays canned results and records the size of every image it saw.
    struct Scripted {
        results: VecDeque<Option<Detection>>,
        seen: Arc<Mutex<Vec<(u32, u32)>>>,
    }

    impl DecodeStrategy for Scripted {
        fn decode(&mut self, image: &GrayImage) -> Result<Option<Detection>, DecodeError> {
            self.seen
                .lock()
                .unwrap()
                .push((image.width(), image.height()));
            Ok(self.results.pop_front().flatten())
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn settings() -> Settings {
        Settings::from_toml(
            r#"
            [tokens]
            open = "abc123"
            close = "def456"
            [notify]
            webhook_url = "http://localhost/hook"
            "#,
        )
        .unwrap()
    }

    fn detection(text: &str, bbox: Option<BoundingBox>) -> Option<Detection> {
        Some(Detection {
            text: text.into(),
            bbox,
        })
    }

    struct Harness {
        scan_loop: ScanLoop<FakeDevice>,
        worker: NotifyWorker<TestService>,
        seen: Arc<Mutex<Vec<(u32, u32)>>>,
    }

    fn harness(frames: usize, results: Vec<Option<Detection>>, settings: &Settings) -> Harness {
        harness_with(FakeDevice::with_frames(frames, 640, 480), results, settings)
    }

    fn harness_with(
        device: FakeDevice,
        results: Vec<Option<Detection>>,
        settings: &Settings,
    ) -> Harness {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let decoder = Decoder::new(Box::new(Scripted {
            results: results.into(),
            seen: seen.clone(),
        }));
        let (scan_loop, worker) = build_loop(device, decoder, settings);
        Harness {
            scan_loop,
            worker,
            seen,
        }
    }

    fn build_loop(
        device: FakeDevice,
        decoder: Decoder,
        settings: &Settings,
    ) -> (ScanLoop<FakeDevice>, NotifyWorker<TestService>) {
        let mut source = FrameSource::new(device, CaptureFormat::default(), 30, Duration::ZERO);
        source.open().unwrap();
        let service: TestService =
            BoxService::new(service_fn(|_n: Notification| async { Ok::<(), NotifyError>(()) }));
        let (queue, worker) = notify_channel(service, 8);
        (
            ScanLoop::new(source, decoder, queue, settings).unwrap(),
            worker,
        )
    }

    #[test]
    fn every_second_frame_is_scanned() {
        let mut h = harness(4, vec![None, None], &settings());
        let now = Instant::now();

        assert_eq!(h.scan_loop.tick_at(now), TickOutcome::Skipped);
        assert_eq!(h.scan_loop.tick_at(now), TickOutcome::Scanned(None));
        assert_eq!(h.scan_loop.tick_at(now), TickOutcome::Skipped);
        assert_eq!(h.scan_loop.tick_at(now), TickOutcome::Scanned(None));
        assert_eq!(h.scan_loop.tick_at(now), TickOutcome::Unavailable);
        assert_eq!(h.seen.lock().unwrap().len(), 2);
        assert_eq!(h.scan_loop.stats().totals().frames_read, 4);
        assert_eq!(h.scan_loop.stats().totals().unavailable, 1);
    }

    #[test]
    fn roi_box_is_translated_into_frame_coordinates() {
        let mut settings = settings();
        settings.scan.every_n_frames = 1;
        let results = vec![
            detection("abc123", Some(BoundingBox::new(300, 200, 40, 40))),
            detection("abc123", Some(BoundingBox::new(10, 10, 40, 40))),
        ];
        let mut h = harness(2, results, &settings);
        let now = Instant::now();

        h.scan_loop.tick_at(now);
        assert_eq!(
            h.scan_loop.roi().region(),
            Some(BoundingBox::new(260, 160, 120, 120))
        );

        let TickOutcome::Scanned(Some(result)) = h.scan_loop.tick_at(now) else {
            panic!("expected a detection");
        };
        assert_eq!(result.detection.bbox, Some(BoundingBox::new(270, 170, 40, 40)));
        assert_eq!(
            *h.seen.lock().unwrap(),
            vec![(640, 480), (120, 120)],
            "second scan should only look at the ROI"
        );
    }

    #[test]
    fn held_code_fires_once() {
        let mut settings = settings();
        settings.scan.every_n_frames = 1;
        let results = (0..3).map(|_| detection("abc123", None)).collect();
        let mut h = harness(3, results, &settings);
        let start = Instant::now();

        let fired: Vec<bool> = (0..3)
            .map(|i| match h.scan_loop.tick_at(start + Duration::from_millis(i * 100)) {
                TickOutcome::Scanned(Some(result)) => result.fired,
                other => panic!("unexpected tick outcome {:?}", other),
            })
            .collect();
        assert_eq!(fired, vec![true, false, false]);

        let queued = h.worker.requests.try_recv().unwrap();
        assert_eq!(queued.category, Category::Open);
        assert!(h.worker.requests.try_recv().is_err());
    }

    #[test]
    fn unknown_code_never_notifies() {
        let mut settings = settings();
        settings.scan.every_n_frames = 1;
        let mut h = harness(1, vec![detection("xyz", None)], &settings);

        let TickOutcome::Scanned(Some(result)) = h.scan_loop.tick_at(Instant::now()) else {
            panic!("expected a detection");
        };
        assert_eq!(result.category, Category::Unknown);
        assert_eq!(result.decision, DispatchDecision::Unrecognized);
        assert!(h.worker.requests.try_recv().is_err());
    }

    #[test]
    fn preview_is_published_and_dropped_when_full() {
        let mut settings = settings();
        settings.scan.every_n_frames = 1;
        let mut h = harness(2, vec![detection("abc123", None), None], &settings);
        let (preview_tx, mut preview_rx) = tokio::sync::mpsc::channel(1);
        h.scan_loop = h.scan_loop.with_preview(preview_tx);

        let now = Instant::now();
        h.scan_loop.tick_at(now);
        h.scan_loop.tick_at(now);

        let preview = preview_rx.try_recv().unwrap();
        assert_eq!(preview.frame.sequence(), 1);
        let panel = preview.panel.unwrap();
        assert_eq!(panel.lines[0], "OPEN MATCH");
        assert!(preview_rx.try_recv().is_err());
    }

    #[test]
    fn code_fires_again_after_camera_outage() {
        let mut settings = settings();
        settings.scan.every_n_frames = 1;
        let blank = || RgbImage::from_pixel(640, 480, Rgb([255, 255, 255]));
        let mut device = FakeDevice::default();
        device.grabs.push_back(Ok(blank()));
        for _ in 0..5 {
            device
                .grabs
                .push_back(Err(CameraError::Grab("cable pulled".into())));
        }
        device.grabs.push_back(Ok(blank()));
        let results = vec![detection("abc123", None), detection("abc123", None)];
        let mut h = harness_with(device, results, &settings);
        let start = Instant::now();

        let TickOutcome::Scanned(Some(first)) = h.scan_loop.tick_at(start) else {
            panic!("expected a detection");
        };
        assert!(first.fired);
        for i in 1..=5 {
            assert_eq!(
                h.scan_loop.tick_at(start + Duration::from_millis(i * 100)),
                TickOutcome::Unavailable
            );
        }

        let TickOutcome::Scanned(Some(second)) = h.scan_loop.tick_at(start + Duration::from_secs(5))
        else {
            panic!("expected a detection");
        };
        assert!(second.fired);
        assert!(matches!(second.decision, DispatchDecision::Queued(_)));
        assert_eq!(h.worker.requests.try_recv().unwrap().category, Category::Open);
        assert_eq!(h.worker.requests.try_recv().unwrap().category, Category::Open);
    }

    #[test]
    fn rendered_code_is_found_then_tracked_in_roi() {
        let mut settings = settings();
        settings.scan.every_n_frames = 1;
        let mut device = FakeDevice::default();
        for _ in 0..2 {
            device
                .grabs
                .push_back(Ok(qr_frame("abc123", 640, 480, 300, 200)));
        }
        let decoder = Decoder::from_kind(settings.scan.decoder).unwrap();
        let (mut scan_loop, _worker) = build_loop(device, decoder, &settings);
        let start = Instant::now();

        let TickOutcome::Scanned(Some(full)) = scan_loop.tick_at(start) else {
            panic!("code not found in full frame");
        };
        assert_eq!(full.category, Category::Open);
        assert!(full.fired);
        let roi = scan_loop.roi().region().expect("roi set from detection");
        assert!(!roi.is_full(crate::common::FrameSize::new(640, 480)));

        let TickOutcome::Scanned(Some(tracked)) =
            scan_loop.tick_at(start + Duration::from_millis(33))
        else {
            panic!("code not found inside roi");
        };
        assert_eq!(scan_loop.stats().totals().roi_scans, 1);
        let bbox = tracked.detection.bbox.expect("decoder reports a box");
        assert!(bbox.x.abs_diff(300) <= 4 && bbox.y.abs_diff(200) <= 4, "{:?}", bbox);
        assert!(!tracked.fired);
    }
}
