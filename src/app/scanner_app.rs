use crate::app::views::preview_view::PreviewView;
use crate::app::views::View;
use crate::error::AppError;
use crate::pipeline::Preview;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub const WINDOW_TITLE: &str = "QR Scanner (q to quit)";

pub struct ScannerApp {
    preview_rx: mpsc::Receiver<Preview>,
    preview_view: PreviewView,
    cancel_token: CancellationToken,
    disconnected: bool,
}

impl ScannerApp {
    pub fn new(preview_rx: mpsc::Receiver<Preview>, cancel_token: CancellationToken) -> Self {
        Self {
            preview_rx,
            preview_view: PreviewView::new(),
            cancel_token,
            disconnected: false,
        }
    }

    /// Blocks the calling (main) thread until the window closes. Closing
    /// the window cancels the scanner.
    pub fn start_gui(
        preview_rx: mpsc::Receiver<Preview>,
        cancel_token: CancellationToken,
        width: u32,
        height: u32,
    ) -> Result<(), AppError> {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size(egui::vec2(width as f32 + 20.0, height as f32 + 60.0))
                .with_title(WINDOW_TITLE),
            ..Default::default()
        };

        let app_token = cancel_token.clone();
        let result = eframe::run_native(
            WINDOW_TITLE,
            options,
            Box::new(move |_cc| Ok(Box::new(ScannerApp::new(preview_rx, app_token)))),
        );
        cancel_token.cancel();
        result.map_err(|e| AppError::Ui(e.to_string()))
    }

    fn drain_previews(&mut self) {
        // Only the newest preview matters.
        loop {
            match self.preview_rx.try_recv() {
                Ok(preview) => self.preview_view.set_preview(preview),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    break;
                }
            }
        }
    }
}

impl eframe::App for ScannerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_previews();

        if ctx.input(|input| input.key_pressed(egui::Key::Q)) || self.cancel_token.is_cancelled() {
            info!("Quit requested from viewer");
            self.cancel_token.cancel();
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        egui::TopBottomPanel::bottom("counters").show(ctx, |ui| {
            ui.horizontal(|ui| match self.preview_view.current() {
                Some(preview) => {
                    let stats = preview.stats;
                    ui.label(format!("frames: {}", stats.frames_read));
                    ui.label(format!("scanned: {}", stats.frames_scanned));
                    ui.label(format!("detections: {}", stats.detections));
                    ui.label(format!("sent: {}", stats.fired));
                    ui.label(format!("notify failed: {}", stats.notify_failed));
                }
                None => {
                    ui.label("no frames yet");
                }
            });
            if self.disconnected {
                ui.colored_label(egui::Color32::RED, "Scanner stopped");
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.preview_view.draw(ui);
        });

        ctx.request_repaint();
    }
}
