use qr_gate::app::ScannerApp;
use qr_gate::config::Settings;
use qr_gate::coordinator::CoordinatorBuilder;
use qr_gate::error::AppError;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const PREVIEW_BUFFER_SIZE: usize = 2;

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn config_path() -> Option<PathBuf> {
    std::env::var_os("QRGATE_CONFIG")
        .map(PathBuf::from)
        .or_else(|| std::env::args_os().nth(1).map(PathBuf::from))
}

fn main() {
    dotenvy::dotenv().ok();

    let settings = match Settings::load(config_path().as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            init_logging("info");
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    init_logging(&settings.logging.level);

    if let Err(e) = run(settings) {
        tracing::error!("Fatal: {}", e);
        std::process::exit(1);
    }
}

fn run(settings: Settings) -> Result<(), AppError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let cancel_token = CancellationToken::new();

    let ui_enabled = settings.ui.enabled;
    let (width, height) = (settings.camera.width, settings.camera.height);
    let (preview_tx, preview_rx) = tokio::sync::mpsc::channel(PREVIEW_BUFFER_SIZE);

    let mut builder = CoordinatorBuilder::new(settings)
        .runtime(runtime.handle().clone())
        .cancel_token(cancel_token.clone());
    if ui_enabled {
        builder = builder.preview(preview_tx);
    }
    let mut coordinator = builder.build()?;
    tracing::info!("QR scanner running");

    if ui_enabled {
        ScannerApp::start_gui(preview_rx, cancel_token.clone(), width, height)?;
    } else {
        let token = cancel_token.clone();
        runtime.block_on(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        tracing::error!("Failed to listen for Ctrl-C: {}", e);
                    }
                    tracing::info!("Ctrl-C received, shutting down");
                }
            }
        });
    }

    coordinator.stop();
    runtime.shutdown_timeout(std::time::Duration::from_secs(1));
    Ok(())
}
