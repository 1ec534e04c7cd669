use crate::config::Settings;
use crate::error::AppError;
use crate::notify::{notify_channel, webhook_transport};
use crate::pipeline::Preview;
use crate::scanner::ScannerClient;
use tokio::runtime::Handle;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Owns the running service: the scanner thread and the notification task.
pub struct Coordinator {
    scanner: ScannerClient,
    notify_task: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl Coordinator {
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn is_running(&self) -> bool {
        self.scanner.is_running()
    }

    pub fn stop(&mut self) {
        self.cancel_token.cancel();
        self.scanner.stop();
        if let Some(task) = self.notify_task.take() {
            task.abort();
            info!("Coordinator stopped");
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct CoordinatorBuilder {
    settings: Settings,
    preview_tx: Option<Sender<Preview>>,
    runtime: Option<Handle>,
    cancel_token: Option<CancellationToken>,
}

impl CoordinatorBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            preview_tx: None,
            runtime: None,
            cancel_token: None,
        }
    }

    // Publishes previews for the viewer.
    pub fn preview(mut self, preview_tx: Sender<Preview>) -> Self {
        self.preview_tx = Some(preview_tx);
        self
    }

    // Runtime for the notification task; defaults to the current one.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn cancel_token(mut self, cancel_token: CancellationToken) -> Self {
        self.cancel_token = Some(cancel_token);
        self
    }

    /// Validates settings, starts the notification worker and opens the
    /// camera. Any failure here is a startup failure.
    pub fn build(self) -> Result<Coordinator, AppError> {
        self.settings.validate()?;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|e| AppError::Runtime(std::io::Error::other(e)))?,
        };
        let cancel_token = self.cancel_token.unwrap_or_default();

        let transport = webhook_transport(&self.settings.notify)?;
        let (queue, worker) = notify_channel(transport, self.settings.notify.queue_capacity);
        let notify_task = runtime.spawn(worker.run(cancel_token.clone()));

        let scanner = match ScannerClient::start(
            self.settings,
            queue,
            self.preview_tx,
            cancel_token.clone(),
        ) {
            Ok(scanner) => scanner,
            Err(err) => {
                cancel_token.cancel();
                return Err(err);
            }
        };

        Ok(Coordinator {
            scanner,
            notify_task: Some(notify_task),
            cancel_token,
        })
    }
}
