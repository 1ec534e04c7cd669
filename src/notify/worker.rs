use super::notification::{Notification, NotifyOutcome};
use crate::error::NotifyError;
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tower::{Service, ServiceExt};
use tracing::{debug, info};

/// Scan-loop side of the notification channel pair. Never blocks.
pub struct NotifyQueue {
    requests: mpsc::Sender<Notification>,
    outcomes: mpsc::Receiver<NotifyOutcome>,
}

impl NotifyQueue {
    pub fn submit(&self, notification: Notification) -> Result<(), NotifyError> {
        let id = notification.id;
        self.requests.try_send(notification).map_err(|err| match err {
            TrySendError::Full(_) => NotifyError::QueueFull(id),
            TrySendError::Closed(_) => NotifyError::QueueClosed(id),
        })
    }

    /// Next finished notification, if any.
    pub fn try_outcome(&mut self) -> Option<NotifyOutcome> {
        self.outcomes.try_recv().ok()
    }
}

/// Async side: delivers notifications one at a time through the transport
/// service and reports every outcome back.
pub struct NotifyWorker<S> {
    service: S,
    pub(crate) requests: mpsc::Receiver<Notification>,
    outcomes: mpsc::Sender<NotifyOutcome>,
}

pub fn notify_channel<S>(service: S, capacity: usize) -> (NotifyQueue, NotifyWorker<S>) {
    let (request_tx, request_rx) = mpsc::channel(capacity);
    let (outcome_tx, outcome_rx) = mpsc::channel(capacity);
    (
        NotifyQueue {
            requests: request_tx,
            outcomes: outcome_rx,
        },
        NotifyWorker {
            service,
            requests: request_rx,
            outcomes: outcome_tx,
        },
    )
}

impl<S> NotifyWorker<S>
where
    S: Service<Notification, Response = ()>,
    S::Error: Display,
{
    pub async fn run(mut self, cancel_token: CancellationToken) {
        info!("Notification worker started");
        loop {
            let notification = tokio::select! {
                _ = cancel_token.cancelled() => break,
                next = self.requests.recv() => match next {
                    Some(notification) => notification,
                    None => break,
                },
            };

            debug!(
                id = %notification.id,
                category = %notification.category,
                "Delivering notification"
            );
            let result = self.deliver(notification.clone()).await;
            let outcome = NotifyOutcome {
                notification,
                result,
            };
            if self.outcomes.send(outcome).await.is_err() {
                debug!("Outcome receiver dropped, stopping notification worker");
                break;
            }
        }
        info!("Notification worker stopped");
    }

    async fn deliver(&mut self, notification: Notification) -> Result<(), NotifyError> {
        let service = self
            .service
            .ready()
            .await
            .map_err(|err| NotifyError::Transport(err.to_string()))?;
        service
            .call(notification)
            .await
            .map_err(|err| NotifyError::Transport(err.to_string()))
    }
}
