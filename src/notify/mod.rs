pub mod notification;
pub mod webhook;
pub mod worker;

pub use notification::{Notification, NotifyOutcome};
pub use webhook::{webhook_transport, WebhookService};
pub use worker::{notify_channel, NotifyQueue, NotifyWorker};
