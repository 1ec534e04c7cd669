use crate::config::MessageSettings;
use crate::notify::{Notification, NotifyOutcome, NotifyQueue};
use crate::pipeline::classifier::{preview, Category};
use crate::pipeline::feedback::FeedbackPanel;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

const PREVIEW_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchDecision {
    /// A notification was queued for delivery.
    Queued(Uuid),
    /// The notification could not be queued.
    QueueFailed,
    /// Fired, but the payload is not one of ours.
    Unrecognized,
    /// The category was still cooling down.
    Suppressed,
}

/// Turns debounce decisions into notifications and panel feedback.
pub struct Dispatcher {
    messages: MessageSettings,
    queue: NotifyQueue,
    panel: FeedbackPanel,
    show_raw_text: bool,
}

impl Dispatcher {
    pub fn new(
        messages: MessageSettings,
        queue: NotifyQueue,
        panel: FeedbackPanel,
        show_raw_text: bool,
    ) -> Self {
        Self {
            messages,
            queue,
            panel,
            show_raw_text,
        }
    }

    pub fn act(
        &mut self,
        category: Category,
        raw_text: &str,
        fire: bool,
        now: Instant,
    ) -> DispatchDecision {
        if !fire {
            debug!(category = %category, "IGNORED: {} (not armed)", category);
            return DispatchDecision::Suppressed;
        }

        let Some(message) = self.messages.for_category(category) else {
            info!("UNKNOWN: unrecognized QR code");
            let lines = self.with_raw_text(vec!["UNKNOWN QR".into(), "(ignored)".into()], raw_text);
            self.panel.show(lines, false, None, now);
            return DispatchDecision::Unrecognized;
        };

        let notification = Notification::new(category, message);
        let id = notification.id;
        let match_line = format!("{} MATCH", category);

        match self.queue.submit(notification) {
            Ok(()) => {
                debug!(id = %id, category = %category, "Notification queued");
                let lines = self.with_raw_text(vec![match_line, "(sending)".into()], raw_text);
                self.panel.show(lines, true, Some(id), now);
                DispatchDecision::Queued(id)
            }
            Err(err) => {
                warn!(category = %category, "NOTIFY_FAIL: {}", err);
                let lines =
                    self.with_raw_text(vec![match_line, "(notify failed)".into()], raw_text);
                self.panel.show(lines, false, None, now);
                DispatchDecision::QueueFailed
            }
        }
    }

    /// Applies every finished notification to logs and the panel.
    pub fn drain_outcomes(&mut self, now: Instant) -> Vec<NotifyOutcome> {
        let mut finished = Vec::new();
        while let Some(outcome) = self.queue.try_outcome() {
            let notification = &outcome.notification;
            match &outcome.result {
                Ok(()) => {
                    info!(
                        id = %notification.id,
                        "SENT: {} -> {}",
                        notification.category,
                        notification.message
                    );
                    self.panel.resolve(notification.id, "(sent)", true, now);
                }
                Err(err) => {
                    warn!(
                        id = %notification.id,
                        "NOTIFY_FAIL: {} ({})",
                        notification.category,
                        err
                    );
                    self.panel
                        .resolve(notification.id, "(notify failed)", false, now);
                }
            }
            finished.push(outcome);
        }
        finished
    }

    pub fn panel(&self) -> &FeedbackPanel {
        &self.panel
    }

    fn with_raw_text(&self, mut lines: Vec<String>, raw_text: &str) -> Vec<String> {
        if self.show_raw_text {
            lines.push(format!("txt: {}", preview(raw_text, PREVIEW_CHARS)));
        }
        lines
    }
}
