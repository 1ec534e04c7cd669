use std::time::{Duration, Instant};
use uuid::Uuid;

/// What the overlay panel should show right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSnapshot {
    pub lines: Vec<String>,
    pub ok: bool,
}

/// Short-lived status panel shown over the preview after a decision.
#[derive(Debug, Clone)]
pub struct FeedbackPanel {
    hold: Duration,
    lines: Vec<String>,
    ok: bool,
    until: Option<Instant>,
    owner: Option<Uuid>,
}

impl FeedbackPanel {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            lines: Vec::new(),
            ok: true,
            until: None,
            owner: None,
        }
    }

    pub fn show(&mut self, lines: Vec<String>, ok: bool, owner: Option<Uuid>, now: Instant) {
        self.lines = lines;
        self.ok = ok;
        self.owner = owner;
        self.until = Some(now + self.hold);
    }

    /// Replaces the status line if the panel still belongs to `owner`.
    pub fn resolve(&mut self, owner: Uuid, status: &str, ok: bool, now: Instant) -> bool {
        if self.owner != Some(owner) {
            return false;
        }
        if let Some(line) = self.lines.get_mut(1) {
            *line = status.to_string();
        }
        self.ok = ok;
        self.until = Some(now + self.hold);
        true
    }

    pub fn visible(&self, now: Instant) -> Option<PanelSnapshot> {
        match self.until {
            Some(until) if now < until => Some(PanelSnapshot {
                lines: self.lines.clone(),
                ok: self.ok,
            }),
            _ => None,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }
}
