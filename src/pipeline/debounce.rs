use crate::pipeline::classifier::Category;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmState {
    Armed,
    Cooling { last_seen: Instant },
}

/// Edge trigger with re-arm.
///
/// A category fires once when it is first seen, then stays quiet until it
/// has been absent for the whole re-arm window. Every sighting while cooling
/// pushes the window out again, so a code held in view fires exactly once.
#[derive(Debug, Clone)]
pub struct DebounceGate {
    rearm_window: Duration,
    states: [ArmState; Category::COUNT],
}

impl DebounceGate {
    pub fn new(rearm_window: Duration) -> Self {
        Self {
            rearm_window,
            states: [ArmState::Armed; Category::COUNT],
        }
    }

    /// Records a sighting. Returns `true` when the category was armed.
    pub fn on_detect(&mut self, category: Category, now: Instant) -> bool {
        let state = &mut self.states[category.index()];
        let fire = matches!(state, ArmState::Armed);
        *state = ArmState::Cooling { last_seen: now };
        fire
    }

    /// Re-arms every category that has been unseen for the re-arm window.
    pub fn on_tick(&mut self, now: Instant) {
        for category in Category::ALL {
            let state = &mut self.states[category.index()];
            if let ArmState::Cooling { last_seen } = *state {
                if now.saturating_duration_since(last_seen) >= self.rearm_window {
                    *state = ArmState::Armed;
                    debug!(category = %category, "REARM: {} re-armed", category);
                }
            }
        }
    }

    pub fn state(&self, category: Category) -> ArmState {
        self.states[category.index()]
    }

    pub fn is_armed(&self, category: Category) -> bool {
        matches!(self.state(category), ArmState::Armed)
    }

    pub fn rearm_window(&self) -> Duration {
        self.rearm_window
    }
}
