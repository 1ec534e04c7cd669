use crate::common::{BoundingBox, FrameSize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoiState {
    pub region: BoundingBox,
    pub last_seen: Instant,
}

/// Remembers where the last code was so the next scan can look there first.
#[derive(Debug, Clone)]
pub struct RoiTracker {
    padding: u32,
    timeout: Duration,
    state: Option<RoiState>,
}

impl RoiTracker {
    pub fn new(padding: u32, timeout: Duration) -> Self {
        Self {
            padding,
            timeout,
            state: None,
        }
    }

    /// Region to scan this tick. Falls back to the whole frame when there is
    /// no ROI or it has gone stale; a stale ROI is dropped here.
    pub fn current_region(&mut self, frame: FrameSize, now: Instant) -> BoundingBox {
        match self.state {
            Some(state) if now.saturating_duration_since(state.last_seen) <= self.timeout => {
                state.region.clamped(frame)
            }
            Some(_) => {
                self.state = None;
                BoundingBox::full(frame)
            }
            None => BoundingBox::full(frame),
        }
    }

    /// `bbox` must be in full-frame coordinates. `None` clears the ROI.
    pub fn update(&mut self, bbox: Option<BoundingBox>, frame: FrameSize, now: Instant) {
        self.state = bbox.map(|bbox| RoiState {
            region: bbox.padded(self.padding, frame),
            last_seen: now,
        });
    }

    pub fn state(&self) -> Option<RoiState> {
        self.state
    }

    pub fn region(&self) -> Option<BoundingBox> {
        self.state.map(|state| state.region)
    }

    pub fn clear(&mut self) {
        self.state = None;
    }
}
