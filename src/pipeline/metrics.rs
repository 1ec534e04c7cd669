use indexmap::IndexMap;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Preprocess,
    Decode,
    Dispatch,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Preprocess => "preprocess",
            Stage::Decode => "decode",
            Stage::Dispatch => "dispatch",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accumulated time spent per stage, kept in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct StageTimings {
    durations: IndexMap<Stage, Duration>,
    samples: IndexMap<Stage, u32>,
}

impl StageTimings {
    pub fn record(&mut self, stage: Stage, duration: Duration) {
        *self.durations.entry(stage).or_default() += duration;
        *self.samples.entry(stage).or_default() += 1;
    }

    pub fn total(&self, stage: Stage) -> Duration {
        self.durations.get(&stage).copied().unwrap_or_default()
    }

    /// Mean duration per recorded sample.
    pub fn average(&self, stage: Stage) -> Duration {
        match self.samples.get(&stage) {
            Some(&count) if count > 0 => self.total(stage) / count,
            _ => Duration::ZERO,
        }
    }

    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        self.durations.keys().copied()
    }

    pub fn reset(&mut self) {
        self.durations.clear();
        self.samples.clear();
    }
}

/// Counters for one reporting window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub frames_read: u64,
    pub unavailable: u64,
    pub frames_scanned: u64,
    pub roi_scans: u64,
    pub detections: u64,
    pub fired: u64,
    pub notify_ok: u64,
    pub notify_failed: u64,
}

pub struct ScanStats {
    interval: Duration,
    window_start: Instant,
    window: StatsSnapshot,
    totals: StatsSnapshot,
    timings: StageTimings,
}

impl ScanStats {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            window_start: now,
            window: StatsSnapshot::default(),
            totals: StatsSnapshot::default(),
            timings: StageTimings::default(),
        }
    }

    pub fn frame_read(&mut self) {
        self.bump(|s| s.frames_read += 1);
    }

    pub fn unavailable(&mut self) {
        self.bump(|s| s.unavailable += 1);
    }

    pub fn scanned(&mut self, roi: bool) {
        self.bump(|s| {
            s.frames_scanned += 1;
            if roi {
                s.roi_scans += 1;
            }
        });
    }

    pub fn detection(&mut self, fired: bool) {
        self.bump(|s| {
            s.detections += 1;
            if fired {
                s.fired += 1;
            }
        });
    }

    pub fn notify_outcome(&mut self, success: bool) {
        self.bump(|s| {
            if success {
                s.notify_ok += 1;
            } else {
                s.notify_failed += 1;
            }
        });
    }

    pub fn time(&mut self, stage: Stage, started: Instant) {
        self.timings.record(stage, started.elapsed());
    }

    pub fn timings(&self) -> &StageTimings {
        &self.timings
    }

    pub fn window(&self) -> StatsSnapshot {
        self.window
    }

    /// Counters since startup.
    pub fn totals(&self) -> StatsSnapshot {
        self.totals
    }

    /// Logs and resets the window once the interval has elapsed.
    pub fn maybe_report(&mut self, now: Instant) -> Option<StatsSnapshot> {
        if now.saturating_duration_since(self.window_start) < self.interval {
            return None;
        }
        let window = self.window;
        info!(
            frames_read = window.frames_read,
            unavailable = window.unavailable,
            scanned = window.frames_scanned,
            roi_scans = window.roi_scans,
            detections = window.detections,
            fired = window.fired,
            notify_ok = window.notify_ok,
            notify_failed = window.notify_failed,
            "STATS"
        );
        for stage in self.timings.stages() {
            info!(
                stage = %stage,
                avg_us = self.timings.average(stage).as_micros() as u64,
                "STATS stage timing"
            );
        }
        self.window = StatsSnapshot::default();
        self.timings.reset();
        self.window_start = now;
        Some(window)
    }

    fn bump(&mut self, apply: impl Fn(&mut StatsSnapshot)) {
        apply(&mut self.window);
        apply(&mut self.totals);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timings_keep_insertion_order_and_average() {
        let mut timings = StageTimings::default();
        timings.record(Stage::Decode, Duration::from_millis(4));
        timings.record(Stage::Preprocess, Duration::from_millis(1));
        timings.record(Stage::Decode, Duration::from_millis(2));

        let order: Vec<_> = timings.stages().collect();
        assert_eq!(order, vec![Stage::Decode, Stage::Preprocess]);
        assert_eq!(timings.total(Stage::Decode), Duration::from_millis(6));
        assert_eq!(timings.average(Stage::Decode), Duration::from_millis(3));
        assert_eq!(timings.average(Stage::Dispatch), Duration::ZERO);
    }

    #[test]
    fn report_resets_window_but_not_totals() {
        let start = Instant::now();
        let mut stats = ScanStats::new(Duration::from_secs(60), start);
        stats.frame_read();
        stats.scanned(true);
        stats.detection(true);
        stats.notify_outcome(false);

        assert!(stats.maybe_report(start + Duration::from_secs(59)).is_none());
        let window = stats.maybe_report(start + Duration::from_secs(60)).unwrap();
        assert_eq!(window.frames_read, 1);
        assert_eq!(window.roi_scans, 1);
        assert_eq!(window.fired, 1);
        assert_eq!(window.notify_failed, 1);

        assert_eq!(stats.window(), StatsSnapshot::default());
        assert_eq!(stats.totals().frames_read, 1);
    }
}
