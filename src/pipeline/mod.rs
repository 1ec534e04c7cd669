pub mod classifier;
pub mod debounce;
pub mod decoder;
pub mod dispatcher;
pub mod feedback;
pub mod metrics;
pub mod preprocessing;
pub mod roi_tracker;
pub mod scan_loop;

pub use classifier::{Category, Classifier, TokenSet};
pub use debounce::{ArmState, DebounceGate};
pub use decoder::{Decoder, DecodeStrategy, Detection};
pub use dispatcher::{DispatchDecision, Dispatcher};
pub use feedback::{FeedbackPanel, PanelSnapshot};
pub use metrics::{ScanStats, Stage, StatsSnapshot};
pub use roi_tracker::{RoiState, RoiTracker};
pub use scan_loop::{Preview, ScanLoop, ScanResult, TickOutcome};
