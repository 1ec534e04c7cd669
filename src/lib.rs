pub mod app;
pub mod camera;
pub mod common;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod notify;
pub mod pipeline;
pub mod scanner;

pub use config::Settings;
pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use error::{AppError, CameraError, ConfigError, NotifyError};
