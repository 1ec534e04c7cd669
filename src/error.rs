use thiserror::Error;
use uuid::Uuid;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),
    #[error("Camera Error: {0}")]
    Camera(#[from] CameraError),
    #[error("Notify Error: {0}")]
    Notify(#[from] NotifyError),
    #[error("Runtime Error: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("UI Error: {0}")]
    Ui(String),
}

// Configuration Error Type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Required token `{0}` is not set")]
    MissingToken(&'static str),
    #[error("Tokens `{0}` and `{1}` share the same secret")]
    DuplicateToken(&'static str, &'static str),
    #[error("notify.webhook_url is not set")]
    MissingWebhook,
    #[error("Invalid value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// Camera Error Type
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera {device}: {reason}")]
    Open { device: String, reason: String },
    #[error("Failed to grab frame: {0}")]
    Grab(String),
    #[error("Camera is not open")]
    NotOpen,
    #[error("Capture thread ended before reporting startup")]
    StartupAborted,
}

// Notification Error Type
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Notification {0} dropped: queue full")]
    QueueFull(Uuid),
    #[error("Notification {0} dropped: worker stopped")]
    QueueClosed(Uuid),
    #[error("Transport error: {0}")]
    Transport(String),
}

// Decode Error Type
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("{strategy} failed to decode: {reason}")]
    Library {
        strategy: &'static str,
        reason: String,
    },
}
