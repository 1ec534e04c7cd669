use crate::error::ConfigError;
use crate::pipeline::classifier::{Category, TokenSet};
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Variables understood for compatibility with existing `.env` files.
const LEGACY_ENV: [(&str, &str); 4] = [
    ("tokens.open", "OPEN_QR"),
    ("tokens.close", "CLOSE_QR"),
    ("tokens.test", "TEST_QR"),
    ("notify.webhook_url", "DISCORD_WEBHOOK_URL"),
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub camera: CameraSettings,
    pub scan: ScanSettings,
    pub tokens: TokenSettings,
    pub notify: NotifySettings,
    pub ui: UiSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    Device,
    Replay,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub source: CaptureSource,
    pub device_index: u32,
    pub replay_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub fail_threshold: u32,
    pub reopen_backoff_ms: u64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            source: CaptureSource::Device,
            device_index: 0,
            replay_dir: PathBuf::from("frames"),
            width: 640,
            height: 480,
            fps: 30,
            fail_threshold: 30,
            reopen_backoff_ms: 3000,
        }
    }
}

impl CameraSettings {
    pub fn reopen_backoff(&self) -> Duration {
        Duration::from_millis(self.reopen_backoff_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderKind {
    Auto,
    Rqrr,
    Quirc,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub every_n_frames: u32,
    pub roi_padding: u32,
    pub roi_timeout_ms: u64,
    pub rearm_window_ms: u64,
    pub decoder: DecoderKind,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            every_n_frames: 2,
            roi_padding: 40,
            roi_timeout_ms: 2000,
            rearm_window_ms: 1000,
            decoder: DecoderKind::Auto,
        }
    }
}

impl ScanSettings {
    pub fn roi_timeout(&self) -> Duration {
        Duration::from_millis(self.roi_timeout_ms)
    }

    pub fn rearm_window(&self) -> Duration {
        Duration::from_millis(self.rearm_window_ms)
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    pub open: Option<String>,
    pub close: Option<String>,
    pub test: Option<String>,
}

// Only whether a token is set, never its value.
impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redacted(token: &Option<String>) -> Option<&'static str> {
            token.as_ref().map(|_| "<redacted>")
        }
        f.debug_struct("TokenSettings")
            .field("open", &redacted(&self.open))
            .field("close", &redacted(&self.close))
            .field("test", &redacted(&self.test))
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifySettings {
    pub webhook_url: Option<String>,
    pub timeout_ms: u64,
    pub queue_capacity: usize,
    pub messages: MessageSettings,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_ms: 10_000,
            queue_capacity: 16,
            messages: MessageSettings::default(),
        }
    }
}

impl NotifySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessageSettings {
    pub open: String,
    pub close: String,
    pub test: String,
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            open: "あけた".to_string(),
            close: "しめた".to_string(),
            test: "test".to_string(),
        }
    }
}

impl MessageSettings {
    /// Message sent for a recognized category. `Unknown` never notifies.
    pub fn for_category(&self, category: Category) -> Option<&str> {
        match category {
            Category::Open => Some(&self.open),
            Category::Close => Some(&self.close),
            Category::Test => Some(&self.test),
            Category::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    pub enabled: bool,
    pub hold_ms: u64,
    pub show_raw_text: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            hold_ms: 1200,
            show_raw_text: false,
        }
    }
}

impl UiSettings {
    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub log_raw_qr: bool,
    pub stats_interval_secs: u64,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_raw_qr: false,
            stats_interval_secs: 60,
        }
    }
}

impl LoggingSettings {
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}

impl Settings {
    /// Loads layered configuration: `config/default.toml`, then `path`, then
    /// `QRGATE__*` environment variables, then the legacy variable names.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(File::with_name("config/default").required(false));
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(Environment::with_prefix("QRGATE").separator("__"));
        for (key, var) in LEGACY_ENV {
            let value = std::env::var(var).ok().filter(|value| !value.is_empty());
            builder = builder.set_override_option(key, value)?;
        }
        Self::from_builder(builder)
    }

    /// Builds settings from an inline TOML document, without touching the environment.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder().add_source(File::from_str(toml, FileFormat::Toml));
        Self::from_builder(builder)
    }

    fn from_builder(
        builder: ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn token_set(&self) -> Result<TokenSet, ConfigError> {
        TokenSet::new(
            self.tokens.open.clone(),
            self.tokens.close.clone(),
            self.tokens.test.clone(),
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.token_set()?;

        match self.notify.webhook_url.as_deref() {
            None | Some("") => return Err(ConfigError::MissingWebhook),
            Some(_) => {}
        }

        if self.scan.every_n_frames == 0 {
            return Err(invalid("scan.every_n_frames", "must be greater than 0"));
        }
        if self.camera.fail_threshold == 0 {
            return Err(invalid("camera.fail_threshold", "must be greater than 0"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(invalid("camera.width/height", "must be greater than 0"));
        }
        if self.notify.queue_capacity == 0 {
            return Err(invalid("notify.queue_capacity", "must be greater than 0"));
        }
        if self.logging.stats_interval_secs == 0 {
            return Err(invalid("logging.stats_interval_secs", "must be greater than 0"));
        }

        Ok(())
    }
}

fn invalid(key: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.to_string(),
    }
}
