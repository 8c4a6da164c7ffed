//! Process configuration from environment variables (optionally via `.env`).

use crate::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_MODEL_PATH: &str = "model_pfe.json";
pub const DEFAULT_SCALER_PATH: &str = "scaler_pfe.json";
pub const DEFAULT_ALERT_SOUND: &str = "alert.mp3";
pub const DEFAULT_LOGO: &str = "logo.png";
pub const DEFAULT_ALERT_DELAY_SECS: u64 = 5;
pub const DEFAULT_FAILURE_INDICATOR: &str = "Failure";
pub const DEFAULT_MAX_UPLOAD_MB: usize = 50;
pub const DEFAULT_PREVIEW_ROWS: usize = 5;
pub const DEFAULT_BIND: &str = "127.0.0.1:8501";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
    pub alert_sound_path: PathBuf,
    /// Image shown on every page and used as the page icon.
    pub logo_path: PathBuf,
    /// Lead time before the alert sound plays once a failure is predicted.
    pub alert_delay: Duration,
    /// A prediction whose text contains this marks a failure.
    pub failure_indicator: String,
    /// When set, an unreadable manual aborts the request instead of yielding no actions.
    pub strict_manual: bool,
    pub max_upload_bytes: usize,
    pub preview_rows: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            scaler_path: PathBuf::from(DEFAULT_SCALER_PATH),
            alert_sound_path: PathBuf::from(DEFAULT_ALERT_SOUND),
            logo_path: PathBuf::from(DEFAULT_LOGO),
            alert_delay: Duration::from_secs(DEFAULT_ALERT_DELAY_SECS),
            failure_indicator: DEFAULT_FAILURE_INDICATOR.to_string(),
            strict_manual: false,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

impl AppConfig {
    /// Load `.env` from the working directory if present, then read `MEDPREDICT_*` variables.
    pub fn from_env() -> Result<Self, Error> {
        if let Ok(path) = dotenvy::dotenv() {
            info!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(v) = get("MEDPREDICT_MODEL_PATH") {
            config.model_path = PathBuf::from(v);
        }
        if let Some(v) = get("MEDPREDICT_SCALER_PATH") {
            config.scaler_path = PathBuf::from(v);
        }
        if let Some(v) = get("MEDPREDICT_ALERT_SOUND") {
            config.alert_sound_path = PathBuf::from(v);
        }
        if let Some(v) = get("MEDPREDICT_LOGO") {
            config.logo_path = PathBuf::from(v);
        }
        if let Some(v) = get("MEDPREDICT_ALERT_DELAY_SECS") {
            let secs: f64 = v
                .parse()
                .map_err(|_| Error::Config(format!("MEDPREDICT_ALERT_DELAY_SECS must be a number of seconds, got '{}'", v)))?;
            config.alert_delay = Duration::try_from_secs_f64(secs)
                .map_err(|_| Error::Config(format!("MEDPREDICT_ALERT_DELAY_SECS out of range: {}", v)))?;
        }
        if let Some(v) = lookup("MEDPREDICT_FAILURE_INDICATOR") {
            // Not trimmed: an indicator may legitimately carry spaces.
            if v.is_empty() {
                return Err(Error::Config("MEDPREDICT_FAILURE_INDICATOR must not be empty".into()));
            }
            config.failure_indicator = v;
        }
        if let Some(v) = get("MEDPREDICT_STRICT_MANUAL") {
            config.strict_manual = parse_bool(&v)
                .ok_or_else(|| Error::Config(format!("MEDPREDICT_STRICT_MANUAL must be true or false, got '{}'", v)))?;
        }
        if let Some(v) = get("MEDPREDICT_MAX_UPLOAD_MB") {
            let mb: usize = v
                .parse()
                .map_err(|_| Error::Config(format!("MEDPREDICT_MAX_UPLOAD_MB must be a whole number, got '{}'", v)))?;
            config.max_upload_bytes = mb.saturating_mul(1024 * 1024);
        }
        if let Some(v) = get("MEDPREDICT_PREVIEW_ROWS") {
            config.preview_rows = v
                .parse()
                .map_err(|_| Error::Config(format!("MEDPREDICT_PREVIEW_ROWS must be a whole number, got '{}'", v)))?;
        }

        debug!(?config, "Configuration resolved");
        Ok(config)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
