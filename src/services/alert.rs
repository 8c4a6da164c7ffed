//! Failure alert: a warning plus a delayed alert sound when any prediction signals a failure.

use crate::config::AppConfig;
use crate::types::Label;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// True if any label's text contains `indicator` (case-sensitive).
pub fn is_failure(predictions: &[Label], indicator: &str) -> bool {
    predictions.iter().any(|p| p.to_string().contains(indicator))
}

#[derive(Debug, Clone)]
pub struct FailureAlert {
    pub message: String,
    pub delay: Duration,
    /// `data:` URI of the alert sound, absent when the sound file could not be read.
    pub sound: Option<String>,
}

impl FailureAlert {
    /// Block the current thread for the configured lead time.
    pub fn wait(&self) {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        _ => "audio/mpeg",
    }
}

/// Read the sound file into a base64 `data:` URI suitable for an `<audio>` source.
pub fn sound_data_uri(path: &Path) -> Result<String, String> {
    let bytes = fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            format!("Alert sound not found: {}", path.display())
        } else {
            format!("Could not read alert sound: {}", e)
        }
    })?;
    Ok(format!("data:{};base64,{}", mime_for(path), BASE64.encode(&bytes)))
}

/// Build the alert when the predictions call for one. Never affects the exported result.
pub fn check(predictions: &[Label], config: &AppConfig) -> Option<FailureAlert> {
    if !is_failure(predictions, &config.failure_indicator) {
        return None;
    }
    let count = predictions
        .iter()
        .filter(|p| p.to_string().contains(&config.failure_indicator))
        .count();
    let sound = match sound_data_uri(&config.alert_sound_path) {
        Ok(uri) => Some(uri),
        Err(e) => {
            warn!("{}; alerting without sound", e);
            None
        }
    };
    info!(rows = count, delay_secs = config.alert_delay.as_secs_f64(), "Failure predicted, alert scheduled");
    Some(FailureAlert {
        message: format!(
            "Failure detected on {} log row(s)! An alarm will sound in {} seconds.",
            count,
            config.alert_delay.as_secs_f64()
        ),
        delay: config.alert_delay,
        sound,
    })
}
