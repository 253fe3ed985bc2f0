//! App settings: polling cadence, staleness and which alerts are enabled.
//!
//! Stored as TOML in the platform config directory:
//!
//! ```toml
//! poll_interval = "1m"
//! stale_after_secs = 300
//! selected_provider = "codex"
//!
//! [notifications]
//! notify_at_60 = true
//! notify_at_80 = true
//! notify_at_90 = false
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::provider::Provider;
use crate::core::thresholds::{CRITICAL_90, WARNING_60, WARNING_80};
use crate::error::{MeterError, Result};

/// Poll interval choices offered to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PollInterval {
    #[default]
    #[serde(rename = "30s")]
    ThirtySeconds,
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
}

impl PollInterval {
    /// Interval length.
    #[must_use]
    pub const fn duration(self) -> Duration {
        match self {
            Self::ThirtySeconds => Duration::from_secs(30),
            Self::OneMinute => Duration::from_secs(60),
            Self::FiveMinutes => Duration::from_secs(300),
        }
    }

    /// Short label ("30s", "1m", "5m").
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ThirtySeconds => "30s",
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
        }
    }
}

/// Per-threshold notification switches. All on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub notify_at_60: bool,
    pub notify_at_80: bool,
    pub notify_at_90: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            notify_at_60: true,
            notify_at_80: true,
            notify_at_90: true,
        }
    }
}

impl NotificationSettings {
    /// Whether alerts for `threshold` should be delivered. Unknown thresholds are off.
    #[must_use]
    pub const fn is_enabled(&self, threshold: i32) -> bool {
        match threshold {
            WARNING_60 => self.notify_at_60,
            WARNING_80 => self.notify_at_80,
            CRITICAL_90 => self.notify_at_90,
            _ => false,
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub poll_interval: PollInterval,
    /// Seconds after the source's last modification before data counts as stale.
    pub stale_after_secs: u64,
    pub selected_provider: Provider,
    pub notifications: NotificationSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval: PollInterval::default(),
            stale_after_secs: 300,
            selected_provider: Provider::Claude,
            notifications: NotificationSettings::default(),
        }
    }
}

impl Settings {
    /// Staleness threshold as a duration.
    #[must_use]
    pub const fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    /// Load settings from `path`. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is not valid settings TOML.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Settings file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading settings file");
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| MeterError::Config(format!("Invalid settings file: {e}")))
    }

    /// Save settings to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| MeterError::Config(format!("Failed to serialize settings: {e}")))?;
        fs::write(path, content)?;
        tracing::debug!(?path, "Settings file saved");
        Ok(())
    }
}
