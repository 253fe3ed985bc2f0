//! Usage source configuration.
//!
//! Stored as JSON at `~/.modelmeter/config.json` (override with
//! `MODELMETER_CONFIG`). The file is read fresh on every fetch so edits take
//! effect on the next poll.
//!
//! ```json
//! {
//!   "source": "command",
//!   "claudeCommand": "~/bin/claude_usage.py",
//!   "codexCommand": "codex-usage --json",
//!   "providerArgs": ["--format", "json"],
//!   "usageFilePath": "/path/to/stats-cache.json",
//!   "sessionLimitPercent": 2000,
//!   "weeklyLimitPercent": 10000
//! }
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::core::models::UsagePercentLimitConfig;
use crate::core::provider::Provider;
use crate::error::{MeterError, Result};

// =============================================================================
// Source Mode
// =============================================================================

/// How usage data is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Run a per-provider command that prints usage JSON.
    #[default]
    Command,
    /// Derive usage from a local stats cache file.
    File,
}

impl SourceMode {
    /// Interpret the configured `source` string.
    ///
    /// Absent or `"command"` (any case) selects the command strategy; any
    /// other value selects the file strategy.
    #[must_use]
    pub fn from_config(source: Option<&str>) -> Self {
        match source.map(|s| s.trim().to_lowercase()) {
            None => Self::Command,
            Some(s) if s == "command" => Self::Command,
            Some(_) => Self::File,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::File => "file",
        }
    }
}

impl std::fmt::Display for SourceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Usage Config
// =============================================================================

/// Persisted usage source configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_limit_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_limit_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claude_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codex_command: Option<String>,
}

impl MeterConfig {
    /// Selected source strategy.
    #[must_use]
    pub fn source_mode(&self) -> SourceMode {
        SourceMode::from_config(self.source.as_deref())
    }

    /// Percent limits for the file strategy, defaulting each to 100.
    #[must_use]
    pub fn limits(&self) -> UsagePercentLimitConfig {
        UsagePercentLimitConfig::from_optional(self.session_limit_percent, self.weekly_limit_percent)
    }

    /// Command for `provider`: its own command first, else the shared one.
    ///
    /// Returns an empty string when nothing is configured.
    #[must_use]
    pub fn command_for(&self, provider: Provider) -> &str {
        let specific = match provider {
            Provider::Claude => self.claude_command.as_deref(),
            Provider::Codex => self.codex_command.as_deref(),
        };
        specific
            .or(self.provider_command.as_deref())
            .unwrap_or_default()
    }

    /// Extra arguments for the command, if any.
    #[must_use]
    pub fn args(&self) -> &[String] {
        self.provider_args.as_deref().unwrap_or_default()
    }
}

// =============================================================================
// Config Store
// =============================================================================

/// Reads and writes [`MeterConfig`] at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store at an explicit path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location.
    #[must_use]
    pub fn from_paths(paths: &AppPaths) -> Self {
        Self::new(paths.usage_config_file())
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config. A missing file is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<MeterConfig>> {
        if !self.path.exists() {
            tracing::trace!(path = %self.path.display(), "Usage config not found");
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        let config = serde_json::from_str(&content).map_err(|e| {
            MeterError::Config(format!("invalid usage config {}: {e}", self.path.display()))
        })?;
        Ok(Some(config))
    }

    /// Load the config, falling back to defaults when the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(&self) -> Result<MeterConfig> {
        Ok(self.load()?.unwrap_or_default())
    }

    /// Write the config as pretty, key-sorted JSON with owner-only permissions.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file written.
    pub fn save(&self, config: &MeterConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Round-trip through Value so keys come out sorted.
        let value = serde_json::to_value(config)?;
        let content = serde_json::to_string_pretty(&value)?;

        let tmp = self.path.with_extension("json.tmp");
        let mut file = create_private(&tmp)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), "Usage config saved");
        Ok(())
    }
}

/// Create `path` fresh, owner-only on Unix from the first byte.
///
/// A leftover file is removed first since the mode only applies on creation.
fn create_private(path: &Path) -> Result<fs::File> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
        _ => {}
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    Ok(options.open(path)?)
}
