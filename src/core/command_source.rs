//! Command usage strategy.
//!
//! Runs the configured per-provider command and reads usage JSON from its
//! standard output. Two payload shapes are accepted:
//!
//! ```json
//! { "sessionPercent": 42, "weeklyPercent": 17, "sessionResetAt": "2026-03-12T00:00:00Z" }
//! ```
//!
//! ```json
//! { "lines": [
//!     { "type": "progress", "label": "Session", "value": 42, "unit": "percent" },
//!     { "type": "progress", "label": "Weekly", "value": 17 }
//! ] }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::cli_runner::{CLI_TIMEOUT, Launch, run_command};
use super::models::{UsageSnapshot, clamp_percent};
use super::provider::Provider;
use crate::error::{MeterError, Result};
use crate::storage::MeterConfig;
use crate::util::time::{next_midnight, next_week_start};

/// Source path recorded on command snapshots.
pub const COMMAND_SOURCE_MARKER: &str = "/dev/stdout";

const INVALID_OUTPUT: &str = "Command output was not valid usage JSON.";

/// Fetches usage by running a command.
#[derive(Debug, Clone, Copy)]
pub struct CommandUsageSource {
    timeout: Duration,
}

impl Default for CommandUsageSource {
    fn default() -> Self {
        Self {
            timeout: CLI_TIMEOUT,
        }
    }
}

impl CommandUsageSource {
    /// Source with a custom command timeout.
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run the provider's command and parse its output.
    ///
    /// # Errors
    ///
    /// - [`MeterError::MissingConfiguration`] if no command is configured
    /// - [`MeterError::ProcessFailure`] / [`MeterError::Timeout`] if it fails
    /// - [`MeterError::InvalidPayload`] if the output is not usage JSON
    pub async fn fetch(&self, config: &MeterConfig, provider: Provider) -> Result<UsageSnapshot> {
        let command = config.command_for(provider);
        if command.trim().is_empty() {
            return Err(MeterError::MissingConfiguration(format!(
                "No command configured for {}.",
                provider.display_name()
            )));
        }

        let launch = Launch::resolve(command, config.args());
        tracing::debug!(
            provider = %provider,
            program = %launch.program,
            "Running usage command"
        );

        let output = run_command(&launch.program, &launch.args, self.timeout).await?;
        let stdout = output.into_stdout()?;
        parse_command_output(&stdout, Utc::now())
    }
}

/// Parse command stdout into a snapshot, as of `now`.
///
/// # Errors
///
/// Returns [`MeterError::InvalidPayload`] if the JSON is malformed or carries
/// neither percent fields nor usable progress lines.
pub fn parse_command_output(stdout: &str, now: DateTime<Utc>) -> Result<UsageSnapshot> {
    let payload: CommandUsagePayload = serde_json::from_str(stdout).map_err(|e| {
        tracing::debug!(error = %e, "Usage command output did not parse");
        MeterError::InvalidPayload(INVALID_OUTPUT.to_string())
    })?;
    payload.into_snapshot(now)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommandUsagePayload {
    session_percent: Option<f64>,
    weekly_percent: Option<f64>,
    session_reset_at: Option<DateTime<Utc>>,
    weekly_reset_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    lines: Option<Vec<ProgressLine>>,
}

#[derive(Debug, Deserialize)]
struct ProgressLine {
    #[serde(rename = "type")]
    kind: String,
    label: Option<String>,
    value: Option<f64>,
    unit: Option<String>,
}

impl ProgressLine {
    fn is_percent_progress(&self) -> bool {
        self.kind == "progress" && self.unit.as_deref().is_none_or(|unit| unit == "percent")
    }

    fn has_label(&self, wanted: &str) -> bool {
        self.label
            .as_deref()
            .is_some_and(|label| label.eq_ignore_ascii_case(wanted))
    }
}

impl CommandUsagePayload {
    fn percents(&self) -> (Option<f64>, Option<f64>) {
        if let (Some(session), Some(weekly)) = (self.session_percent, self.weekly_percent) {
            return (Some(session), Some(weekly));
        }

        let progress: Vec<&ProgressLine> = self
            .lines
            .iter()
            .flatten()
            .filter(|line| line.is_percent_progress())
            .collect();

        let labelled = |label: &str| {
            progress
                .iter()
                .find(|line| line.has_label(label))
                .and_then(|line| line.value)
        };

        let session = labelled("session").or_else(|| progress.first().and_then(|l| l.value));
        let weekly = labelled("weekly").or_else(|| progress.get(1).and_then(|l| l.value));
        (session, weekly)
    }

    fn into_snapshot(self, now: DateTime<Utc>) -> Result<UsageSnapshot> {
        let (Some(session), Some(weekly)) = self.percents() else {
            return Err(MeterError::InvalidPayload(INVALID_OUTPUT.to_string()));
        };

        Ok(UsageSnapshot {
            session_used: session,
            weekly_used: weekly,
            session_limit: Some(100.0),
            weekly_limit: Some(100.0),
            session_used_percent: Some(clamp_percent(session)),
            weekly_used_percent: Some(clamp_percent(weekly)),
            session_reset_at: self.session_reset_at.or_else(|| next_midnight(now)),
            weekly_reset_at: self.weekly_reset_at.or_else(|| next_week_start(now)),
            updated_at: self.updated_at.unwrap_or(now),
            source_path: PathBuf::from(COMMAND_SOURCE_MARKER),
            source_mtime: now,
        })
    }
}
