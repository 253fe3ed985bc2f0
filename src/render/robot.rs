//! Robot-mode output (JSON).
//!
//! Every command wraps its payload in the same envelope so scripts can rely
//! on `schemaVersion`, `command` and `errors` being present.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UsageReport;
use crate::core::alerts::ThresholdAlert;
use crate::error::Result;

/// Schema identifier carried by every envelope.
pub const SCHEMA_VERSION: &str = "modelmeter.v1";

/// Top-level JSON envelope for robot mode output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotOutput<T> {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub command: String,
    pub data: T,
    #[serde(default)]
    pub errors: Vec<String>,
    pub meta: RobotMeta,
}

/// Metadata for robot output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotMeta {
    pub format: String,
    pub runtime: String,
}

impl<T> RobotOutput<T> {
    /// Create a new robot output envelope.
    pub fn new(command: impl Into<String>, data: T) -> Self {
        Self::with_errors(command, data, Vec::new())
    }

    /// Create with errors.
    pub fn with_errors(command: impl Into<String>, data: T, errors: Vec<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            command: command.into(),
            data,
            errors,
            meta: RobotMeta {
                format: "json".to_string(),
                runtime: "cli".to_string(),
            },
        }
    }
}

/// Serialize any value, compact or pretty.
pub fn render_json<T: Serialize>(output: &T, pretty: bool) -> Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(output)?)
    } else {
        Ok(serde_json::to_string(output)?)
    }
}

/// Render usage reports; provider errors are also collected into `errors`.
pub fn render_usage_json(reports: &[UsageReport], pretty: bool) -> Result<String> {
    let errors = reports
        .iter()
        .filter_map(|r| r.error.as_ref().map(|e| format!("{}: {e}", r.provider)))
        .collect();
    render_json(&RobotOutput::with_errors("usage", reports, errors), pretty)
}

/// Render one threshold alert as a single JSON line for `watch`.
pub fn render_alert_json(alert: &ThresholdAlert) -> Result<String> {
    render_json(&RobotOutput::new("alert", alert), false)
}
