//! Output rendering for human and robot modes.

pub mod doctor;
pub mod error;
pub mod human;
pub mod robot;

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::core::command_source::COMMAND_SOURCE_MARKER;
use crate::core::doctor::DoctorReport;
use crate::core::models::{UsageMetric, UsageSnapshot};
use crate::core::provider::Provider;
use crate::core::store::UsageStore;
use crate::core::thresholds::UsageStatus;
use crate::error::Result;

/// Error fragments that mean the provider CLI needs a fresh login.
const AUTH_ERROR_MARKERS: &[&str] = &[
    "token expired",
    "re-authenticate",
    "unauthorized",
    "credentials not found",
    "log in",
];

/// What the store knows about one provider, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub provider: Provider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<UsageSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refresh: Option<DateTime<Utc>>,
    pub is_stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_status: Option<UsageStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_status: Option<UsageStatus>,
}

impl UsageReport {
    /// Capture the store's state for `provider` as of `now`.
    #[must_use]
    pub fn from_store(store: &UsageStore, provider: Provider, now: DateTime<Utc>) -> Self {
        Self::new(
            provider,
            store.snapshot(provider),
            store.error(provider),
            store.last_refresh(provider),
            store.is_provider_stale_at(provider, now),
        )
    }

    #[must_use]
    pub fn new(
        provider: Provider,
        snapshot: Option<UsageSnapshot>,
        error: Option<String>,
        last_refresh: Option<DateTime<Utc>>,
        is_stale: bool,
    ) -> Self {
        let hint = error.as_deref().and_then(|e| auth_hint(provider, e));
        let status = |metric| {
            snapshot
                .as_ref()
                .and_then(|s| s.used_percent(metric))
                .map(UsageStatus::from_percent)
        };
        let session_status = status(UsageMetric::Session);
        let weekly_status = status(UsageMetric::Weekly);

        Self {
            provider,
            snapshot,
            error,
            hint,
            last_refresh,
            is_stale,
            session_status,
            weekly_status,
        }
    }
}

/// Suggest re-authenticating when an error looks like an expired login.
#[must_use]
pub fn auth_hint(provider: Provider, error: &str) -> Option<String> {
    let lower = error.to_lowercase();
    AUTH_ERROR_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
        .then(|| format!("Run `{}` in Terminal to re-authenticate.", provider.cli_name()))
}

/// Whether a snapshot came from a usage file rather than a command.
#[must_use]
pub fn is_file_backed(snapshot: &UsageSnapshot) -> bool {
    snapshot.source_path != Path::new(COMMAND_SOURCE_MARKER)
}

/// Render usage reports.
pub fn render_usage(
    reports: &[UsageReport],
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_usage(reports, no_color)),
        OutputFormat::Json => robot::render_usage_json(reports, pretty),
    }
}

/// Render doctor report.
pub fn render_doctor(
    report: &DoctorReport,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(doctor::render_human(report, no_color)),
        OutputFormat::Json => doctor::render_json(report, pretty),
    }
}
