//! Doctor command diagnostic framework.
//!
//! Defines the data structures for setup checks and reporting.

pub mod checks;

use crate::core::provider::Provider;
use crate::storage::SourceMode;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Result of a single diagnostic check.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckStatus {
    /// Check passed with optional details.
    Pass { details: Option<String> },
    /// Usable, but something looks off.
    Warning {
        details: String,
        suggestion: Option<String>,
    },
    /// Check failed with reason and optional fix suggestion.
    Fail {
        reason: String,
        suggestion: Option<String>,
    },
    /// Check was not run.
    Skipped { reason: String },
}

impl CheckStatus {
    /// Whether this status indicates the check is ready (functional).
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(
            self,
            Self::Pass { .. } | Self::Warning { .. } | Self::Skipped { .. }
        )
    }

    /// Whether this status requires attention (warning or worse).
    #[must_use]
    pub const fn needs_attention(&self) -> bool {
        matches!(self, Self::Warning { .. } | Self::Fail { .. })
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass { details: Some(details) } => write!(f, "pass ({details})"),
            Self::Pass { details: None } => write!(f, "pass"),
            Self::Warning {
                details,
                suggestion: Some(suggestion),
            } => write!(f, "warning: {details} (suggestion: {suggestion})"),
            Self::Warning { details, .. } => write!(f, "warning: {details}"),
            Self::Fail {
                reason,
                suggestion: Some(suggestion),
            } => write!(f, "fail: {reason} (suggestion: {suggestion})"),
            Self::Fail { reason, .. } => write!(f, "fail: {reason}"),
            Self::Skipped { reason } => write!(f, "skipped: {reason}"),
        }
    }
}

/// A single diagnostic check result.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticCheck {
    pub name: String,
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
}

impl DiagnosticCheck {
    #[must_use]
    pub fn new(name: impl Into<String>, status: CheckStatus) -> Self {
        Self {
            name: name.into(),
            status,
            duration: None,
        }
    }

    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Health of one provider's usage source.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHealth {
    pub provider: Provider,
    pub source: SourceMode,
    /// Static environment check (command configured / file present).
    pub environment: DiagnosticCheck,
    /// Live fetch, only when probing was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch: Option<DiagnosticCheck>,
}

impl ProviderHealth {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.environment.status.is_ready()
            && self.fetch.as_ref().is_none_or(|c| c.status.is_ready())
    }
}

/// Complete doctor report.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DoctorReport {
    pub version: String,
    pub config_status: DiagnosticCheck,
    pub settings_status: DiagnosticCheck,
    pub providers: Vec<ProviderHealth>,
    pub total_duration: Duration,
}

impl DoctorReport {
    /// `(ready, needs_attention)` counts over config, settings and providers.
    #[must_use]
    pub fn summary(&self) -> (usize, usize) {
        let mut ready = 0;
        let mut needs_attention = 0;

        for check in [&self.config_status, &self.settings_status] {
            if !check.status.is_ready() {
                needs_attention += 1;
            }
        }

        for provider in &self.providers {
            if provider.is_ready() {
                ready += 1;
            } else {
                needs_attention += 1;
            }
        }

        (ready, needs_attention)
    }
}
