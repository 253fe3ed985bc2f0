//! Core usage data models.
//!
//! These types are produced by the usage sources and held by the store.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Usage Snapshot
// =============================================================================

/// Quota consumption captured by one successful fetch.
///
/// # Fields
/// - `*_used`: raw consumption in the source's own units.
/// - `*_limit`: the quota those units are measured against. `None` means the
///   source only reports percentages.
/// - `*_used_percent`: consumption in `[0, 100]`, clamped by the producer.
/// - `*_reset_at`: next boundary at which the window's usage zeroes.
/// - `source_path` / `source_mtime`: provenance, used for staleness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    pub session_used: f64,
    pub weekly_used: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_limit: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_limit: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_used_percent: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_used_percent: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_reset_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_reset_at: Option<DateTime<Utc>>,

    pub updated_at: DateTime<Utc>,
    pub source_path: PathBuf,
    pub source_mtime: DateTime<Utc>,
}

impl UsageSnapshot {
    /// Session limit, if it is a usable (positive) quota.
    #[must_use]
    pub fn session_limit_value(&self) -> Option<f64> {
        self.session_limit.filter(|limit| *limit > 0.0)
    }

    /// Weekly limit, if it is a usable (positive) quota.
    #[must_use]
    pub fn weekly_limit_value(&self) -> Option<f64> {
        self.weekly_limit.filter(|limit| *limit > 0.0)
    }

    /// Used percent for one metric.
    #[must_use]
    pub const fn used_percent(&self, metric: UsageMetric) -> Option<f64> {
        match metric {
            UsageMetric::Session => self.session_used_percent,
            UsageMetric::Weekly => self.weekly_used_percent,
        }
    }

    /// Reset boundary for one metric.
    #[must_use]
    pub const fn reset_at(&self, metric: UsageMetric) -> Option<DateTime<Utc>> {
        match metric {
            UsageMetric::Session => self.session_reset_at,
            UsageMetric::Weekly => self.weekly_reset_at,
        }
    }
}

// =============================================================================
// Usage Metric
// =============================================================================

/// The two quota windows every provider reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageMetric {
    Session,
    Weekly,
}

impl UsageMetric {
    /// Both metrics in display order.
    pub const ALL: &'static [Self] = &[Self::Session, Self::Weekly];

    /// Capitalized label ("Session" / "Weekly").
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Session => "Session",
            Self::Weekly => "Weekly",
        }
    }
}

// =============================================================================
// Percent Limits
// =============================================================================

/// Absolute quotas used to turn raw file-derived usage into percentages.
///
/// The default of 100 for both treats the raw value as a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsagePercentLimitConfig {
    pub session_limit_percent: f64,
    pub weekly_limit_percent: f64,
}

impl UsagePercentLimitConfig {
    /// Default limit for either metric.
    pub const DEFAULT_LIMIT: f64 = 100.0;

    /// Build limits from optional configured values, defaulting each to 100.
    #[must_use]
    pub fn from_optional(session: Option<f64>, weekly: Option<f64>) -> Self {
        Self {
            session_limit_percent: session.unwrap_or(Self::DEFAULT_LIMIT),
            weekly_limit_percent: weekly.unwrap_or(Self::DEFAULT_LIMIT),
        }
    }
}

impl Default for UsagePercentLimitConfig {
    fn default() -> Self {
        Self {
            session_limit_percent: Self::DEFAULT_LIMIT,
            weekly_limit_percent: Self::DEFAULT_LIMIT,
        }
    }
}

/// Clamp a percentage into `[0, 100]`. NaN becomes 0.
#[must_use]
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_default_to_one_hundred() {
        let limits = UsagePercentLimitConfig::from_optional(None, Some(2_000.0));
        assert!((limits.session_limit_percent - 100.0).abs() < f64::EPSILON);
        assert!((limits.weekly_limit_percent - 2_000.0).abs() < f64::EPSILON);
        assert_eq!(UsagePercentLimitConfig::default(), UsagePercentLimitConfig::from_optional(None, None));
    }

    #[test]
    fn clamp_percent_bounds() {
        assert!((clamp_percent(140.0) - 100.0).abs() < f64::EPSILON);
        assert!(clamp_percent(-3.0).abs() < f64::EPSILON);
        assert!(clamp_percent(f64::NAN).abs() < f64::EPSILON);
        assert!((clamp_percent(42.5) - 42.5).abs() < f64::EPSILON);
    }

    #[test]
    fn non_positive_limits_are_not_usable() {
        let snapshot = crate::test_utils::make_test_snapshot(10.0, 20.0);
        let snapshot = UsageSnapshot {
            session_limit: Some(0.0),
            weekly_limit: None,
            ..snapshot
        };
        assert_eq!(snapshot.session_limit_value(), None);
        assert_eq!(snapshot.weekly_limit_value(), None);
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let snapshot = crate::test_utils::make_test_snapshot(10.0, 20.0);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("sessionUsedPercent").is_some());
        assert!(json.get("sourceMtime").is_some());
    }
}
