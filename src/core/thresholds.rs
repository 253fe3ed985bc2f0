//! Usage thresholds and the one-shot alert gate.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Alert thresholds in ascending order.
pub const THRESHOLDS: [i32; 3] = [WARNING_60, WARNING_80, CRITICAL_90];

pub const WARNING_60: i32 = 60;
pub const WARNING_80: i32 = 80;
pub const CRITICAL_90: i32 = 90;

/// A drop of at least this many points is treated as an unsignalled reset.
pub const ROLLBACK_POINTS: i32 = 50;

// =============================================================================
// Usage Status
// =============================================================================

/// Coarse status band for a usage percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageStatus {
    Normal,
    Warning,
    Critical,
}

impl UsageStatus {
    /// Classify a percentage.
    #[must_use]
    pub fn from_percent(percent: f64) -> Self {
        if percent >= f64::from(CRITICAL_90) {
            Self::Critical
        } else if percent >= f64::from(WARNING_60) {
            Self::Warning
        } else {
            Self::Normal
        }
    }
}

// =============================================================================
// Threshold Gate
// =============================================================================

/// Decides when a usage percentage crossing deserves a new alert.
///
/// Each threshold fires at most once per reset window. The window is keyed by
/// the reset timestamp (whole seconds), and a fall of [`ROLLBACK_POINTS`] or
/// more is treated as a new window even when the timestamp did not change.
///
/// One gate tracks one metric of one provider. It is plain data and is never
/// shared across threads.
#[derive(Debug, Clone, Default)]
pub struct ThresholdGate {
    fired: BTreeSet<i32>,
    last_reset_signature: Option<i64>,
    last_percent: Option<i32>,
}

impl ThresholdGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the latest percentage and return the threshold to alert on, if any.
    pub fn next_threshold(
        &mut self,
        used_percent: i32,
        reset_at: Option<DateTime<Utc>>,
    ) -> Option<i32> {
        let signature = reset_at.map(|at| at.timestamp());
        if signature != self.last_reset_signature {
            self.fired.clear();
            self.last_reset_signature = signature;
            self.last_percent = None;
        }

        if self
            .last_percent
            .is_some_and(|last| last.saturating_sub(used_percent) >= ROLLBACK_POINTS)
        {
            self.fired.clear();
        }
        self.last_percent = Some(used_percent);

        let threshold = THRESHOLDS
            .into_iter()
            .find(|t| used_percent >= *t && !self.fired.contains(t))?;
        self.fired.insert(threshold);
        Some(threshold)
    }

    /// Thresholds already alerted in the current window.
    #[must_use]
    pub fn fired(&self) -> Vec<i32> {
        self.fired.iter().copied().collect()
    }
}
