//! Test utilities for modelmeter.
//!
//! Provides test data factories, a scriptable connector, and a recording
//! notification sink for use across all test modules.
//!
//! # Usage
//!
//! ```rust,ignore
//! use modelmeter::test_utils::*;
//!
//! let snapshot = make_test_snapshot(42.0, 17.0);
//! let mock = std::sync::Arc::new(MockConnector::new());
//! mock.fail_with(Provider::Codex, "No usage file found.");
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use crate::core::alerts::{NotificationSink, ThresholdAlert};
use crate::core::connector::{AuthMode, UsageProviderConnector, ValidationResult};
use crate::core::models::UsageSnapshot;
use crate::core::provider::Provider;
use crate::error::{MeterError, Result};

// =============================================================================
// Test Data Factories
// =============================================================================

/// Session reset used by [`make_test_snapshot`]. Fixed so gates see a
/// stable window across calls.
#[must_use]
pub fn test_session_reset() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Weekly reset used by [`make_test_snapshot`].
#[must_use]
pub fn test_weekly_reset() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 7, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Create a percent-only `UsageSnapshot`, as the command source produces.
///
/// Reset times are fixed; `updated_at` and `source_mtime` are now.
///
/// # Examples
///
/// ```rust,ignore
/// use modelmeter::test_utils::make_test_snapshot;
///
/// let snapshot = make_test_snapshot(42.0, 17.0);
/// assert_eq!(snapshot.session_used_percent, Some(42.0));
/// ```
#[must_use]
pub fn make_test_snapshot(session_percent: f64, weekly_percent: f64) -> UsageSnapshot {
    make_test_snapshot_at(session_percent, weekly_percent, Utc::now())
}

/// [`make_test_snapshot`] with an explicit source modification time.
#[must_use]
pub fn make_test_snapshot_at(
    session_percent: f64,
    weekly_percent: f64,
    source_mtime: DateTime<Utc>,
) -> UsageSnapshot {
    UsageSnapshot {
        session_used: session_percent,
        weekly_used: weekly_percent,
        session_limit: Some(100.0),
        weekly_limit: Some(100.0),
        session_used_percent: Some(session_percent),
        weekly_used_percent: Some(weekly_percent),
        session_reset_at: Some(test_session_reset()),
        weekly_reset_at: Some(test_weekly_reset()),
        updated_at: source_mtime,
        source_path: PathBuf::from("/dev/stdout"),
        source_mtime,
    }
}

/// Stats cache JSON with one `dailyActivity` entry per `(date, messages)`.
#[must_use]
pub fn make_test_stats_cache(days: &[(&str, u64)]) -> String {
    let activity: Vec<_> = days
        .iter()
        .map(|(date, count)| serde_json::json!({ "date": date, "messageCount": count }))
        .collect();
    serde_json::json!({ "dailyActivity": activity }).to_string()
}

// =============================================================================
// Mock Connector
// =============================================================================

/// Scriptable connector that counts calls per provider.
///
/// Succeeds with `make_test_snapshot(42.0, 17.0)` unless told otherwise.
#[derive(Debug, Default)]
pub struct MockConnector {
    delay: Duration,
    calls: Mutex<HashMap<Provider, usize>>,
    failures: Mutex<HashMap<Provider, String>>,
    invalid: Mutex<HashMap<Provider, String>>,
    snapshots: Mutex<HashMap<Provider, UsageSnapshot>>,
}

impl MockConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every fetch take `delay` (tokio time, so paused clocks apply).
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail fetches for `provider` with `message`.
    pub fn fail_with(&self, provider: Provider, message: &str) {
        self.failures.lock().insert(provider, message.to_string());
    }

    /// Undo [`Self::fail_with`].
    pub fn succeed(&self, provider: Provider) {
        self.failures.lock().remove(&provider);
    }

    /// Return `snapshot` (with a fresh `source_mtime`) for `provider`.
    pub fn set_snapshot(&self, provider: Provider, snapshot: UsageSnapshot) {
        self.snapshots.lock().insert(provider, snapshot);
    }

    /// Report an invalid environment for `provider`.
    pub fn invalidate(&self, provider: Provider, message: &str) {
        self.invalid.lock().insert(provider, message.to_string());
    }

    /// Fetches started for `provider`.
    #[must_use]
    pub fn calls(&self, provider: Provider) -> usize {
        self.calls.lock().get(&provider).copied().unwrap_or(0)
    }

    /// Fetches started across all providers.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

#[async_trait]
impl UsageProviderConnector for MockConnector {
    fn auth_mode(&self) -> AuthMode {
        AuthMode::LocalCli
    }

    async fn fetch_usage(&self, provider: Provider) -> Result<UsageSnapshot> {
        *self.calls.lock().entry(provider).or_insert(0) += 1;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if let Some(message) = self.failures.lock().get(&provider) {
            return Err(MeterError::ProcessFailure(message.clone()));
        }

        let mut snapshot = self
            .snapshots
            .lock()
            .get(&provider)
            .cloned()
            .unwrap_or_else(|| make_test_snapshot(42.0, 17.0));
        snapshot.source_mtime = Utc::now();
        Ok(snapshot)
    }

    fn validate_environment(&self, provider: Provider) -> ValidationResult {
        self.invalid
            .lock()
            .get(&provider)
            .map_or_else(ValidationResult::valid, |m| ValidationResult::invalid(m.clone()))
    }
}

// =============================================================================
// Recording Sink
// =============================================================================

/// Notification sink that keeps every alert it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    alerts: Mutex<Vec<ThresholdAlert>>,
}

impl RecordingSink {
    /// Alerts received so far, oldest first.
    #[must_use]
    pub fn alerts(&self) -> Vec<ThresholdAlert> {
        self.alerts.lock().clone()
    }

    /// `"title: body"` for each alert.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.alerts.lock().iter().map(ToString::to_string).collect()
    }
}

impl NotificationSink for RecordingSink {
    fn post(&self, alert: &ThresholdAlert) {
        self.alerts.lock().push(alert.clone());
    }
}

// =============================================================================
// Test Helpers
// =============================================================================

/// Check if a string contains ANSI escape sequences.
#[must_use]
pub fn has_ansi_codes(text: &str) -> bool {
    text.contains('\x1b')
}
