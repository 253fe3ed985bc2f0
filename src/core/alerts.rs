//! Threshold alerts.
//!
//! [`ThresholdNotifier`] feeds each observed snapshot through per-provider
//! session and weekly [`ThresholdGate`]s and posts at most one alert per
//! observation to a [`NotificationSink`].

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::models::{UsageMetric, UsageSnapshot};
use super::provider::Provider;
use super::thresholds::{CRITICAL_90, ThresholdGate, WARNING_60, WARNING_80};
use crate::storage::NotificationSettings;

/// A single user-facing alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThresholdAlert {
    pub provider: Provider,
    pub metric: UsageMetric,
    pub threshold: i32,
    pub title: String,
    pub body: String,
}

impl ThresholdAlert {
    #[must_use]
    pub fn new(provider: Provider, metric: UsageMetric, threshold: i32) -> Self {
        Self {
            provider,
            metric,
            threshold,
            title: provider.notification_title().to_string(),
            body: alert_body(metric.label(), threshold),
        }
    }
}

impl fmt::Display for ThresholdAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.body)
    }
}

fn alert_body(scope: &str, threshold: i32) -> String {
    match threshold {
        WARNING_60 => format!("{scope} usage at 60%"),
        WARNING_80 => format!("{scope} usage at 80%. Consider pacing."),
        CRITICAL_90 => format!("{scope} limit approaching. 10% remaining."),
        other => format!("{scope} usage at {other}%"),
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Receives alerts for display. Delivery is fire-and-forget.
pub trait NotificationSink: Send + Sync {
    fn post(&self, alert: &ThresholdAlert);
}

impl<F> NotificationSink for F
where
    F: Fn(&ThresholdAlert) + Send + Sync,
{
    fn post(&self, alert: &ThresholdAlert) {
        self(alert);
    }
}

/// Sink that emits alerts as `tracing` warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn post(&self, alert: &ThresholdAlert) {
        tracing::warn!(
            provider = %alert.provider,
            metric = alert.metric.label(),
            threshold = alert.threshold,
            title = %alert.title,
            "{}",
            alert.body
        );
    }
}

// =============================================================================
// Notifier
// =============================================================================

#[derive(Debug, Default)]
struct ProviderGates {
    session: ThresholdGate,
    weekly: ThresholdGate,
}

/// Turns snapshot observations into threshold alerts.
///
/// Owns its gates; not meant to be shared across tasks.
pub struct ThresholdNotifier<S: NotificationSink> {
    gates: HashMap<Provider, ProviderGates>,
    settings: NotificationSettings,
    sink: S,
}

impl<S: NotificationSink> fmt::Debug for ThresholdNotifier<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThresholdNotifier")
            .field("gates", &self.gates)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<S: NotificationSink> ThresholdNotifier<S> {
    #[must_use]
    pub fn new(sink: S, settings: NotificationSettings) -> Self {
        Self {
            gates: HashMap::new(),
            settings,
            sink,
        }
    }

    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Observe a snapshot for `provider`, posting an alert if a threshold
    /// was newly crossed.
    ///
    /// Both gates always advance. When both fire, the higher threshold wins;
    /// on a tie the session alert is posted.
    pub fn observe(&mut self, provider: Provider, snapshot: &UsageSnapshot) -> Option<ThresholdAlert> {
        let gates = self.gates.entry(provider).or_default();

        let session = snapshot
            .used_percent(UsageMetric::Session)
            .and_then(|percent| {
                gates
                    .session
                    .next_threshold(floor_percent(percent), snapshot.session_reset_at)
            });
        let weekly = snapshot
            .used_percent(UsageMetric::Weekly)
            .and_then(|percent| {
                gates
                    .weekly
                    .next_threshold(floor_percent(percent), snapshot.weekly_reset_at)
            });

        let (metric, threshold) = match (session, weekly) {
            (None, None) => return None,
            (Some(s), Some(w)) if w > s => (UsageMetric::Weekly, w),
            (Some(s), _) => (UsageMetric::Session, s),
            (None, Some(w)) => (UsageMetric::Weekly, w),
        };

        if !self.settings.is_enabled(threshold) {
            tracing::debug!(provider = %provider, threshold, "Threshold alert disabled");
            return None;
        }

        let alert = ThresholdAlert::new(provider, metric, threshold);
        tracing::info!(
            provider = %provider,
            metric = metric.label(),
            threshold,
            "Usage threshold crossed"
        );
        self.sink.post(&alert);
        Some(alert)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn floor_percent(percent: f64) -> i32 {
    percent.floor().clamp(0.0, 100.0) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{RecordingSink, make_test_snapshot};
    use chrono::{TimeDelta, Utc};

    fn notifier() -> ThresholdNotifier<RecordingSink> {
        ThresholdNotifier::new(RecordingSink::default(), NotificationSettings::default())
    }

    #[test]
    fn body_text_per_threshold() {
        assert_eq!(alert_body("Session", 60), "Session usage at 60%");
        assert_eq!(alert_body("Weekly", 80), "Weekly usage at 80%. Consider pacing.");
        assert_eq!(
            alert_body("Session", 90),
            "Session limit approaching. 10% remaining."
        );
        assert_eq!(alert_body("Weekly", 70), "Weekly usage at 70%");
    }

    #[test]
    fn floors_before_gating() {
        let mut n = notifier();
        assert!(n.observe(Provider::Claude, &make_test_snapshot(59.9, 0.0)).is_none());
        let alert = n.observe(Provider::Claude, &make_test_snapshot(60.2, 0.0)).unwrap();
        assert_eq!(alert.threshold, 60);
        assert_eq!(alert.title, "Claude Code");
        assert_eq!(alert.body, "Session usage at 60%");
    }

    #[test]
    fn out_of_range_percents_are_clamped() {
        let mut n = notifier();
        let alert = n.observe(Provider::Claude, &make_test_snapshot(250.0, 0.0)).unwrap();
        assert_eq!(alert.threshold, 60);

        // Treated as 0%: a full rollback, so thresholds re-arm.
        assert!(n.observe(Provider::Claude, &make_test_snapshot(-400.0, 0.0)).is_none());
        let alert = n.observe(Provider::Claude, &make_test_snapshot(61.0, 0.0)).unwrap();
        assert_eq!(alert.threshold, 60);
    }

    #[test]
    fn weekly_wins_only_when_strictly_higher() {
        let mut n = notifier();
        let alert = n.observe(Provider::Codex, &make_test_snapshot(61.0, 61.0)).unwrap();
        assert_eq!(alert.metric, UsageMetric::Session);
        assert_eq!(alert.title, "Codex");

        let alert = n.observe(Provider::Codex, &make_test_snapshot(62.0, 82.0)).unwrap();
        assert_eq!((alert.metric, alert.threshold), (UsageMetric::Weekly, 80));

        let alert = n.observe(Provider::Codex, &make_test_snapshot(81.0, 91.0)).unwrap();
        assert_eq!((alert.metric, alert.threshold), (UsageMetric::Weekly, 90));
        assert_eq!(alert.body, "Weekly limit approaching. 10% remaining.");
    }

    #[test]
    fn gates_are_per_provider() {
        let mut n = notifier();
        assert!(n.observe(Provider::Claude, &make_test_snapshot(61.0, 0.0)).is_some());
        assert!(n.observe(Provider::Claude, &make_test_snapshot(62.0, 0.0)).is_none());
        assert!(n.observe(Provider::Codex, &make_test_snapshot(61.0, 0.0)).is_some());
        assert_eq!(n.sink().alerts().len(), 2);
    }

    #[test]
    fn disabled_threshold_is_swallowed_but_consumed() {
        let mut n = ThresholdNotifier::new(
            RecordingSink::default(),
            NotificationSettings {
                notify_at_60: false,
                ..NotificationSettings::default()
            },
        );
        assert!(n.observe(Provider::Claude, &make_test_snapshot(65.0, 0.0)).is_none());
        assert!(n.observe(Provider::Claude, &make_test_snapshot(70.0, 0.0)).is_none());
        let alert = n.observe(Provider::Claude, &make_test_snapshot(81.0, 0.0)).unwrap();
        assert_eq!(alert.threshold, 80);
        assert_eq!(n.sink().alerts().len(), 1);
    }

    #[test]
    fn new_reset_window_re_alerts() {
        let mut n = notifier();
        let mut snapshot = make_test_snapshot(91.0, 0.0);
        assert_eq!(n.observe(Provider::Claude, &snapshot).unwrap().threshold, 60);

        snapshot.session_reset_at = Some(Utc::now() + TimeDelta::hours(30));
        assert_eq!(n.observe(Provider::Claude, &snapshot).unwrap().threshold, 60);
    }

    #[test]
    fn missing_percent_does_not_alert() {
        let mut n = notifier();
        let mut snapshot = make_test_snapshot(95.0, 95.0);
        snapshot.session_used_percent = None;
        snapshot.weekly_used_percent = None;
        assert!(n.observe(Provider::Claude, &snapshot).is_none());
    }

    #[test]
    fn closure_sink_receives_alerts() {
        let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
        let captured = std::sync::Arc::clone(&seen);
        let mut n = ThresholdNotifier::new(
            move |alert: &ThresholdAlert| captured.lock().push(alert.to_string()),
            NotificationSettings::default(),
        );
        n.observe(Provider::Codex, &make_test_snapshot(0.0, 92.0));
        assert_eq!(*seen.lock(), vec!["Codex: Weekly usage at 60%".to_string()]);
    }

    #[test]
    #[tracing_test::traced_test]
    fn tracing_sink_logs_alert() {
        TracingSink.post(&ThresholdAlert::new(Provider::Claude, UsageMetric::Session, 90));
        assert!(logs_contain("Session limit approaching"));
    }
}
