//! Threshold alerts fed from store refreshes.

use std::sync::Arc;

use chrono::Duration;
use modelmeter::core::{Provider, ThresholdNotifier, UsageMetric, UsageStore};
use modelmeter::storage::NotificationSettings;
use modelmeter::test_utils::{MockConnector, RecordingSink, make_test_snapshot};

struct Harness {
    mock: Arc<MockConnector>,
    store: UsageStore,
    notifier: ThresholdNotifier<RecordingSink>,
}

impl Harness {
    fn new(settings: NotificationSettings) -> Self {
        let mock = Arc::new(MockConnector::new());
        let store = UsageStore::with_defaults(mock.clone());
        let notifier = ThresholdNotifier::new(RecordingSink::default(), settings);
        Self {
            mock,
            store,
            notifier,
        }
    }

    /// Serve `(session, weekly)` for Claude, refresh, and observe the result.
    async fn step(&mut self, session: f64, weekly: f64) -> Option<(UsageMetric, i32)> {
        self.step_with(make_test_snapshot(session, weekly)).await
    }

    async fn step_with(
        &mut self,
        snapshot: modelmeter::core::UsageSnapshot,
    ) -> Option<(UsageMetric, i32)> {
        self.mock.set_snapshot(Provider::Claude, snapshot);
        self.store.refresh(Provider::Claude).await;
        let snapshot = self.store.snapshot(Provider::Claude)?;
        self.notifier
            .observe(Provider::Claude, &snapshot)
            .map(|alert| (alert.metric, alert.threshold))
    }
}

#[tokio::test]
async fn climbing_usage_fires_each_threshold_once() {
    let mut h = Harness::new(NotificationSettings::default());

    assert_eq!(h.step(30.0, 10.0).await, None);
    assert_eq!(h.step(61.0, 10.0).await, Some((UsageMetric::Session, 60)));
    assert_eq!(h.step(70.0, 10.0).await, None);
    assert_eq!(h.step(85.0, 10.0).await, Some((UsageMetric::Session, 80)));
    assert_eq!(h.step(95.0, 10.0).await, Some((UsageMetric::Session, 90)));
    assert_eq!(h.step(99.0, 10.0).await, None);

    let messages = h.notifier.sink().messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0], "Claude Code: Session usage at 60%");
    assert_eq!(messages[1], "Claude Code: Session usage at 80%. Consider pacing.");
    assert_eq!(messages[2], "Claude Code: Session limit approaching. 10% remaining.");
}

#[tokio::test]
async fn fractional_percent_is_floored() {
    let mut h = Harness::new(NotificationSettings::default());
    assert_eq!(h.step(59.9, 0.0).await, None);
    assert_eq!(h.step(60.0, 0.0).await, Some((UsageMetric::Session, 60)));
}

#[tokio::test]
async fn new_reset_window_rearms_thresholds() {
    let mut h = Harness::new(NotificationSettings::default());
    assert_eq!(h.step(65.0, 0.0).await, Some((UsageMetric::Session, 60)));

    let mut next_window = make_test_snapshot(65.0, 0.0);
    next_window.session_reset_at = next_window.session_reset_at.map(|at| at + Duration::hours(5));
    assert_eq!(
        h.step_with(next_window).await,
        Some((UsageMetric::Session, 60))
    );
}

#[tokio::test]
async fn large_drop_rearms_without_reset_change() {
    let mut h = Harness::new(NotificationSettings::default());
    assert_eq!(h.step(65.0, 0.0).await, Some((UsageMetric::Session, 60)));
    assert_eq!(h.step(10.0, 0.0).await, None);
    assert_eq!(h.step(62.0, 0.0).await, Some((UsageMetric::Session, 60)));
}

#[tokio::test]
async fn failed_refresh_produces_no_alert() {
    let mut h = Harness::new(NotificationSettings::default());
    h.mock.fail_with(Provider::Claude, "boom");
    assert_eq!(h.step(95.0, 95.0).await, None);
    assert!(h.notifier.sink().alerts().is_empty());
}

#[tokio::test]
async fn disabled_threshold_is_consumed_silently() {
    let mut h = Harness::new(NotificationSettings {
        notify_at_80: false,
        ..NotificationSettings::default()
    });

    assert_eq!(h.step(61.0, 0.0).await, Some((UsageMetric::Session, 60)));
    assert_eq!(h.step(81.0, 0.0).await, None);
    assert_eq!(h.step(82.0, 0.0).await, None);
    assert_eq!(h.step(91.0, 0.0).await, Some((UsageMetric::Session, 90)));
}

#[tokio::test]
async fn providers_have_independent_gates() {
    let mock = Arc::new(MockConnector::new());
    mock.set_snapshot(Provider::Claude, make_test_snapshot(65.0, 0.0));
    mock.set_snapshot(Provider::Codex, make_test_snapshot(65.0, 0.0));
    let store = UsageStore::with_defaults(mock.clone());
    let mut notifier =
        ThresholdNotifier::new(RecordingSink::default(), NotificationSettings::default());

    for provider in Provider::ALL {
        store.refresh(*provider).await;
        let snapshot = store.snapshot(*provider).unwrap();
        let alert = notifier.observe(*provider, &snapshot).unwrap();
        assert_eq!(alert.provider, *provider);
        assert_eq!(alert.threshold, 60);
    }

    let titles: Vec<String> = notifier.sink().alerts().into_iter().map(|a| a.title).collect();
    assert_eq!(titles, vec!["Claude Code".to_string(), "Codex".to_string()]);
}
