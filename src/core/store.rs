//! Usage store: per-provider state plus the polling lifecycle.
//!
//! The store owns snapshots, errors, and last-refresh stamps keyed by
//! provider. All mutation goes through [`UsageStore::refresh`]; readers copy
//! on read. Observers subscribe to a version counter that bumps on every
//! state change.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::connector::UsageProviderConnector;
use super::models::UsageSnapshot;
use super::provider::Provider;
use super::refresh::UsageRefreshActor;

/// Default polling period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default age after which a snapshot counts as stale.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(300);

/// What a call to [`UsageStore::refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The fetch succeeded and the snapshot was stored.
    Updated,
    /// The fetch failed and the error was stored.
    Failed,
    /// A refresh for the same provider was already in flight.
    Coalesced,
}

// ============================================================================
// State
// ============================================================================

#[derive(Debug)]
struct StoreState {
    snapshots: HashMap<Provider, UsageSnapshot>,
    errors: HashMap<Provider, String>,
    last_refresh: HashMap<Provider, DateTime<Utc>>,
    selected: Provider,
    poll_interval: Duration,
    stale_after: Duration,
}

impl StoreState {
    fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        self.is_provider_stale_at(self.selected, now)
    }

    fn is_provider_stale_at(&self, provider: Provider, now: DateTime<Utc>) -> bool {
        let Some(snapshot) = self.snapshots.get(&provider) else {
            return false;
        };
        let Ok(stale_after) = chrono::Duration::from_std(self.stale_after) else {
            return false;
        };
        now - snapshot.source_mtime > stale_after
    }
}

/// Copy of the store state at one instant.
#[derive(Debug, Clone)]
pub struct StoreView {
    pub snapshots: HashMap<Provider, UsageSnapshot>,
    pub errors: HashMap<Provider, String>,
    pub last_refresh: HashMap<Provider, DateTime<Utc>>,
    pub selected_provider: Provider,
    pub is_stale: bool,
    pub refreshing: Vec<Provider>,
    pub version: u64,
}

impl StoreView {
    /// Snapshot of the selected provider.
    #[must_use]
    pub fn current_snapshot(&self) -> Option<&UsageSnapshot> {
        self.snapshots.get(&self.selected_provider)
    }

    /// Error of the selected provider.
    #[must_use]
    pub fn current_error(&self) -> Option<&str> {
        self.errors.get(&self.selected_provider).map(String::as_str)
    }
}

struct TimerHandle {
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl TimerHandle {
    fn cancel(self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}

struct Inner {
    actor: UsageRefreshActor,
    state: RwLock<StoreState>,
    in_flight: Mutex<HashSet<Provider>>,
    timer: Mutex<Option<TimerHandle>>,
    changes: watch::Sender<u64>,
}

/// Removes a provider from the in-flight set when dropped, including when
/// the refresh future is cancelled.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<Provider>>,
    provider: Provider,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<Provider>>, provider: Provider) -> Option<Self> {
        set.lock()
            .insert(provider)
            .then_some(Self { set, provider })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.provider);
    }
}

// ============================================================================
// Usage Store
// ============================================================================

/// Shared handle to the usage store. Cloning is cheap.
#[derive(Clone)]
pub struct UsageStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for UsageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageStore")
            .field("state", &*self.inner.state.read())
            .field("timer_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl UsageStore {
    /// Create a stopped store.
    #[must_use]
    pub fn new(
        connector: Arc<dyn UsageProviderConnector>,
        poll_interval: Duration,
        stale_after: Duration,
    ) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                actor: UsageRefreshActor::new(connector),
                state: RwLock::new(StoreState {
                    snapshots: HashMap::new(),
                    errors: HashMap::new(),
                    last_refresh: HashMap::new(),
                    selected: Provider::default(),
                    poll_interval,
                    stale_after,
                }),
                in_flight: Mutex::new(HashSet::new()),
                timer: Mutex::new(None),
                changes,
            }),
        }
    }

    /// Store with the default interval and staleness window.
    #[must_use]
    pub fn with_defaults(connector: Arc<dyn UsageProviderConnector>) -> Self {
        Self::new(connector, DEFAULT_POLL_INTERVAL, DEFAULT_STALE_AFTER)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start the polling loop and refresh the selected provider right away.
    ///
    /// Calling `start` on a running store restarts the loop.
    /// Must be called within a tokio runtime.
    pub fn start(&self) {
        let provider = self.selected_provider();
        info!(
            provider = %provider,
            interval_secs = self.poll_interval().as_secs_f64(),
            "Starting usage polling"
        );
        self.restart_timer(false);
        self.spawn_refresh(provider);
    }

    /// Stop the polling loop.
    ///
    /// Refreshes already in flight still complete and store their result.
    /// No timer-driven refresh starts after this returns.
    pub fn stop(&self) {
        let mut timer = self.inner.timer.lock();
        if let Some(handle) = timer.take() {
            handle.cancel();
            info!("Stopped usage polling");
        }
    }

    /// Whether the polling loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.timer.lock().is_some()
    }

    /// Change the polling period.
    ///
    /// Non-positive or non-finite values are ignored. A running loop restarts
    /// with the new period, dropping any pending tick.
    pub fn update_poll_interval(&self, seconds: f64) {
        if !seconds.is_finite() || seconds <= 0.0 {
            debug!(seconds, "Ignoring invalid poll interval");
            return;
        }
        let interval = Duration::from_secs_f64(seconds);
        self.inner.state.write().poll_interval = interval;
        debug!(seconds, "Poll interval updated");

        self.restart_timer(true);
    }

    /// Current polling period.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.inner.state.read().poll_interval
    }

    /// Change which provider is displayed and polled. Does not refresh.
    pub fn update_selected_provider(&self, provider: Provider) {
        let changed = {
            let mut state = self.inner.state.write();
            let changed = state.selected != provider;
            state.selected = provider;
            changed
        };
        if changed {
            debug!(provider = %provider, "Selected provider changed");
            self.notify_change();
        }
    }

    /// Currently selected provider.
    #[must_use]
    pub fn selected_provider(&self) -> Provider {
        self.inner.state.read().selected
    }

    /// Replace the timer loop. With `only_if_running`, a stopped store stays
    /// stopped; the check happens under the timer lock so it cannot race `stop`.
    fn restart_timer(&self, only_if_running: bool) {
        let interval = self.poll_interval();
        let mut timer = self.inner.timer.lock();
        match timer.take() {
            Some(previous) => previous.cancel(),
            None if only_if_running => return,
            None => {}
        }
        *timer = Some(spawn_timer(Arc::downgrade(&self.inner), interval));
    }

    fn spawn_refresh(&self, provider: Provider) {
        let store = self.clone();
        tokio::spawn(async move {
            store.refresh(provider).await;
        });
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    /// Refresh one provider.
    ///
    /// Returns [`RefreshOutcome::Coalesced`] without fetching when a refresh
    /// for the same provider is already in flight. Refreshes for different
    /// providers run independently. Errors are stored, never returned.
    pub async fn refresh(&self, provider: Provider) -> RefreshOutcome {
        let Some(guard) = InFlightGuard::acquire(&self.inner.in_flight, provider) else {
            debug!(provider = %provider, "Refresh already in flight");
            return RefreshOutcome::Coalesced;
        };

        let result = self.inner.actor.refresh(provider).await;
        let now = Utc::now();

        let outcome = {
            let mut state = self.inner.state.write();
            state.last_refresh.insert(provider, now);
            match result {
                Ok(snapshot) => {
                    state.errors.remove(&provider);
                    state.snapshots.insert(provider, snapshot);
                    RefreshOutcome::Updated
                }
                Err(e) => {
                    warn!(provider = %provider, error = %e, "Usage refresh failed");
                    state.snapshots.remove(&provider);
                    state.errors.insert(provider, e.to_string());
                    RefreshOutcome::Failed
                }
            }
        };

        drop(guard);
        self.notify_change();
        outcome
    }

    /// Whether a refresh for `provider` is in flight.
    #[must_use]
    pub fn is_refreshing(&self, provider: Provider) -> bool {
        self.inner.in_flight.lock().contains(&provider)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Latest snapshot for a provider.
    #[must_use]
    pub fn snapshot(&self, provider: Provider) -> Option<UsageSnapshot> {
        self.inner.state.read().snapshots.get(&provider).cloned()
    }

    /// Latest error message for a provider.
    #[must_use]
    pub fn error(&self, provider: Provider) -> Option<String> {
        self.inner.state.read().errors.get(&provider).cloned()
    }

    /// When `provider` last finished a refresh, successful or not.
    #[must_use]
    pub fn last_refresh(&self, provider: Provider) -> Option<DateTime<Utc>> {
        self.inner.state.read().last_refresh.get(&provider).copied()
    }

    /// Whether the selected provider's snapshot is older than the staleness
    /// window. False when there is no snapshot.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now())
    }

    /// [`Self::is_stale`] as of `now`.
    #[must_use]
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        self.inner.state.read().is_stale_at(now)
    }

    /// Staleness of any provider's snapshot as of `now`.
    #[must_use]
    pub fn is_provider_stale_at(&self, provider: Provider, now: DateTime<Utc>) -> bool {
        self.inner.state.read().is_provider_stale_at(provider, now)
    }

    /// Staleness window.
    #[must_use]
    pub fn stale_after(&self) -> Duration {
        self.inner.state.read().stale_after
    }

    /// Change the staleness window.
    pub fn update_stale_after(&self, stale_after: Duration) {
        self.inner.state.write().stale_after = stale_after;
        self.notify_change();
    }

    /// Copy of the whole state.
    #[must_use]
    pub fn view(&self) -> StoreView {
        let version = *self.inner.changes.borrow();
        let mut refreshing: Vec<Provider> = self.inner.in_flight.lock().iter().copied().collect();
        refreshing.sort_by_key(|p| p.cli_name());

        let state = self.inner.state.read();
        StoreView {
            snapshots: state.snapshots.clone(),
            errors: state.errors.clone(),
            last_refresh: state.last_refresh.clone(),
            selected_provider: state.selected,
            is_stale: state.is_stale_at(Utc::now()),
            refreshing,
            version,
        }
    }

    /// Receiver whose value bumps whenever a refresh lands or the selection
    /// or staleness window changes. Starting a refresh does not bump it.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    fn notify_change(&self) {
        self.inner.changes.send_modify(|version| *version += 1);
    }
}

/// Sleep, then refresh the selected provider, until cancelled.
///
/// The cancel flag is checked under the timer lock, so once `stop` returns no
/// new refresh can be spawned by this loop.
fn spawn_timer(inner: Weak<Inner>, interval: Duration) -> TimerHandle {
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);

    let task = tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            let Some(inner) = inner.upgrade() else {
                break;
            };
            let store = UsageStore { inner };
            let _timer = store.inner.timer.lock();
            if flag.load(Ordering::SeqCst) {
                break;
            }
            let provider = store.selected_provider();
            debug!(provider = %provider, "Poll tick");
            store.spawn_refresh(provider);
        }
    });

    TimerHandle { cancelled, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockConnector;
    use chrono::TimeDelta;

    fn store_with(mock: &Arc<MockConnector>, interval: Duration) -> UsageStore {
        UsageStore::new(mock.clone(), interval, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn success_stores_snapshot_and_clears_error() {
        let mock = Arc::new(MockConnector::new());
        let store = store_with(&mock, DEFAULT_POLL_INTERVAL);

        mock.fail_with(Provider::Claude, "boom");
        assert_eq!(store.refresh(Provider::Claude).await, RefreshOutcome::Failed);
        assert_eq!(store.error(Provider::Claude).as_deref(), Some("boom"));
        assert!(store.snapshot(Provider::Claude).is_none());

        mock.succeed(Provider::Claude);
        assert_eq!(store.refresh(Provider::Claude).await, RefreshOutcome::Updated);
        assert!(store.snapshot(Provider::Claude).is_some());
        assert!(store.error(Provider::Claude).is_none());
        assert!(store.last_refresh(Provider::Claude).is_some());
    }

    #[tokio::test]
    async fn failure_clears_previous_snapshot() {
        let mock = Arc::new(MockConnector::new());
        let store = store_with(&mock, DEFAULT_POLL_INTERVAL);

        store.refresh(Provider::Codex).await;
        assert!(store.snapshot(Provider::Codex).is_some());

        mock.fail_with(Provider::Codex, "No usage file found.");
        store.refresh(Provider::Codex).await;
        assert!(store.snapshot(Provider::Codex).is_none());
        assert_eq!(
            store.error(Provider::Codex).as_deref(),
            Some("No usage file found.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_refreshes_of_same_provider_coalesce() {
        let mock = Arc::new(MockConnector::new().with_delay(Duration::from_millis(200)));
        let store = store_with(&mock, DEFAULT_POLL_INTERVAL);

        let (a, b) = tokio::join!(
            store.refresh(Provider::Claude),
            store.refresh(Provider::Claude)
        );

        assert_eq!(mock.calls(Provider::Claude), 1);
        let mut outcomes = [a, b];
        outcomes.sort_by_key(|o| *o == RefreshOutcome::Coalesced);
        assert_eq!(outcomes, [RefreshOutcome::Updated, RefreshOutcome::Coalesced]);
        assert!(!store.is_refreshing(Provider::Claude));
    }

    #[tokio::test(start_paused = true)]
    async fn different_providers_refresh_independently() {
        let mock = Arc::new(MockConnector::new().with_delay(Duration::from_millis(100)));
        mock.fail_with(Provider::Codex, "codex broke");
        let store = store_with(&mock, DEFAULT_POLL_INTERVAL);

        tokio::join!(
            store.refresh(Provider::Claude),
            store.refresh(Provider::Codex)
        );

        assert_eq!(mock.calls(Provider::Claude), 1);
        assert_eq!(mock.calls(Provider::Codex), 1);
        assert!(store.snapshot(Provider::Claude).is_some());
        assert!(store.error(Provider::Claude).is_none());
        assert!(store.snapshot(Provider::Codex).is_none());
        assert_eq!(store.error(Provider::Codex).as_deref(), Some("codex broke"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_refresh_releases_in_flight_slot() {
        let mock = Arc::new(MockConnector::new().with_delay(Duration::from_secs(10)));
        let store = store_with(&mock, DEFAULT_POLL_INTERVAL);

        let pending = tokio::time::timeout(Duration::from_millis(10), store.refresh(Provider::Claude));
        assert!(pending.await.is_err());
        assert!(!store.is_refreshing(Provider::Claude));
    }

    #[tokio::test(start_paused = true)]
    async fn start_refreshes_immediately_then_on_each_tick() {
        let mock = Arc::new(MockConnector::new());
        let store = store_with(&mock, Duration::from_secs(5));

        store.start();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(mock.calls(Provider::Claude), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(mock.calls(Provider::Claude), 2);

        tokio::time::sleep(Duration::from_secs(5)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(mock.calls(Provider::Claude), 3);
        store.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_further_polls() {
        let mock = Arc::new(MockConnector::new());
        let store = store_with(&mock, Duration::from_secs(1));

        store.start();
        tokio::time::sleep(Duration::from_millis(1)).await;
        store.stop();
        let after_stop = mock.total_calls();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(mock.total_calls(), after_stop);
        assert!(!store.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_lets_in_flight_refresh_land() {
        let mock = Arc::new(MockConnector::new().with_delay(Duration::from_secs(2)));
        let store = store_with(&mock, Duration::from_secs(60));

        store.start();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(store.is_refreshing(Provider::Claude));
        store.stop();

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(store.snapshot(Provider::Claude).is_some());
        assert_eq!(mock.calls(Provider::Claude), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_update_restarts_timer() {
        let mock = Arc::new(MockConnector::new());
        let store = store_with(&mock, Duration::from_secs(100));

        store.start();
        tokio::time::sleep(Duration::from_secs(50)).await;
        assert_eq!(mock.calls(Provider::Claude), 1);

        store.update_poll_interval(2.0);
        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(mock.calls(Provider::Claude), 2);

        // Ticks every 2s from t=54 through t=100; the original t=100 tick is gone.
        tokio::time::sleep(Duration::from_secs(49)).await;
        assert_eq!(mock.calls(Provider::Claude), 26);
        store.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn interval_update_after_stop_keeps_store_stopped() {
        let mock = Arc::new(MockConnector::new());
        let store = store_with(&mock, Duration::from_secs(1));

        store.start();
        tokio::time::sleep(Duration::from_millis(1)).await;
        store.stop();
        let after_stop = mock.total_calls();

        store.update_poll_interval(0.5);
        assert!(!store.is_running());
        assert_eq!(store.poll_interval(), Duration::from_millis(500));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(mock.total_calls(), after_stop);
    }

    #[tokio::test]
    async fn invalid_interval_is_ignored() {
        let mock = Arc::new(MockConnector::new());
        let store = store_with(&mock, Duration::from_secs(30));

        store.update_poll_interval(0.0);
        store.update_poll_interval(-5.0);
        store.update_poll_interval(f64::NAN);
        assert_eq!(store.poll_interval(), Duration::from_secs(30));

        store.update_poll_interval(1.5);
        assert_eq!(store.poll_interval(), Duration::from_millis(1500));
        assert!(!store.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn timer_polls_selected_provider() {
        let mock = Arc::new(MockConnector::new());
        let store = store_with(&mock, Duration::from_secs(1));
        store.update_selected_provider(Provider::Codex);
        assert_eq!(mock.total_calls(), 0);

        store.start();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(mock.calls(Provider::Codex), 2);
        assert_eq!(mock.calls(Provider::Claude), 0);
        store.stop();
    }

    #[tokio::test]
    async fn staleness_tracks_selected_snapshot_mtime() {
        let mock = Arc::new(MockConnector::new());
        let store = store_with(&mock, DEFAULT_POLL_INTERVAL);
        assert!(!store.is_stale());

        store.refresh(Provider::Claude).await;
        let mtime = store.snapshot(Provider::Claude).unwrap().source_mtime;

        assert!(!store.is_stale());
        assert!(!store.is_stale_at(mtime + TimeDelta::seconds(60)));
        assert!(store.is_stale_at(mtime + TimeDelta::seconds(61)));

        store.update_selected_provider(Provider::Codex);
        assert!(!store.is_stale_at(mtime + TimeDelta::seconds(600)));
    }

    #[tokio::test]
    async fn subscribers_see_version_bumps() {
        let mock = Arc::new(MockConnector::new());
        let store = store_with(&mock, DEFAULT_POLL_INTERVAL);
        let mut rx = store.subscribe();
        let before = *rx.borrow_and_update();

        store.refresh(Provider::Claude).await;
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update() > before);

        store.update_stale_after(Duration::from_secs(5));
        assert!(rx.has_changed().unwrap());
        assert_eq!(store.stale_after(), Duration::from_secs(5));
        rx.borrow_and_update();

        let view = store.view();
        assert_eq!(view.selected_provider, Provider::Claude);
        assert!(view.current_snapshot().is_some());
        assert!(view.current_error().is_none());
        assert!(view.refreshing.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn one_version_bump_per_completed_refresh() {
        let mock = Arc::new(MockConnector::new().with_delay(Duration::from_secs(1)));
        let store = store_with(&mock, DEFAULT_POLL_INTERVAL);
        let mut rx = store.subscribe();
        let before = *rx.borrow_and_update();

        let refresh = tokio::spawn({
            let store = store.clone();
            async move { store.refresh(Provider::Claude).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(store.is_refreshing(Provider::Claude));
        assert!(!rx.has_changed().unwrap());

        refresh.await.unwrap();
        assert_eq!(*rx.borrow_and_update(), before + 1);
    }
}
