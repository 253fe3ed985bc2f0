//! Watch command: continuous polling with threshold alerts.
//!
//! The store's timer drives refreshes. Every state change re-renders the
//! selected provider and feeds its snapshot through the threshold notifier.
//! In file mode the usage file is also watched so edits show up between
//! polls.

use std::sync::Arc;

use chrono::Utc;
use colored::Colorize;

use crate::cli::args::{OutputFormat, WatchArgs};
use crate::core::alerts::{NotificationSink, ThresholdAlert, ThresholdNotifier, TracingSink};
use crate::core::connector::LocalCliConnector;
use crate::core::file_watcher::UsageFileWatcher;
use crate::core::provider::Provider;
use crate::core::store::UsageStore;
use crate::core::usage_file::locate;
use crate::error::Result;
use crate::render::{self, UsageReport, robot};
use crate::storage::{AppPaths, ConfigStore, MeterConfig, Settings, SourceMode};

/// Per-frame rendering state for a watch session.
pub struct WatchSession<S: NotificationSink> {
    store: UsageStore,
    notifier: ThresholdNotifier<S>,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
}

impl<S: NotificationSink> WatchSession<S> {
    #[must_use]
    pub const fn new(
        store: UsageStore,
        notifier: ThresholdNotifier<S>,
        format: OutputFormat,
        pretty: bool,
        no_color: bool,
    ) -> Self {
        Self {
            store,
            notifier,
            format,
            pretty,
            no_color,
        }
    }

    /// Render the selected provider and run it past the notifier.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn frame(&mut self) -> Result<String> {
        let provider = self.store.selected_provider();
        let report = UsageReport::from_store(&self.store, provider, Utc::now());

        let mut output = render::render_usage(
            std::slice::from_ref(&report),
            self.format,
            self.pretty,
            self.no_color,
        )?
        .trim_end()
        .to_string();

        let alert = report
            .snapshot
            .as_ref()
            .and_then(|snapshot| self.notifier.observe(provider, snapshot));
        if let Some(alert) = alert {
            output.push('\n');
            output.push_str(&self.render_alert(&alert)?);
        }

        Ok(output)
    }

    fn render_alert(&self, alert: &ThresholdAlert) -> Result<String> {
        match self.format {
            OutputFormat::Json => robot::render_alert_json(alert),
            OutputFormat::Human if self.no_color => Ok(format!("! {alert}")),
            OutputFormat::Human => Ok(format!("! {alert}").yellow().bold().to_string()),
        }
    }
}

/// Execute the watch command. Runs until Ctrl-C.
pub async fn execute(
    args: &WatchArgs,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<()> {
    args.validate()?;

    let paths = AppPaths::new();
    let settings = Settings::load_from(&paths.settings_file())?;
    let config_store = ConfigStore::from_paths(&paths);
    let config = config_store.load_or_default()?;

    let provider = args
        .provider
        .as_deref()
        .map(Provider::from_cli_name)
        .transpose()?
        .unwrap_or(settings.selected_provider);
    let mut file_watcher = watch_usage_file(&config, &paths);
    let connector = LocalCliConnector::new(config_store, paths);
    let store = UsageStore::new(
        Arc::new(connector),
        settings.poll_interval.duration(),
        settings.stale_after(),
    );
    store.update_selected_provider(provider);
    if let Some(seconds) = args.interval {
        store.update_poll_interval(seconds);
    }
    if let Some(seconds) = args.stale_after {
        store.update_stale_after(std::time::Duration::from_secs(seconds));
    }

    let notifier = ThresholdNotifier::new(TracingSink, settings.notifications);
    let mut session = WatchSession::new(store.clone(), notifier, format, pretty, no_color);
    let mut changes = store.subscribe();

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(());
    });

    store.start();

    let result = loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                changes.borrow_and_update();
                match session.frame() {
                    Ok(frame) => println!("{frame}"),
                    Err(e) => break Err(e),
                }
            }
            Some(change) = next_file_change(&mut file_watcher) => {
                if let Some(watcher) = file_watcher.as_mut() {
                    watcher.drain();
                }
                tracing::debug!(?change, "Usage file changed, refreshing");
                let store = store.clone();
                let provider = store.selected_provider();
                tokio::spawn(async move {
                    store.refresh(provider).await;
                });
            }
            _ = &mut shutdown_rx => {
                tracing::info!("Shutting down watch");
                break Ok(());
            }
        }
    };

    store.stop();
    result
}

/// Watch the located usage file when reading from one.
fn watch_usage_file(config: &MeterConfig, paths: &AppPaths) -> Option<UsageFileWatcher> {
    if config.source_mode() != SourceMode::File {
        return None;
    }
    let located = locate(config.usage_file_path.as_deref(), paths)?;
    match UsageFileWatcher::new(&located.path) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!(error = %e, "Could not watch usage file, relying on polling");
            None
        }
    }
}

async fn next_file_change(
    watcher: &mut Option<UsageFileWatcher>,
) -> Option<crate::core::file_watcher::FileChange> {
    match watcher {
        Some(watcher) => watcher.changed().await,
        None => std::future::pending().await,
    }
}
