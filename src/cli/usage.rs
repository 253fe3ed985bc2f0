//! Usage command implementation.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;

use crate::cli::args::{OutputFormat, UsageArgs};
use crate::core::connector::LocalCliConnector;
use crate::core::provider::Provider;
use crate::core::store::UsageStore;
use crate::error::{MeterError, Result};
use crate::render::{self, UsageReport};
use crate::storage::{AppPaths, ConfigStore, Settings};

/// Execute the usage command.
pub async fn execute(
    args: &UsageArgs,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<()> {
    let providers = Provider::parse_selection(&args.provider)?;
    let store = build_store()?;

    tracing::debug!(?providers, "Starting usage refresh");
    let reports = refresh_all(&store, &providers).await;

    let output = render::render_usage(&reports, format, pretty, no_color)?;
    println!("{}", output.trim_end());

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        return Err(MeterError::PartialFailure { failed });
    }

    Ok(())
}

/// Build a stopped store over the local CLI connector and saved settings.
pub(crate) fn build_store() -> Result<UsageStore> {
    let paths = AppPaths::new();
    let settings = Settings::load_from(&paths.settings_file())?;
    let connector = LocalCliConnector::new(ConfigStore::from_paths(&paths), paths);

    let store = UsageStore::new(
        Arc::new(connector),
        settings.poll_interval.duration(),
        settings.stale_after(),
    );
    store.update_selected_provider(settings.selected_provider);
    Ok(store)
}

/// Refresh every provider in parallel and capture the resulting state.
pub async fn refresh_all(store: &UsageStore, providers: &[Provider]) -> Vec<UsageReport> {
    join_all(providers.iter().map(|&provider| store.refresh(provider))).await;

    let now = Utc::now();
    providers
        .iter()
        .map(|&provider| UsageReport::from_store(store, provider, now))
        .collect()
}
