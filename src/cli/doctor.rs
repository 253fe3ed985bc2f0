//! Doctor command implementation.

use std::time::Instant;

use crate::cli::args::{DoctorArgs, OutputFormat};
use crate::core::connector::LocalCliConnector;
use crate::core::doctor::checks::{check_all_providers, check_settings, check_usage_config};
use crate::core::doctor::DoctorReport;
use crate::core::provider::Provider;
use crate::error::{MeterError, Result};
use crate::render;
use crate::storage::{AppPaths, ConfigStore};

/// Execute the doctor command.
///
/// # Errors
///
/// Returns [`MeterError::PartialFailure`] when any provider needs attention,
/// so scripts can rely on the exit code.
pub async fn execute(
    args: &DoctorArgs,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<()> {
    let start = Instant::now();
    tracing::debug!(?args.provider, probe = args.probe, "Starting doctor checks");

    let providers = selected_providers(args.provider.as_deref())?;
    let paths = AppPaths::new();
    let config_store = ConfigStore::from_paths(&paths);

    let config_status = check_usage_config(&config_store);
    let settings_status = check_settings(&paths.settings_file());
    let source = config_store
        .load()
        .ok()
        .flatten()
        .unwrap_or_default()
        .source_mode();

    let connector = LocalCliConnector::new(config_store, paths);
    let provider_health = check_all_providers(&connector, &providers, source, args.probe).await;

    let report = DoctorReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        config_status,
        settings_status,
        providers: provider_health,
        total_duration: start.elapsed(),
    };

    let output = render::render_doctor(&report, format, pretty, no_color)?;
    println!("{}", output.trim_end());

    let failed = report.providers.iter().filter(|p| !p.is_ready()).count();
    if failed > 0 {
        return Err(MeterError::PartialFailure { failed });
    }

    Ok(())
}

fn selected_providers(args: Option<&[String]>) -> Result<Vec<Provider>> {
    let Some(names) = args else {
        return Ok(Provider::ALL.to_vec());
    };

    let mut providers = Vec::new();
    for name in names {
        for provider in Provider::parse_selection(name)? {
            if !providers.contains(&provider) {
                providers.push(provider);
            }
        }
    }
    Ok(providers)
}
