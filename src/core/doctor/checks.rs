//! Setup checks for the doctor command.

use std::path::Path;
use std::time::Instant;

use futures::future::join_all;

use super::{CheckStatus, DiagnosticCheck, ProviderHealth};
use crate::core::connector::UsageProviderConnector;
use crate::core::provider::Provider;
use crate::storage::{ConfigStore, ENV_CONFIG, ENV_SETTINGS, Settings, SourceMode};

/// Check that the usage config parses.
#[must_use]
pub fn check_usage_config(store: &ConfigStore) -> DiagnosticCheck {
    let start = Instant::now();

    let status = match store.load() {
        Ok(Some(_)) => CheckStatus::Pass {
            details: Some(store.path().display().to_string()),
        },
        Ok(None) => CheckStatus::Warning {
            details: format!("No config at {}", store.path().display()),
            suggestion: Some(format!(
                "Create it with a claudeCommand/codexCommand, or set {ENV_CONFIG}"
            )),
        },
        Err(e) => CheckStatus::Fail {
            reason: e.to_string(),
            suggestion: Some(format!("Fix the JSON in {}", store.path().display())),
        },
    };

    DiagnosticCheck::new("Usage config", status).with_duration(start.elapsed())
}

/// Check that the app settings parse.
#[must_use]
pub fn check_settings(path: &Path) -> DiagnosticCheck {
    let start = Instant::now();

    let status = if path.exists() {
        match Settings::load_from(path) {
            Ok(_) => CheckStatus::Pass {
                details: Some(path.display().to_string()),
            },
            Err(e) => CheckStatus::Fail {
                reason: e.to_string(),
                suggestion: Some(format!("Fix or delete {}, or set {ENV_SETTINGS}", path.display())),
            },
        }
    } else {
        CheckStatus::Pass {
            details: Some("Using defaults".to_string()),
        }
    };

    DiagnosticCheck::new("Settings", status).with_duration(start.elapsed())
}

/// Check one provider, optionally running a live fetch.
pub async fn check_provider_health(
    connector: &dyn UsageProviderConnector,
    provider: Provider,
    source: SourceMode,
    probe: bool,
) -> ProviderHealth {
    let start = Instant::now();
    let validation = connector.validate_environment(provider);
    let status = if validation.is_valid {
        CheckStatus::Pass { details: None }
    } else {
        CheckStatus::Fail {
            reason: validation
                .message
                .unwrap_or_else(|| "Environment check failed".to_string()),
            suggestion: Some(setup_suggestion(provider, source)),
        }
    };
    let environment = DiagnosticCheck::new(format!("{} source", provider.display_name()), status)
        .with_duration(start.elapsed());

    let fetch = if probe && environment.status.is_ready() {
        let start = Instant::now();
        let status = match connector.fetch_usage(provider).await {
            Ok(snapshot) => CheckStatus::Pass {
                details: Some(format!(
                    "session {}, weekly {}",
                    percent_or_dash(snapshot.session_used_percent),
                    percent_or_dash(snapshot.weekly_used_percent)
                )),
            },
            Err(e) => CheckStatus::Fail {
                reason: e.to_string(),
                suggestion: Some(e.hint().to_string()),
            },
        };
        Some(
            DiagnosticCheck::new(format!("{} fetch", provider.display_name()), status)
                .with_duration(start.elapsed()),
        )
    } else if probe {
        Some(DiagnosticCheck::new(
            format!("{} fetch", provider.display_name()),
            CheckStatus::Skipped {
                reason: "environment check failed".to_string(),
            },
        ))
    } else {
        None
    };

    ProviderHealth {
        provider,
        source,
        environment,
        fetch,
    }
}

/// Check several providers in parallel.
pub async fn check_all_providers(
    connector: &dyn UsageProviderConnector,
    providers: &[Provider],
    source: SourceMode,
    probe: bool,
) -> Vec<ProviderHealth> {
    join_all(
        providers
            .iter()
            .map(|&provider| check_provider_health(connector, provider, source, probe)),
    )
    .await
}

fn setup_suggestion(provider: Provider, source: SourceMode) -> String {
    match source {
        SourceMode::Command => format!(
            "Set \"{}Command\" or \"providerCommand\" in the usage config",
            provider.cli_name()
        ),
        SourceMode::File => {
            "Set \"usageFilePath\" in the usage config, or run Claude Code once to create ~/.claude/stats-cache.json"
                .to_string()
        }
    }
}

fn percent_or_dash(percent: Option<f64>) -> String {
    percent.map_or_else(|| "--".to_string(), crate::util::format_percent)
}
