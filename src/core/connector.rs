//! Usage provider connectors.
//!
//! A connector turns a [`Provider`] into a [`UsageSnapshot`]. The store only
//! talks to this trait, so tests can swap in a mock.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::command_source::CommandUsageSource;
use super::models::UsageSnapshot;
use super::provider::Provider;
use super::usage_file::{locate, read_usage_file};
use crate::error::{MeterError, Result};
use crate::storage::{AppPaths, ConfigStore, MeterConfig, SourceMode};

/// How a connector authenticates against the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuthMode {
    /// Reuses whatever the locally installed CLI is logged in as.
    #[serde(rename = "local-cli")]
    LocalCli,
}

/// Outcome of a pre-flight environment check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationResult {
    #[must_use]
    pub const fn valid() -> Self {
        Self {
            is_valid: true,
            message: None,
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: Some(message.into()),
        }
    }
}

/// Fetches usage for a provider.
///
/// Implementations must bound their own I/O; the store never times out a fetch.
#[async_trait]
pub trait UsageProviderConnector: Send + Sync {
    /// Authentication mode of this connector.
    fn auth_mode(&self) -> AuthMode;

    /// Fetch a fresh snapshot.
    async fn fetch_usage(&self, provider: Provider) -> Result<UsageSnapshot>;

    /// Side-effect-free check that fetching could work.
    fn validate_environment(&self, provider: Provider) -> ValidationResult;
}

#[async_trait]
impl<T: UsageProviderConnector + ?Sized> UsageProviderConnector for Arc<T> {
    fn auth_mode(&self) -> AuthMode {
        (**self).auth_mode()
    }

    async fn fetch_usage(&self, provider: Provider) -> Result<UsageSnapshot> {
        (**self).fetch_usage(provider).await
    }

    fn validate_environment(&self, provider: Provider) -> ValidationResult {
        (**self).validate_environment(provider)
    }
}

// =============================================================================
// Local CLI Connector
// =============================================================================

/// Connector backed by local CLI tooling: either a usage command or the
/// usage cache file, depending on the configured `source`.
///
/// The config is re-read on every call.
#[derive(Debug, Clone)]
pub struct LocalCliConnector {
    config_store: ConfigStore,
    paths: AppPaths,
    command_source: CommandUsageSource,
}

impl LocalCliConnector {
    #[must_use]
    pub const fn new(config_store: ConfigStore, paths: AppPaths) -> Self {
        Self {
            config_store,
            paths,
            command_source: CommandUsageSource::with_timeout(super::cli_runner::CLI_TIMEOUT),
        }
    }

    /// Override the command source (e.g. a shorter timeout).
    #[must_use]
    pub const fn with_command_source(mut self, command_source: CommandUsageSource) -> Self {
        self.command_source = command_source;
        self
    }

    fn fetch_from_file(&self, config: &MeterConfig) -> Result<UsageSnapshot> {
        let located = locate(config.usage_file_path.as_deref(), &self.paths)
            .ok_or_else(|| MeterError::SourceNotFound("No usage file found.".to_string()))?;
        tracing::debug!(
            path = %located.path.display(),
            origin = located.origin.label(),
            "Reading usage file"
        );
        read_usage_file(&located.path, config.limits())
    }
}

#[async_trait]
impl UsageProviderConnector for LocalCliConnector {
    fn auth_mode(&self) -> AuthMode {
        AuthMode::LocalCli
    }

    async fn fetch_usage(&self, provider: Provider) -> Result<UsageSnapshot> {
        let config = self.config_store.load_or_default()?;
        match config.source_mode() {
            SourceMode::Command => self.command_source.fetch(&config, provider).await,
            SourceMode::File => self.fetch_from_file(&config),
        }
    }

    fn validate_environment(&self, provider: Provider) -> ValidationResult {
        let config = match self.config_store.load_or_default() {
            Ok(config) => config,
            Err(e) => return ValidationResult::invalid(e.to_string()),
        };

        match config.source_mode() {
            SourceMode::Command => {
                let command = config.command_for(provider).trim();
                if command.is_empty() {
                    return ValidationResult::invalid(format!(
                        "Missing command for {}.",
                        provider.display_name()
                    ));
                }
                // Shell strings cannot be checked without running them; bare
                // program names can.
                if !command.contains(char::is_whitespace)
                    && !command.starts_with('/')
                    && which::which(command).is_err()
                {
                    return ValidationResult::invalid(format!("Command not found on PATH: {command}"));
                }
                ValidationResult::valid()
            }
            SourceMode::File => {
                if locate(config.usage_file_path.as_deref(), &self.paths).is_some() {
                    ValidationResult::valid()
                } else {
                    ValidationResult::invalid("No usage file found.")
                }
            }
        }
    }
}
