//! Config command implementation.

use serde::Serialize;

use crate::cli::args::{ConfigCommand, OutputFormat};
use crate::error::Result;
use crate::render::robot::{RobotOutput, render_json};
use crate::storage::{AppPaths, ConfigStore, MeterConfig, Settings};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigPaths {
    usage_config: String,
    usage_config_exists: bool,
    settings: String,
    settings_exists: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigView {
    usage_config: Option<MeterConfig>,
    settings: Settings,
}

/// Execute a config subcommand.
pub fn execute(cmd: &ConfigCommand, format: OutputFormat, pretty: bool) -> Result<()> {
    let paths = AppPaths::new();
    let output = match cmd {
        ConfigCommand::Path => render_paths(&paths, format, pretty)?,
        ConfigCommand::Show => render_show(&paths, format, pretty)?,
    };
    println!("{}", output.trim_end());
    Ok(())
}

fn render_paths(paths: &AppPaths, format: OutputFormat, pretty: bool) -> Result<String> {
    let usage_config = paths.usage_config_file();
    let settings = paths.settings_file();
    let view = ConfigPaths {
        usage_config_exists: usage_config.exists(),
        usage_config: usage_config.display().to_string(),
        settings_exists: settings.exists(),
        settings: settings.display().to_string(),
    };

    match format {
        OutputFormat::Json => render_json(&RobotOutput::new("config-path", view), pretty),
        OutputFormat::Human => Ok(format!(
            "Usage config: {}{}\nSettings:     {}{}",
            view.usage_config,
            missing_suffix(view.usage_config_exists),
            view.settings,
            missing_suffix(view.settings_exists),
        )),
    }
}

fn render_show(paths: &AppPaths, format: OutputFormat, pretty: bool) -> Result<String> {
    let usage_config = ConfigStore::from_paths(paths).load()?;
    let settings = Settings::load_from(&paths.settings_file())?;
    let view = ConfigView {
        usage_config,
        settings,
    };

    match format {
        OutputFormat::Json => render_json(&RobotOutput::new("config-show", view), pretty),
        OutputFormat::Human => {
            let usage = match &view.usage_config {
                Some(config) => serde_json::to_string_pretty(config)?,
                None => "(not configured)".to_string(),
            };
            Ok(format!(
                "# Usage config\n{usage}\n\n# Settings\npoll interval: {}\nstale after:   {}s\nselected:      {}\nalerts:        60%={} 80%={} 90%={}",
                view.settings.poll_interval.label(),
                view.settings.stale_after_secs,
                view.settings.selected_provider,
                on_off(view.settings.notifications.notify_at_60),
                on_off(view.settings.notifications.notify_at_80),
                on_off(view.settings.notifications.notify_at_90),
            ))
        }
    }
}

const fn missing_suffix(exists: bool) -> &'static str {
    if exists { "" } else { " (missing)" }
}

const fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn paths_mark_missing_files() {
        let dir = TempDir::new().unwrap();
        let paths = AppPaths::with_home(dir.path());
        let out = render_paths(&paths, OutputFormat::Human, false).unwrap();
        assert!(out.contains("Usage config: "));
        assert!(out.contains("(missing)"));
    }

    #[test]
    fn show_reports_defaults_when_unconfigured() {
        let dir = TempDir::new().unwrap();
        let paths = AppPaths::with_home(dir.path());
        let out = render_show(&paths, OutputFormat::Json, false).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(json["command"], "config-show");
        assert!(json["data"]["usageConfig"].is_null());
        assert_eq!(json["data"]["settings"]["poll_interval"], "30s");
    }
}
