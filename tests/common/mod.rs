//! Shared setup for integration tests.
//!
//! - `log_capture`: collect `tracing` events emitted during a test
//! - [`MeterEnv`]: an isolated home directory with usage config, settings and
//!   usage files, usable in-process or through the compiled binary

#![allow(dead_code)]

pub mod log_capture;

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use modelmeter::core::LocalCliConnector;
use modelmeter::storage::{AppPaths, ConfigStore, ENV_CONFIG, ENV_SETTINGS};
use serde_json::json;
use tempfile::TempDir;

/// A throwaway home directory with its own config files.
pub struct MeterEnv {
    home: TempDir,
}

impl MeterEnv {
    pub fn new() -> Self {
        Self {
            home: TempDir::new().expect("create temp home"),
        }
    }

    pub fn home(&self) -> &Path {
        self.home.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.home().join(".modelmeter").join("config.json")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.home().join("settings.toml")
    }

    /// Write the usage config JSON.
    pub fn write_config(&self, config: &serde_json::Value) {
        let path = self.config_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string_pretty(config).unwrap()).unwrap();
    }

    /// Write settings TOML.
    pub fn write_settings(&self, toml: &str) {
        fs::write(self.settings_path(), toml).unwrap();
    }

    /// Write a file under the home directory and return its path.
    pub fn write_file(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.home().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    /// Configure a command for each provider that prints `payload` via `cat`.
    pub fn use_command_payloads(&self, claude: &str, codex: &str) {
        let claude_path = self.write_file("payloads/claude.json", claude);
        let codex_path = self.write_file("payloads/codex.json", codex);
        self.write_config(&json!({
            "source": "command",
            "claudeCommand": format!("cat {}", claude_path.display()),
            "codexCommand": format!("cat {}", codex_path.display()),
        }));
    }

    /// Connector reading this environment's config, for in-process tests.
    pub fn connector(&self) -> LocalCliConnector {
        LocalCliConnector::new(
            ConfigStore::new(self.config_path()),
            AppPaths::with_home(self.home()),
        )
    }

    /// The compiled binary, isolated to this environment.
    #[allow(deprecated)]
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("modelmeter").expect("binary built");
        cmd.env("HOME", self.home())
            .env("XDG_CONFIG_HOME", self.home().join(".config"))
            .env(ENV_CONFIG, self.config_path())
            .env(ENV_SETTINGS, self.settings_path())
            .env("NO_COLOR", "1")
            .env_remove("MODELMETER_LOG")
            .env_remove("MODELMETER_LOG_FORMAT")
            .env_remove("MODELMETER_LOG_FILE")
            .env_remove("RUST_LOG");
        cmd
    }
}

/// Command payload with both percents set.
pub fn percent_payload(session: f64, weekly: f64) -> String {
    json!({ "sessionPercent": session, "weeklyPercent": weekly }).to_string()
}
