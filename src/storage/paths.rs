//! Application paths for config, settings, and usage sources.

use directories::{BaseDirs, ProjectDirs};
use std::path::{Path, PathBuf};

/// Environment variable to override the usage config file path.
pub const ENV_CONFIG: &str = "MODELMETER_CONFIG";
/// Environment variable to override the settings file path.
pub const ENV_SETTINGS: &str = "MODELMETER_SETTINGS";

/// Application paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Home directory.
    pub home: PathBuf,
    /// Platform configuration directory (settings live here).
    pub config: PathBuf,
}

impl AppPaths {
    /// Create paths for the modelmeter application.
    #[must_use]
    pub fn new() -> Self {
        let home = home_dir();
        let config = ProjectDirs::from("dev", "modelmeter", "modelmeter").map_or_else(
            || home.join(".config/modelmeter"),
            |dirs| dirs.config_dir().to_path_buf(),
        );
        Self { home, config }
    }

    /// Paths rooted at an explicit home directory (tests, sandboxes).
    #[must_use]
    pub fn with_home(home: &Path) -> Self {
        Self {
            home: home.to_path_buf(),
            config: home.join(".config/modelmeter"),
        }
    }

    /// Usage config file (`~/.modelmeter/config.json`), honoring `MODELMETER_CONFIG`.
    #[must_use]
    pub fn usage_config_file(&self) -> PathBuf {
        env_path(ENV_CONFIG).unwrap_or_else(|| self.home.join(".modelmeter").join("config.json"))
    }

    /// App settings file, honoring `MODELMETER_SETTINGS`.
    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        env_path(ENV_SETTINGS).unwrap_or_else(|| self.config.join("settings.toml"))
    }

    /// Default usage cache candidates, in lookup order.
    #[must_use]
    pub fn usage_file_candidates(&self) -> Vec<PathBuf> {
        vec![self.home.join(".claude").join("stats-cache.json")]
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn home_dir() -> PathBuf {
    BaseDirs::new().map_or_else(|| PathBuf::from("."), |d| d.home_dir().to_path_buf())
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
