//! Storage for usage configuration, app settings, and paths.

pub mod config;
pub mod paths;
pub mod settings;

pub use config::{ConfigStore, MeterConfig, SourceMode};
pub use paths::{AppPaths, ENV_CONFIG, ENV_SETTINGS};
pub use settings::{NotificationSettings, PollInterval, Settings};
