//! Core data models, usage sources, and the refresh engine.

pub mod alerts;
pub mod cli_runner;
pub mod command_source;
pub mod connector;
pub mod doctor;
pub mod file_watcher;
pub mod logging;
pub mod models;
pub mod provider;
pub mod refresh;
pub mod store;
pub mod thresholds;
pub mod usage_file;

pub use alerts::{NotificationSink, ThresholdAlert, ThresholdNotifier, TracingSink};
pub use command_source::CommandUsageSource;
pub use connector::{AuthMode, LocalCliConnector, UsageProviderConnector, ValidationResult};
pub use doctor::{CheckStatus, DiagnosticCheck, DoctorReport, ProviderHealth};
pub use file_watcher::{FileChange, UsageFileWatcher};
pub use models::{UsageMetric, UsagePercentLimitConfig, UsageSnapshot};
pub use provider::Provider;
pub use refresh::UsageRefreshActor;
pub use store::{RefreshOutcome, StoreView, UsageStore};
pub use thresholds::{ThresholdGate, UsageStatus};
