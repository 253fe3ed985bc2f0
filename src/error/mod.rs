//! Error types for modelmeter.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Fetch errors fall into four groups that the usage store reports per
//! provider as plain strings:
//! - **Configuration**: no command or usage path configured, invalid settings
//! - **Process**: the configured command exited non-zero or timed out
//! - **Payload**: the command output or usage file could not be understood
//! - **Source**: no usage file could be located
//!
//! Everything else (I/O, JSON, unexpected) is **Internal**.
//!
//! Each error has a stable error code (e.g., `MM-C001`) for programmatic handling.

use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing or invalid configuration.
    Configuration,
    /// External command failures (non-zero exit, timeout, spawn failure).
    Process,
    /// Unparsable or incomplete usage payloads.
    Payload,
    /// Usage source could not be located.
    Source,
    /// Internal errors (I/O, bugs, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Configuration => "Configuration error",
            Self::Process => "Process error",
            Self::Payload => "Payload error",
            Self::Source => "Source error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Configuration => "C",
            Self::Process => "P",
            Self::Payload => "D",
            Self::Source => "S",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes for the `modelmeter` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Nothing configured or nothing to read
    NotConfigured = 2,
    /// Parse/format errors
    ParseError = 3,
    /// Timeout
    Timeout = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as Self
    }
}

/// Main error type for modelmeter operations.
#[derive(Error, Debug)]
pub enum MeterError {
    // ==========================================================================
    // Fetch errors
    // ==========================================================================
    /// No command or usage path configured for the provider.
    #[error("{0}")]
    MissingConfiguration(String),

    /// External command exited non-zero. The message is its stderr.
    #[error("{0}")]
    ProcessFailure(String),

    /// Output or file contents were not valid usage data.
    #[error("{0}")]
    InvalidPayload(String),

    /// No usage file could be located.
    #[error("{0}")]
    SourceNotFound(String),

    /// External command did not finish in time.
    #[error("command timed out after {0} seconds")]
    Timeout(u64),

    /// Some providers could not be refreshed.
    #[error("{failed} provider(s) failed to refresh")]
    PartialFailure { failed: usize },

    // ==========================================================================
    // Configuration errors
    // ==========================================================================
    /// Invalid configuration or settings file.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unknown provider name.
    #[error("invalid provider: {0}")]
    InvalidProvider(String),

    // ==========================================================================
    // Internal errors
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MeterError {
    /// Map error to a process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::MissingConfiguration(_) | Self::SourceNotFound(_) => ExitCode::NotConfigured,
            Self::InvalidPayload(_) | Self::Config(_) | Self::InvalidProvider(_) | Self::Json(_) => {
                ExitCode::ParseError
            }
            Self::Timeout(_) => ExitCode::Timeout,
            Self::ProcessFailure(_) | Self::PartialFailure { .. } | Self::Io(_) | Self::Other(_) => {
                ExitCode::GeneralError
            }
        }
    }

    /// Returns the error category for classification.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingConfiguration(_) | Self::Config(_) | Self::InvalidProvider(_) => {
                ErrorCategory::Configuration
            }
            Self::ProcessFailure(_) | Self::Timeout(_) | Self::PartialFailure { .. } => {
                ErrorCategory::Process
            }
            Self::InvalidPayload(_) => ErrorCategory::Payload,
            Self::SourceNotFound(_) => ErrorCategory::Source,
            Self::Io(_) | Self::Json(_) | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `MM-{category}{number}`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingConfiguration(_) => "MM-C001",
            Self::Config(_) => "MM-C002",
            Self::InvalidProvider(_) => "MM-C003",
            Self::ProcessFailure(_) => "MM-P001",
            Self::Timeout(_) => "MM-P002",
            Self::PartialFailure { .. } => "MM-P003",
            Self::InvalidPayload(_) => "MM-D001",
            Self::SourceNotFound(_) => "MM-S001",
            Self::Io(_) => "MM-X001",
            Self::Json(_) => "MM-X002",
            Self::Other(_) => "MM-X099",
        }
    }

    /// A one-line remediation hint shown under the error in human output.
    #[must_use]
    pub const fn hint(&self) -> &'static str {
        match self {
            Self::MissingConfiguration(_) => {
                "Set claudeCommand/codexCommand (or providerCommand) in the usage config."
            }
            Self::ProcessFailure(_) | Self::Timeout(_) => {
                "Run the configured command by hand to see its output."
            }
            Self::InvalidPayload(_) | Self::Json(_) => {
                "The usage source returned data in an unexpected shape."
            }
            Self::SourceNotFound(_) => {
                "Set usageFilePath in the usage config or switch source to \"command\"."
            }
            Self::Config(_) | Self::InvalidProvider(_) => "Run `modelmeter config show` to inspect settings.",
            Self::PartialFailure { .. } | Self::Io(_) | Self::Other(_) => {
                "Run `modelmeter doctor` to check your setup."
            }
        }
    }
}

/// Result type alias for modelmeter operations.
pub type Result<T> = std::result::Result<T, MeterError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_errors_display_message_verbatim() {
        let err = MeterError::ProcessFailure("boom: not logged in".to_string());
        assert_eq!(err.to_string(), "boom: not logged in");

        let err = MeterError::SourceNotFound("No usage file found.".to_string());
        assert_eq!(err.to_string(), "No usage file found.");
    }

    #[test]
    fn fetch_errors_have_expected_categories() {
        assert_eq!(
            MeterError::MissingConfiguration(String::new()).category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            MeterError::ProcessFailure(String::new()).category(),
            ErrorCategory::Process
        );
        assert_eq!(MeterError::Timeout(30).category(), ErrorCategory::Process);
        assert_eq!(
            MeterError::InvalidPayload(String::new()).category(),
            ErrorCategory::Payload
        );
        assert_eq!(
            MeterError::SourceNotFound(String::new()).category(),
            ErrorCategory::Source
        );
    }

    #[test]
    fn error_codes_are_unique() {
        use std::collections::HashSet;

        let codes = [
            MeterError::MissingConfiguration(String::new()).error_code(),
            MeterError::ProcessFailure(String::new()).error_code(),
            MeterError::InvalidPayload(String::new()).error_code(),
            MeterError::SourceNotFound(String::new()).error_code(),
            MeterError::Timeout(1).error_code(),
            MeterError::Config(String::new()).error_code(),
            MeterError::InvalidProvider(String::new()).error_code(),
            MeterError::Other(anyhow::anyhow!("x")).error_code(),
        ];

        let unique: HashSet<_> = codes.iter().collect();
        assert_eq!(codes.len(), unique.len());
        assert!(codes.iter().all(|c| c.starts_with("MM-")));
    }

    #[test]
    fn exit_codes_follow_category() {
        assert_eq!(
            MeterError::MissingConfiguration(String::new()).exit_code(),
            ExitCode::NotConfigured
        );
        assert_eq!(MeterError::Timeout(5).exit_code(), ExitCode::Timeout);
        assert_eq!(
            MeterError::InvalidPayload(String::new()).exit_code(),
            ExitCode::ParseError
        );
        assert_eq!(i32::from(ExitCode::GeneralError), 1);
    }
}
