//! Supported providers.

use serde::{Deserialize, Serialize};

use crate::error::{MeterError, Result};

// =============================================================================
// Provider Enum
// =============================================================================

/// Coding assistants whose local usage data modelmeter tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Claude,
    Codex,
}

impl Provider {
    /// All providers in display order.
    pub const ALL: &'static [Self] = &[Self::Claude, Self::Codex];

    /// CLI name for this provider.
    #[must_use]
    pub const fn cli_name(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Codex => "codex",
        }
    }

    /// Display name for human output.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Claude => "Claude",
            Self::Codex => "Codex",
        }
    }

    /// Title used for threshold notifications.
    #[must_use]
    pub const fn notification_title(self) -> &'static str {
        match self {
            Self::Claude => "Claude Code",
            Self::Codex => "Codex",
        }
    }

    /// Parse from CLI argument.
    ///
    /// # Errors
    ///
    /// Returns [`MeterError::InvalidProvider`] for unknown names.
    pub fn from_cli_name(name: &str) -> Result<Self> {
        let lower = name.trim().to_lowercase();
        Self::ALL
            .iter()
            .find(|p| p.cli_name() == lower)
            .copied()
            .ok_or_else(|| MeterError::InvalidProvider(name.to_string()))
    }

    /// Parse a provider selection argument (single name or "both"/"all").
    ///
    /// # Errors
    ///
    /// Returns [`MeterError::InvalidProvider`] for unknown names.
    pub fn parse_selection(arg: &str) -> Result<Vec<Self>> {
        match arg.trim().to_lowercase().as_str() {
            "both" | "all" => Ok(Self::ALL.to_vec()),
            name => Ok(vec![Self::from_cli_name(name)?]),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.cli_name())
    }
}
