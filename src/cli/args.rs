//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};

/// Model usage meter - track Claude and Codex quota consumption.
#[derive(Parser, Debug)]
#[command(name = "modelmeter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    // === Global flags ===
    /// Output format
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log level
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Resolve the effective output format.
    #[must_use]
    pub fn effective_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Refresh and show usage once
    Usage(UsageArgs),

    /// Poll usage continuously and raise threshold alerts
    Watch(WatchArgs),

    /// Diagnose usage sources and configuration
    Doctor(DoctorArgs),

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Arguments for the `usage` command.
#[derive(Parser, Debug)]
pub struct UsageArgs {
    /// Provider to query (claude, codex, or "both")
    #[arg(long, value_name = "PROVIDER", default_value = "both")]
    pub provider: String,
}

/// Arguments for the `watch` command.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Provider to poll (defaults to the one selected in settings)
    #[arg(long, value_name = "PROVIDER")]
    pub provider: Option<String>,

    /// Seconds between polls (defaults to the settings value)
    #[arg(long, value_name = "SECONDS")]
    pub interval: Option<f64>,

    /// Seconds after which unchanged source data counts as stale
    #[arg(long, value_name = "SECONDS")]
    pub stale_after: Option<u64>,
}

impl WatchArgs {
    /// Validate argument combinations.
    ///
    /// # Errors
    ///
    /// Returns [`MeterError::Config`](crate::error::MeterError::Config) for a
    /// non-positive or non-finite interval.
    pub fn validate(&self) -> crate::error::Result<()> {
        if let Some(interval) = self.interval {
            if !interval.is_finite() || interval <= 0.0 {
                return Err(crate::error::MeterError::Config(
                    "Watch interval must be greater than 0 seconds".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Arguments for the `doctor` command.
#[derive(Parser, Debug)]
pub struct DoctorArgs {
    /// Only check specific provider(s)
    #[arg(short, long, value_name = "PROVIDER")]
    pub provider: Option<Vec<String>>,

    /// Also run a live fetch for each provider that passes setup checks
    #[arg(long)]
    pub probe: bool,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the config and settings file locations
    Path,

    /// Print the loaded usage config and settings
    Show,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable colored output
    #[default]
    Human,
    /// JSON output for scripts
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_overrides_format() {
        let cli = Cli::parse_from(["modelmeter", "--json", "usage"]);
        assert_eq!(cli.effective_format(), OutputFormat::Json);

        let cli = Cli::parse_from(["modelmeter", "usage"]);
        assert_eq!(cli.effective_format(), OutputFormat::Human);
    }

    #[test]
    fn usage_defaults_to_both_providers() {
        let cli = Cli::parse_from(["modelmeter", "usage"]);
        let Some(Commands::Usage(args)) = cli.command else {
            panic!("expected usage command");
        };
        assert_eq!(args.provider, "both");
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["modelmeter", "doctor", "--probe", "--no-color", "-v"]);
        assert!(cli.no_color);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Commands::Doctor(DoctorArgs { probe: true, .. }))));
    }

    #[test]
    fn watch_interval_must_be_positive() {
        let cli = Cli::parse_from(["modelmeter", "watch", "--interval", "0"]);
        let Some(Commands::Watch(args)) = cli.command else {
            panic!("expected watch command");
        };
        assert!(args.validate().is_err());

        let cli = Cli::parse_from(["modelmeter", "watch", "--interval", "2.5"]);
        let Some(Commands::Watch(args)) = cli.command else {
            panic!("expected watch command");
        };
        assert!(args.validate().is_ok());
    }

    #[test]
    fn config_subcommands_parse() {
        let cli = Cli::parse_from(["modelmeter", "config", "show"]);
        assert!(matches!(cli.command, Some(Commands::Config(ConfigCommand::Show))));
    }
}
