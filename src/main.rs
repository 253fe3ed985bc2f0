//! modelmeter - usage meter for local model CLIs
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::process::ExitCode;

use modelmeter::cli::{Cli, Commands};
use modelmeter::core::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = cli
        .log_level
        .as_deref()
        .and_then(logging::LogLevel::from_arg)
        .or_else(logging::parse_log_level_from_env)
        .unwrap_or_default();
    let log_format = if cli.json_output {
        logging::LogFormat::Json
    } else {
        logging::parse_log_format_from_env().unwrap_or_default()
    };
    let log_file = logging::parse_log_file_from_env();
    logging::init(log_level, log_format, log_file, cli.verbose);

    let format = cli.effective_format();
    let no_color = !modelmeter::util::env::should_use_color(cli.no_color);
    let stderr_no_color =
        !modelmeter::util::env::color_allowed(cli.no_color, modelmeter::util::env::stderr_is_tty());
    let pretty = cli.pretty;

    match run(cli, no_color).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %e, code = e.error_code(), "Command failed");
            let error_output =
                modelmeter::render::error::render_error(&e, format, stderr_no_color, pretty);
            eprintln!("{error_output}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(cli: Cli, no_color: bool) -> modelmeter::Result<()> {
    let format = cli.effective_format();
    let pretty = cli.pretty;

    match cli.command {
        None => {
            print_quickstart();
            Ok(())
        }

        Some(Commands::Usage(args)) => {
            modelmeter::cli::usage::execute(&args, format, pretty, no_color).await
        }

        Some(Commands::Watch(args)) => {
            modelmeter::cli::watch::execute(&args, format, pretty, no_color).await
        }

        Some(Commands::Doctor(args)) => {
            modelmeter::cli::doctor::execute(&args, format, pretty, no_color).await
        }

        Some(Commands::Config(cmd)) => modelmeter::cli::config::execute(&cmd, format, pretty),
    }
}

/// Print quickstart help when no command is given.
fn print_quickstart() {
    println!(
        r#"modelmeter - usage meter for local model CLIs

Track Claude and Codex quota usage from a command or a local stats cache.

USAGE:
    modelmeter [OPTIONS] <COMMAND>

COMMANDS:
    usage     Refresh and show usage once
    watch     Poll usage continuously and raise threshold alerts
    doctor    Diagnose usage sources and configuration
    config    Inspect configuration

QUICK START:
    modelmeter usage                      # Both providers
    modelmeter usage --provider codex     # One provider
    modelmeter watch --interval 60        # Poll every minute
    modelmeter doctor --probe             # Check setup and run a live fetch

ROBOT MODE:
    modelmeter usage --json               # JSON output

For more help: modelmeter --help
"#
    );
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
}
