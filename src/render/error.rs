//! Error rendering for modelmeter.
//!
//! Human mode prints the error code, message and a one-line hint to stderr.
//! JSON mode prints a structured object for machine consumption.

use colored::Colorize;
use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::error::MeterError;

/// Render an error for the chosen output format.
#[must_use]
pub fn render_error(error: &MeterError, format: OutputFormat, no_color: bool, pretty: bool) -> String {
    match format {
        OutputFormat::Json => render_error_json(error, pretty),
        OutputFormat::Human => render_simple(error, no_color),
    }
}

/// Render error as structured JSON.
#[must_use]
pub fn render_error_json(error: &MeterError, pretty: bool) -> String {
    let error_json = ErrorJson::from_error(error);
    let rendered = if pretty {
        serde_json::to_string_pretty(&error_json)
    } else {
        serde_json::to_string(&error_json)
    };
    rendered.unwrap_or_else(|_| render_simple(error, true))
}

fn render_simple(error: &MeterError, no_color: bool) -> String {
    let header = format!("Error [{}]: {}", error.error_code(), error);
    let hint = format!("Hint: {}", error.hint());

    if no_color {
        format!("{header}\n{hint}")
    } else {
        format!("{}\n{}", header.red().bold(), hint.dimmed())
    }
}

/// JSON representation of an error.
#[derive(Serialize)]
struct ErrorJson {
    error_code: &'static str,
    category: String,
    message: String,
    hint: &'static str,
    exit_code: i32,
}

impl ErrorJson {
    fn from_error(error: &MeterError) -> Self {
        Self {
            error_code: error.error_code(),
            category: error.category().to_string(),
            message: error.to_string(),
            hint: error.hint(),
            exit_code: error.exit_code().into(),
        }
    }
}
