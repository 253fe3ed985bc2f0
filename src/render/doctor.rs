//! Doctor command output rendering.
//!
//! Renders diagnostic reports for human and machine consumption.

use colored::Colorize;
use std::time::Instant;
use tracing::Level;

use super::robot::{self, RobotOutput};
use crate::core::doctor::{CheckStatus, DiagnosticCheck, DoctorReport, ProviderHealth};
use crate::error::Result;

// =============================================================================
// Human-Readable Output
// =============================================================================

/// Render a doctor report for human consumption.
#[must_use]
pub fn render_human(report: &DoctorReport, no_color: bool) -> String {
    let start = tracing::enabled!(Level::DEBUG).then(Instant::now);
    let mut output = String::new();

    output.push_str(&render_header(report, no_color));
    output.push_str("\n\n");

    output.push_str(&render_section_header("Setup", no_color));
    output.push('\n');
    output.push_str(&render_check(&report.config_status, no_color));
    output.push('\n');
    output.push_str(&render_check(&report.settings_status, no_color));
    output.push_str("\n\n");

    if !report.providers.is_empty() {
        output.push_str(&render_section_header("Providers", no_color));
        output.push('\n');
        for health in &report.providers {
            output.push_str(&render_provider_health(health, no_color));
            output.push('\n');
        }
        output.push('\n');
    }

    output.push_str(&render_summary(report, no_color));

    if let Some(start) = start {
        tracing::debug!(
            component = "doctor_report",
            render_time_ms = start.elapsed().as_millis(),
            "Rendered doctor report"
        );
    }

    output
}

fn render_header(report: &DoctorReport, no_color: bool) -> String {
    let title = format!("modelmeter doctor (v{})", report.version);
    if no_color {
        title
    } else {
        title.bold().cyan().to_string()
    }
}

fn render_section_header(title: &str, no_color: bool) -> String {
    if no_color {
        title.to_string()
    } else {
        title.bold().to_string()
    }
}

fn render_provider_health(health: &ProviderHealth, no_color: bool) -> String {
    let mut lines = vec![format!(
        "{} ({} source)",
        health.provider.display_name(),
        health.source
    )];
    lines.push(render_check(&health.environment, no_color));
    if let Some(fetch) = &health.fetch {
        lines.push(render_check(fetch, no_color));
    }
    lines.join("\n")
}

fn render_check(check: &DiagnosticCheck, no_color: bool) -> String {
    let icon = status_icon(&check.status, no_color);
    let timing = check
        .duration
        .map(|d| format!(" ({}ms)", d.as_millis()))
        .unwrap_or_default();

    let mut line = match &check.status {
        CheckStatus::Pass { details: Some(details) } => {
            format!("  {icon} {}: {details}{timing}", check.name)
        }
        CheckStatus::Pass { details: None } => format!("  {icon} {}{timing}", check.name),
        CheckStatus::Warning { details, .. } => {
            format!("  {icon} {}: {details}{timing}", check.name)
        }
        CheckStatus::Fail { reason, .. } => format!("  {icon} {}: {reason}{timing}", check.name),
        CheckStatus::Skipped { reason } => format!("  {icon} {}: skipped ({reason})", check.name),
    };

    if let CheckStatus::Warning {
        suggestion: Some(suggestion),
        ..
    }
    | CheckStatus::Fail {
        suggestion: Some(suggestion),
        ..
    } = &check.status
    {
        line.push_str(&format!("\n      → {suggestion}"));
    }

    line
}

fn status_icon(status: &CheckStatus, no_color: bool) -> String {
    let (icon, color): (&str, fn(&str) -> colored::ColoredString) = match status {
        CheckStatus::Pass { .. } => ("✓", |s| s.green()),
        CheckStatus::Warning { .. } => ("!", |s| s.yellow()),
        CheckStatus::Fail { .. } => ("✗", |s| s.red()),
        CheckStatus::Skipped { .. } => ("-", |s| s.dimmed()),
    };
    if no_color {
        icon.to_string()
    } else {
        color(icon).to_string()
    }
}

fn render_summary(report: &DoctorReport, no_color: bool) -> String {
    let (ready, needs_attention) = report.summary();
    let text = format!(
        "Summary: {ready} provider(s) ready, {needs_attention} need attention ({}ms)",
        report.total_duration.as_millis()
    );

    match (no_color, needs_attention) {
        (true, _) => text,
        (false, 0) => text.green().to_string(),
        (false, _) => text.yellow().to_string(),
    }
}

// =============================================================================
// JSON Output
// =============================================================================

/// Render a doctor report as JSON.
pub fn render_json(report: &DoctorReport, pretty: bool) -> Result<String> {
    robot::render_json(&RobotOutput::new("doctor", report), pretty)
}
