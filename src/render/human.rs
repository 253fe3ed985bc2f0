//! Human-readable output using `colored`.
//!
//! One block per provider: a bar per usage window, reset countdowns, and
//! either freshness or the last error.

use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};

use super::{UsageReport, is_file_backed};
use crate::core::models::{UsageMetric, UsageSnapshot};
use crate::core::thresholds::UsageStatus;
use crate::util::{format_absolute, format_age, format_countdown, format_percent};

const BAR_WIDTH: usize = 16;

/// Render usage reports for human consumption.
#[must_use]
pub fn render_usage(reports: &[UsageReport], no_color: bool) -> String {
    render_usage_at(reports, no_color, Utc::now())
}

/// [`render_usage`] with an explicit clock for the freshness line.
#[must_use]
pub fn render_usage_at(reports: &[UsageReport], no_color: bool, now: DateTime<Utc>) -> String {
    let mut output = String::new();

    for report in reports {
        output.push_str(&render_report(report, no_color, now));
        output.push('\n');
    }

    output
}

fn render_report(report: &UsageReport, no_color: bool, now: DateTime<Utc>) -> String {
    let mut lines = Vec::new();
    lines.push(paint(report.provider.display_name(), no_color, |s| s.bold().cyan()));

    if let Some(snapshot) = &report.snapshot {
        for metric in UsageMetric::ALL {
            lines.push(format!("  {}", metric_line(snapshot, *metric, no_color)));
        }

        if report.is_stale {
            lines.push(format!(
                "  {}",
                paint(&stale_text(snapshot.source_mtime, now), no_color, |s| s.yellow())
            ));
        } else {
            let age = report.last_refresh.unwrap_or(snapshot.updated_at);
            lines.push(format!(
                "  {}",
                paint(&format!("Updated {}", format_age(age)), no_color, |s| s.dimmed())
            ));
        }
    }

    if let Some(error) = &report.error {
        lines.push(format!(
            "  {}",
            paint(&format!("Error: {error}"), no_color, |s| s.red())
        ));
        if let Some(hint) = &report.hint {
            lines.push(format!("  {}", paint(hint, no_color, |s| s.dimmed())));
        }
    }

    if report.snapshot.is_none() && report.error.is_none() {
        lines.push(format!(
            "  {}",
            paint("No usage data yet", no_color, |s| s.dimmed())
        ));
    }

    lines.join("\n")
}

fn metric_line(snapshot: &UsageSnapshot, metric: UsageMetric, no_color: bool) -> String {
    let label = format!("{:<8}", metric.label());

    let Some(percent) = snapshot.used_percent(metric) else {
        return format!("{label}{}", paint("--", no_color, |s| s.dimmed()));
    };

    let status = UsageStatus::from_percent(percent);
    let mut line = format!(
        "{label}{:>4}  {}",
        format_percent(percent),
        paint(&usage_bar(percent), no_color, |s| status_color(s, status))
    );

    if let Some(reset_at) = snapshot.reset_at(metric) {
        line.push_str(&format!("  resets {}", format_countdown(reset_at)));
    }

    let limit = match metric {
        UsageMetric::Session => snapshot.session_limit_value(),
        UsageMetric::Weekly => snapshot.weekly_limit_value(),
    };
    if let Some(limit) = limit.filter(|_| is_file_backed(snapshot)) {
        line.push_str(&format!("  ({})", format_absolute(percent, limit)));
    }

    line
}

/// Fixed-width bar for a percentage in `[0, 100]`.
fn usage_bar(percent: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}]",
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH - filled)
    )
}

/// "Last updated Nm ago", never less than a minute.
fn stale_text(source_mtime: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now.signed_duration_since(source_mtime).num_seconds() / 60).max(1);
    format!("Last updated {minutes}m ago")
}

fn status_color(text: ColoredString, status: UsageStatus) -> ColoredString {
    match status {
        UsageStatus::Normal => text.green(),
        UsageStatus::Warning => text.yellow(),
        UsageStatus::Critical => text.red(),
    }
}

fn paint(text: &str, no_color: bool, style: impl FnOnce(ColoredString) -> ColoredString) -> String {
    if no_color {
        text.to_string()
    } else {
        style(text.normal()).to_string()
    }
}
