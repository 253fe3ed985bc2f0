//! Number formatting utilities.

/// Format a percentage with no decimals.
#[must_use]
pub fn format_percent(value: f64) -> String {
    format!("{value:.0}%")
}

/// Format a usage amount compactly ("1.5M", "12.5K", "500").
#[must_use]
pub fn format_amount(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        format!("{value:.0}")
    }
}

/// Format a percentage of a token limit as "<used> of <limit> tokens".
#[must_use]
pub fn format_absolute(used_percent: f64, limit: f64) -> String {
    let used = used_percent / 100.0 * limit;
    format!("{} of {} tokens", format_amount(used), format_amount(limit))
}
