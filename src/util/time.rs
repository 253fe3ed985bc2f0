//! Time helpers: default reset boundaries and human formatting.

use chrono::{DateTime, Datelike, Days, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

// =============================================================================
// Reset Schedule
// =============================================================================

/// Next local midnight strictly after `now`.
#[must_use]
pub fn next_midnight(now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    next_midnight_in(&now.with_timezone(&Local)).map(|at| at.with_timezone(&Utc))
}

/// Next local Monday 00:00 strictly after `now`.
#[must_use]
pub fn next_week_start(now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    next_week_start_in(&now.with_timezone(&Local)).map(|at| at.with_timezone(&Utc))
}

/// Next midnight after `now` in `now`'s own time zone.
#[must_use]
pub fn next_midnight_in<Tz: TimeZone>(now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let tomorrow = now.date_naive().checked_add_days(Days::new(1))?;
    start_of_day(&now.timezone(), tomorrow)
}

/// Next Monday 00:00 after `now` in `now`'s own time zone.
///
/// On a Monday this is the following Monday.
#[must_use]
pub fn next_week_start_in<Tz: TimeZone>(now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let days_ahead = 7 - u64::from(now.weekday().num_days_from_monday());
    let monday = now.date_naive().checked_add_days(Days::new(days_ahead))?;
    start_of_day(&now.timezone(), monday)
}

/// First instant of `date` in `tz`. Falls back to 01:00 when midnight is
/// skipped by a DST transition.
fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    let midnight: NaiveDateTime = date.and_hms_opt(0, 0, 0)?;
    tz.from_local_datetime(&midnight).earliest().or_else(|| {
        let one_am = date.and_hms_opt(1, 0, 0)?;
        tz.from_local_datetime(&one_am).earliest()
    })
}

// =============================================================================
// Formatting
// =============================================================================

/// Format a countdown to a future time.
#[must_use]
pub fn format_countdown(target: DateTime<Utc>) -> String {
    format_countdown_from(target, Utc::now())
}

fn format_countdown_from(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = target.signed_duration_since(now);

    if duration.num_seconds() <= 0 {
        return "now".to_string();
    }

    let hours = duration.num_hours();
    let minutes = duration.num_minutes() % 60;

    if hours > 24 {
        let days = hours / 24;
        format!("in {days} day{}", if days == 1 { "" } else { "s" })
    } else if hours > 0 {
        format!("in {hours}h {minutes}m")
    } else if minutes > 0 {
        format!("in {minutes}m")
    } else {
        let seconds = duration.num_seconds();
        format!("in {seconds}s")
    }
}

/// Format how long ago `target` was.
#[must_use]
pub fn format_age(target: DateTime<Utc>) -> String {
    let seconds = Utc::now().signed_duration_since(target).num_seconds().max(0);

    match seconds {
        0..60 => "just now".to_string(),
        60..3_600 => format!("{}m ago", seconds / 60),
        3_600..86_400 => format!("{}h ago", seconds / 3_600),
        _ => format!("{}d ago", seconds / 86_400),
    }
}
