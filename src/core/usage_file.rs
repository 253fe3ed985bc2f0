//! File usage strategy.
//!
//! Derives usage from a local stats cache (by default
//! `~/.claude/stats-cache.json`). The cache holds one entry per day, either
//! per-model token tallies or message counts:
//!
//! ```json
//! {
//!   "dailyModelTokens": [{ "date": "2026-03-10", "tokensByModel": { "opus": 1200, "sonnet": 300 } }],
//!   "dailyActivity":    [{ "date": "2026-03-10", "messageCount": 42 }]
//! }
//! ```
//!
//! Session usage is the latest day's total; weekly usage is the sum of the
//! seven calendar days ending on that latest day.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Deserialize;

use super::models::{UsagePercentLimitConfig, UsageSnapshot};
use crate::error::{MeterError, Result};
use crate::storage::AppPaths;
use crate::util::time::{next_midnight, next_week_start};

// =============================================================================
// Locator
// =============================================================================

/// Where a usage file was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageFileOrigin {
    /// The configured `usageFilePath`.
    Override,
    /// The default Claude stats cache.
    ClaudeStatsCache,
}

impl UsageFileOrigin {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Override => "override",
            Self::ClaudeStatsCache => "claude-stats-cache",
        }
    }
}

/// A located usage file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedUsageFile {
    pub path: PathBuf,
    pub origin: UsageFileOrigin,
}

/// Find the usage file: the override path if it exists, else the first
/// existing default candidate.
#[must_use]
pub fn locate(override_path: Option<&str>, paths: &AppPaths) -> Option<LocatedUsageFile> {
    if let Some(raw) = override_path.map(str::trim).filter(|p| !p.is_empty()) {
        let path = PathBuf::from(raw);
        if path.is_file() {
            return Some(LocatedUsageFile {
                path,
                origin: UsageFileOrigin::Override,
            });
        }
        tracing::debug!(path = raw, "Configured usage file does not exist");
    }

    paths
        .usage_file_candidates()
        .into_iter()
        .find(|candidate| candidate.is_file())
        .map(|path| LocatedUsageFile {
            path,
            origin: UsageFileOrigin::ClaudeStatsCache,
        })
}

// =============================================================================
// Reader
// =============================================================================

/// Read and parse a located usage file.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read, or
/// [`MeterError::InvalidPayload`] if its contents are not usable.
pub fn read_usage_file(path: &Path, limits: UsagePercentLimitConfig) -> Result<UsageSnapshot> {
    let data = fs::read(path)?;
    let mtime = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_or_else(|_| Utc::now(), DateTime::<Utc>::from);
    parse_stats_cache(&data, path, mtime, limits, Utc::now())
}

/// Parse stats cache bytes into a snapshot, as of `now`.
///
/// # Errors
///
/// Returns [`MeterError::InvalidPayload`] if the JSON is malformed or has no
/// dated daily entries.
pub fn parse_stats_cache(
    data: &[u8],
    source_path: &Path,
    source_mtime: DateTime<Utc>,
    limits: UsagePercentLimitConfig,
    now: DateTime<Utc>,
) -> Result<UsageSnapshot> {
    let stats: StatsCache = serde_json::from_slice(data)
        .map_err(|e| MeterError::InvalidPayload(format!("Unsupported usage file format: {e}")))?;

    let mut totals = stats.daily_totals();
    totals.sort_by_key(|day| day.date);
    let Some(latest) = totals.last().copied() else {
        return Err(MeterError::InvalidPayload(
            "No daily usage entries found.".to_string(),
        ));
    };

    let week_start = latest
        .date
        .checked_sub_days(Days::new(6))
        .ok_or_else(|| MeterError::InvalidPayload("Invalid date in usage file.".to_string()))?;
    let weekly_total: f64 = totals
        .iter()
        .filter(|day| day.date >= week_start)
        .map(|day| day.total)
        .sum();

    let session_limit = Some(limits.session_limit_percent).filter(|l| *l > 0.0);
    let weekly_limit = Some(limits.weekly_limit_percent).filter(|l| *l > 0.0);

    Ok(UsageSnapshot {
        session_used: latest.total,
        weekly_used: weekly_total,
        session_limit,
        weekly_limit,
        session_used_percent: session_limit.map(|limit| percent_of(latest.total, limit)),
        weekly_used_percent: weekly_limit.map(|limit| percent_of(weekly_total, limit)),
        session_reset_at: next_midnight(now),
        weekly_reset_at: next_week_start(now),
        updated_at: now,
        source_path: source_path.to_path_buf(),
        source_mtime,
    })
}

fn percent_of(used: f64, limit: f64) -> f64 {
    (used * 100.0 / limit).clamp(0.0, 100.0)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsCache {
    #[serde(default)]
    daily_activity: Vec<DailyActivity>,
    #[serde(default)]
    daily_model_tokens: Vec<DailyModelTokens>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DailyActivity {
    date: String,
    message_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DailyModelTokens {
    date: String,
    tokens_by_model: Option<HashMap<String, u64>>,
}

#[derive(Debug, Clone, Copy)]
struct DailyTotal {
    date: NaiveDate,
    total: f64,
}

impl StatsCache {
    /// Token tallies win over message counts when both are present.
    #[allow(clippy::cast_precision_loss)]
    fn daily_totals(&self) -> Vec<DailyTotal> {
        if !self.daily_model_tokens.is_empty() {
            return self
                .daily_model_tokens
                .iter()
                .filter_map(|entry| {
                    let date = parse_date(&entry.date)?;
                    let total: u64 = entry.tokens_by_model.iter().flat_map(HashMap::values).sum();
                    Some(DailyTotal {
                        date,
                        total: total as f64,
                    })
                })
                .collect();
        }

        self.daily_activity
            .iter()
            .filter_map(|entry| {
                let date = parse_date(&entry.date)?;
                Some(DailyTotal {
                    date,
                    total: entry.message_count.unwrap_or(0) as f64,
                })
            })
            .collect()
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}
