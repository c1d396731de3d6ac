use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChurnmapError;

/// Author name of the GitHub automation account.
///
/// Rows carrying this author are dropped by every commit source and again by
/// the bus-factor detector.
pub const BOT_AUTHOR: &str = "GitHub";

/// Canonical format for stored commit timestamps (UTC, second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One row of the commit table: a single file touched by a single commit.
///
/// The timestamp is kept as the stored text so that malformed rows surface
/// when they are aggregated, not when they are loaded.
///
/// # Examples
///
/// ```
/// use churnmap_core::CommitRecord;
///
/// let row = CommitRecord::new("abc12345", "2024-03-01T12:30:00", "alice", "src/lib.rs");
/// assert_eq!(row.author, "alice");
/// assert!(row.timestamp_utc().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    /// Abbreviated commit hash.
    pub commit_hash: String,
    /// Commit time as ISO-8601 text.
    pub timestamp: String,
    /// Author name.
    pub author: String,
    /// Path of the touched file, relative to the repository root.
    pub file: String,
    /// Lines added to the file by this commit.
    pub lines_added: u64,
    /// Lines removed from the file by this commit.
    pub lines_removed: u64,
}

impl CommitRecord {
    /// Build a row with zero line counts.
    pub fn new(
        commit_hash: impl Into<String>,
        timestamp: impl Into<String>,
        author: impl Into<String>,
        file: impl Into<String>,
    ) -> Self {
        Self {
            commit_hash: commit_hash.into(),
            timestamp: timestamp.into(),
            author: author.into(),
            file: file.into(),
            lines_added: 0,
            lines_removed: 0,
        }
    }

    /// Parse the row's timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnmapError::MalformedTimestamp`] if the text is not an
    /// ISO-8601 timestamp with seconds.
    pub fn timestamp_utc(&self) -> Result<DateTime<Utc>, ChurnmapError> {
        parse_timestamp(&self.timestamp).ok_or_else(|| ChurnmapError::MalformedTimestamp {
            commit_hash: self.commit_hash.clone(),
            file: self.file.clone(),
            value: self.timestamp.clone(),
        })
    }

    /// Whether the row was authored by the automation bot.
    pub fn is_bot(&self) -> bool {
        self.author == BOT_AUTHOR
    }
}

/// Parse an ISO-8601 timestamp with second precision.
///
/// Accepts RFC 3339 text with an offset, the naive `YYYY-MM-DDTHH:MM:SS`
/// form (read as UTC), and SQLite's space-separated `datetime()` output.
///
/// # Examples
///
/// ```
/// use churnmap_core::parse_timestamp;
///
/// assert!(parse_timestamp("2024-03-01T12:30:00").is_some());
/// assert!(parse_timestamp("2024-03-01T12:30:00+02:00").is_some());
/// assert!(parse_timestamp("2024-03-01").is_none());
/// ```
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Start of the trailing window of `days` days that ends at `now`.
///
/// Returns `None` when the start would fall before the earliest instant
/// chrono can represent; callers treat that as a window with no lower bound.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use churnmap_core::window_start;
///
/// let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
/// let start = window_start(now, 365).unwrap();
/// assert_eq!(start, Utc.with_ymd_and_hms(2023, 6, 2, 0, 0, 0).unwrap());
/// assert!(window_start(now, 200_000_000).is_none());
/// ```
pub fn window_start(now: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    Duration::try_days(days).and_then(|span| now.checked_sub_signed(span))
}

/// Format an instant in the canonical stored form.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Scored hotspot metrics for a single file.
///
/// # Examples
///
/// ```
/// use churnmap_core::FileMetric;
///
/// let metric = FileMetric {
///     file: "src/engine.rs".into(),
///     commits: 12,
///     complexity: 48_000,
///     age_days: 3,
///     score: 100.0,
/// };
/// assert!(metric.score <= 100.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetric {
    /// Path relative to the repository root.
    pub file: String,
    /// Distinct commits touching the file.
    pub commits: u64,
    /// File size in bytes, used as a complexity proxy.
    pub complexity: u64,
    /// Whole days since the most recent change.
    pub age_days: i64,
    /// Normalized score in `[0, 100]`, one decimal place.
    pub score: f64,
}

/// Output format for CLI results.
///
/// # Examples
///
/// ```
/// use churnmap_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
