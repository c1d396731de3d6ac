//! Per-file, per-author and per-day projections of the commit table.
//!
//! Every count here is a count of distinct commit hashes, so a file that
//! appears twice in one commit (as some log formats produce) is counted once.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use churnmap_core::CommitRecord;

/// Reduces a commit-row table into per-file projections.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use churnmap_core::CommitRecord;
/// use churnmap_gitpulse::aggregate::CommitAggregator;
///
/// let rows = vec![
///     CommitRecord::new("a1", "2024-01-01T09:00:00", "alice", "src/lib.rs"),
///     CommitRecord::new("b2", "2024-01-05T09:00:00", "bob", "src/lib.rs"),
/// ];
/// let agg = CommitAggregator::new(&rows);
/// assert_eq!(agg.commit_counts()["src/lib.rs"], 2);
///
/// let now = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
/// assert_eq!(agg.last_change_age(now)["src/lib.rs"], 10);
/// ```
pub struct CommitAggregator<'a> {
    rows: Vec<&'a CommitRecord>,
}

impl<'a> CommitAggregator<'a> {
    /// Aggregate over `rows`.
    pub fn new(rows: &'a [CommitRecord]) -> Self {
        Self {
            rows: rows.iter().collect(),
        }
    }

    /// Restrict to rows at or after `threshold`.
    ///
    /// Rows whose timestamp cannot be parsed are dropped with a warning.
    pub fn since(self, threshold: DateTime<Utc>) -> Self {
        let rows = self
            .rows
            .into_iter()
            .filter(|row| match row.timestamp_utc() {
                Ok(ts) => ts >= threshold,
                Err(e) => {
                    log::warn!("skipping row: {e}");
                    false
                }
            })
            .collect();
        Self { rows }
    }

    /// Number of rows under aggregation.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows under aggregation.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct commits touching each file.
    pub fn commit_counts(&self) -> HashMap<String, u64> {
        distinct_counts(self.rows.iter().map(|row| (&row.file, &row.commit_hash)))
            .into_iter()
            .collect()
    }

    /// Whole days between `now` and each file's most recent change, rounded
    /// down. A change dated after `now` gives a negative age.
    ///
    /// Rows with a malformed timestamp are skipped with a warning; a file
    /// whose every row is malformed has no entry.
    pub fn last_change_age(&self, now: DateTime<Utc>) -> HashMap<String, i64> {
        let mut latest: HashMap<&str, DateTime<Utc>> = HashMap::new();
        for row in &self.rows {
            let ts = match row.timestamp_utc() {
                Ok(ts) => ts,
                Err(e) => {
                    log::warn!("skipping row: {e}");
                    continue;
                }
            };
            latest
                .entry(row.file.as_str())
                .and_modify(|max| {
                    if ts > *max {
                        *max = ts;
                    }
                })
                .or_insert(ts);
        }

        latest
            .into_iter()
            .map(|(file, ts)| {
                let age = (now - ts).num_seconds().div_euclid(86_400);
                (file.to_string(), age)
            })
            .collect()
    }

    /// Distinct commits per file, most-changed first (ties by path).
    pub fn changes_by_file(&self) -> Vec<(String, u64)> {
        sorted_descending(distinct_counts(
            self.rows.iter().map(|row| (&row.file, &row.commit_hash)),
        ))
    }

    /// Distinct commits per author, most active first (ties by name).
    pub fn contributions_by_author(&self) -> Vec<(String, u64)> {
        sorted_descending(distinct_counts(
            self.rows.iter().map(|row| (&row.author, &row.commit_hash)),
        ))
    }

    /// Distinct commits per UTC calendar day, oldest first.
    ///
    /// Rows with a malformed timestamp are skipped with a warning.
    pub fn contributions_over_time(&self) -> Vec<(NaiveDate, u64)> {
        let mut per_day: BTreeMap<NaiveDate, HashSet<&str>> = BTreeMap::new();
        for row in &self.rows {
            match row.timestamp_utc() {
                Ok(ts) => {
                    per_day
                        .entry(ts.date_naive())
                        .or_default()
                        .insert(row.commit_hash.as_str());
                }
                Err(e) => log::warn!("skipping row: {e}"),
            }
        }
        per_day
            .into_iter()
            .map(|(day, hashes)| (day, hashes.len() as u64))
            .collect()
    }
}

fn distinct_counts<'r>(
    pairs: impl Iterator<Item = (&'r String, &'r String)>,
) -> HashMap<String, u64> {
    let mut seen: HashMap<&str, HashSet<&str>> = HashMap::new();
    for (key, hash) in pairs {
        seen.entry(key.as_str()).or_default().insert(hash.as_str());
    }
    seen.into_iter()
        .map(|(key, hashes)| (key.to_string(), hashes.len() as u64))
        .collect()
}

fn sorted_descending(counts: HashMap<String, u64>) -> Vec<(String, u64)> {
    let mut sorted: Vec<(String, u64)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted
}
