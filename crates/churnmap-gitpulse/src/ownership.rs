//! Bus factor analysis for hotspots.
//!
//! Cross-references the top hotspots with recent authorship to find files
//! that only one person has touched inside a trailing window. Those are the
//! riskiest spots: frequently changed, large, and understood by one person.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use churnmap_core::{
    window_start, BusFactorConfig, ChurnmapError, CommitRecord, CommitSource, FileMetric,
    BOT_AUTHOR,
};
use serde::{Deserialize, Serialize};

/// Distinct recent authors of a single hotspot.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
/// use churnmap_gitpulse::ownership::BusFactorEntry;
///
/// let entry = BusFactorEntry {
///     file: "src/billing.rs".into(),
///     authors: BTreeSet::from(["alice".to_string()]),
/// };
/// assert!(entry.is_single_owner());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusFactorEntry {
    /// File path relative to repo root.
    pub file: String,
    /// Authors who touched the file inside the window.
    pub authors: BTreeSet<String>,
}

impl BusFactorEntry {
    /// Whether exactly one author touched the file inside the window.
    pub fn is_single_owner(&self) -> bool {
        self.authors.len() == 1
    }
}

/// Author sets for every hotspot touched inside the window.
///
/// Hotspots with no commits inside the window have no entry.
///
/// # Examples
///
/// ```
/// use std::collections::{BTreeMap, BTreeSet};
/// use churnmap_gitpulse::ownership::BusFactorReport;
///
/// let report = BusFactorReport {
///     window_days: 365,
///     authors: BTreeMap::from([
///         ("a.rs".to_string(), BTreeSet::from(["alice".to_string()])),
///         ("b.rs".to_string(), BTreeSet::from(["alice".to_string(), "bob".to_string()])),
///     ]),
/// };
/// assert_eq!(report.single_owner().len(), 1);
/// assert_eq!(report.shared().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusFactorReport {
    /// Trailing window the report covers, in days.
    pub window_days: i64,
    /// Distinct recent authors keyed by file.
    pub authors: BTreeMap<String, BTreeSet<String>>,
}

impl BusFactorReport {
    /// All entries, ordered by file path.
    pub fn entries(&self) -> Vec<BusFactorEntry> {
        self.authors
            .iter()
            .map(|(file, authors)| BusFactorEntry {
                file: file.clone(),
                authors: authors.clone(),
            })
            .collect()
    }

    /// Hotspots with exactly one recent author, paired with that author.
    pub fn single_owner(&self) -> Vec<(&str, &str)> {
        self.authors
            .iter()
            .filter(|(_, authors)| authors.len() == 1)
            .filter_map(|(file, authors)| {
                authors
                    .iter()
                    .next()
                    .map(|author| (file.as_str(), author.as_str()))
            })
            .collect()
    }

    /// Hotspots with more than one recent author.
    pub fn shared(&self) -> Vec<BusFactorEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.authors.len() > 1)
            .collect()
    }

    /// Whether `file` has exactly one recent author.
    pub fn is_single_owner(&self, file: &str) -> bool {
        self.authors.get(file).is_some_and(|a| a.len() == 1)
    }
}

/// Finds hotspots maintained by a dangerously small set of authors.
#[derive(Debug, Clone)]
pub struct BusFactorDetector {
    window_days: i64,
    excluded_authors: BTreeSet<String>,
}

impl BusFactorDetector {
    /// Create a detector from `config`.
    ///
    /// The automation bot is always excluded, whatever `config` lists.
    pub fn new(config: &BusFactorConfig) -> Self {
        let mut excluded_authors: BTreeSet<String> =
            config.excluded_authors.iter().cloned().collect();
        excluded_authors.insert(BOT_AUTHOR.to_string());
        Self {
            window_days: config.window_days,
            excluded_authors,
        }
    }

    /// Hotspots carrying a risk signal (`score > 0`), highest score first.
    pub fn top_hotspots(hotspots: &[FileMetric]) -> Vec<&FileMetric> {
        let mut top: Vec<&FileMetric> = hotspots.iter().filter(|h| h.score > 0.0).collect();
        top.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        top
    }

    /// Look up recent authors of every top hotspot.
    ///
    /// # Errors
    ///
    /// Propagates failures from `source`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use churnmap_core::{BusFactorConfig, CommitRecord, FileMetric, MemorySource};
    /// use churnmap_gitpulse::ownership::BusFactorDetector;
    ///
    /// let source = MemorySource::new(vec![
    ///     CommitRecord::new("a1", "2024-05-01T10:00:00", "alice", "src/core.rs"),
    ///     CommitRecord::new("b2", "2024-05-02T10:00:00", "alice", "src/core.rs"),
    /// ]);
    /// let hotspots = vec![FileMetric {
    ///     file: "src/core.rs".into(),
    ///     commits: 3,
    ///     complexity: 2_000,
    ///     age_days: 30,
    ///     score: 100.0,
    /// }];
    /// let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    ///
    /// let detector = BusFactorDetector::new(&BusFactorConfig::default());
    /// let report = detector.detect(&hotspots, &source, now).unwrap();
    /// assert!(report.is_single_owner("src/core.rs"));
    /// ```
    pub fn detect<S>(
        &self,
        hotspots: &[FileMetric],
        source: &S,
        now: DateTime<Utc>,
    ) -> Result<BusFactorReport, ChurnmapError>
    where
        S: CommitSource + ?Sized,
    {
        let files: BTreeSet<String> = Self::top_hotspots(hotspots)
            .into_iter()
            .map(|h| h.file.clone())
            .collect();

        if files.is_empty() {
            return Ok(BusFactorReport {
                window_days: self.window_days,
                authors: BTreeMap::new(),
            });
        }

        let rows = source.rows_for(&files)?;
        log::debug!(
            "bus factor: {} rows for {} hotspot files",
            rows.len(),
            files.len()
        );
        Ok(self.collect_authors(&files, &rows, now))
    }

    /// Group recent, non-excluded rows for `files` into author sets.
    pub fn collect_authors(
        &self,
        files: &BTreeSet<String>,
        rows: &[CommitRecord],
        now: DateTime<Utc>,
    ) -> BusFactorReport {
        let cutoff = window_start(now, self.window_days);
        let mut authors: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for row in rows {
            if !files.contains(&row.file) || self.excluded_authors.contains(&row.author) {
                continue;
            }
            let ts = match row.timestamp_utc() {
                Ok(ts) => ts,
                Err(e) => {
                    log::warn!("skipping row: {e}");
                    continue;
                }
            };
            if cutoff.is_some_and(|start| ts < start) {
                continue;
            }
            authors
                .entry(row.file.clone())
                .or_default()
                .insert(row.author.clone());
        }

        BusFactorReport {
            window_days: self.window_days,
            authors,
        }
    }
}
