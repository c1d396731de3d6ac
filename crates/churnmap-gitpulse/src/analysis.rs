//! End-to-end analysis run over a commit source.
//!
//! Feeds the commit table through the aggregator, scores hotspots against
//! current file sizes, rolls counts up by directory, and checks the top
//! hotspots for a low bus factor.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use churnmap_core::{
    ChurnmapConfig, ChurnmapError, CommitSource, FileMetric, FileSizeSource, ResultSink,
};
use serde::{Deserialize, Serialize};

use crate::aggregate::CommitAggregator;
use crate::hotspots::{rank, HotspotScorer};
use crate::ownership::{BusFactorDetector, BusFactorReport};
use crate::rollup::{rollup, DirectoryRollup};

/// Everything one analysis run produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Scored hotspots, highest score first.
    pub hotspots: Vec<FileMetric>,
    /// Recent authors of each hotspot with a positive score.
    pub bus_factor: BusFactorReport,
    /// Commit totals per directory.
    pub directories: DirectoryRollup,
    /// Distinct commits per author, most active first.
    pub authors: Vec<(String, u64)>,
    /// Distinct commits per UTC day, oldest first.
    pub activity: Vec<(NaiveDate, u64)>,
}

impl AnalysisReport {
    /// Write hotspots and bus-factor author sets to `sink`.
    ///
    /// # Errors
    ///
    /// Propagates failures from `sink`.
    pub fn persist<K>(&self, sink: &mut K) -> Result<(), ChurnmapError>
    where
        K: ResultSink + ?Sized,
    {
        sink.save_hotspots(&self.hotspots)?;
        sink.save_bus_factor(&self.bus_factor.authors)
    }
}

/// Runs the analysis pipeline with one configuration.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use std::path::Path;
/// use chrono::{TimeZone, Utc};
/// use churnmap_core::{ChurnmapConfig, CommitRecord, MemorySource};
/// use churnmap_gitpulse::analysis::Analyzer;
///
/// let rows = ["a1", "b2", "c3"]
///     .iter()
///     .map(|h| CommitRecord::new(*h, "2024-05-01T10:00:00", "alice", "src/core.rs"))
///     .collect();
/// let source = MemorySource::new(rows);
/// let sizes = HashMap::from([("src/core.rs".to_string(), 900u64)]);
/// let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
///
/// let config = ChurnmapConfig::default();
/// let report = Analyzer::new(&config)
///     .run(&source, &sizes, Path::new("."), now)
///     .unwrap();
/// assert_eq!(report.hotspots[0].score, 100.0);
/// assert!(report.bus_factor.is_single_owner("src/core.rs"));
/// ```
#[derive(Debug, Clone)]
pub struct Analyzer<'c> {
    config: &'c ChurnmapConfig,
    since: Option<DateTime<Utc>>,
}

impl<'c> Analyzer<'c> {
    /// Create an analyzer that counts every commit row.
    pub fn new(config: &'c ChurnmapConfig) -> Self {
        Self {
            config,
            since: None,
        }
    }

    /// Only count commit rows at or after `threshold`.
    pub fn since(mut self, threshold: DateTime<Utc>) -> Self {
        self.since = Some(threshold);
        self
    }

    /// Run the pipeline as of `now`.
    ///
    /// An empty commit source yields an empty report.
    ///
    /// # Errors
    ///
    /// Propagates failures from `source` and `sizes`.
    pub fn run<S, Z>(
        &self,
        source: &S,
        sizes: &Z,
        root: &Path,
        now: DateTime<Utc>,
    ) -> Result<AnalysisReport, ChurnmapError>
    where
        S: CommitSource + ?Sized,
        Z: FileSizeSource + ?Sized,
    {
        let rows = source.rows()?;
        if rows.is_empty() {
            log::info!("no commit rows to analyze");
            return Ok(AnalysisReport {
                bus_factor: BusFactorReport {
                    window_days: self.config.bus_factor.window_days,
                    ..BusFactorReport::default()
                },
                ..AnalysisReport::default()
            });
        }

        let mut aggregator = CommitAggregator::new(&rows);
        if let Some(threshold) = self.since {
            aggregator = aggregator.since(threshold);
        }
        log::debug!("aggregating {} commit rows", aggregator.len());

        let commits = aggregator.commit_counts();
        let ages = aggregator.last_change_age(now);
        let complexity = sizes.sizes(root)?;

        let scorer = HotspotScorer::new(&self.config.scoring);
        let mut hotspots = scorer.score_all(&commits, &complexity, &ages);
        rank(&mut hotspots);
        log::info!("scored {} hotspots", hotspots.len());

        let detector = BusFactorDetector::new(&self.config.bus_factor);
        let bus_factor = detector.detect(&hotspots, source, now)?;

        let directories = rollup(&aggregator.changes_by_file(), self.config.rollup.depth);

        Ok(AnalysisReport {
            hotspots,
            bus_factor,
            directories,
            authors: aggregator.contributions_by_author(),
            activity: aggregator.contributions_over_time(),
        })
    }
}
