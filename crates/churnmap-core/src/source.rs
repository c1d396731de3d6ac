//! Interfaces between the scoring engine and its data collaborators.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use crate::error::ChurnmapError;
use crate::types::{CommitRecord, FileMetric};

/// Read access to the commit-row table.
///
/// Implementations never return rows authored by the automation bot.
pub trait CommitSource {
    /// All commit rows.
    fn rows(&self) -> Result<Vec<CommitRecord>, ChurnmapError>;

    /// Commit rows touching any of `files`.
    fn rows_for(&self, files: &BTreeSet<String>) -> Result<Vec<CommitRecord>, ChurnmapError>;
}

/// Measures the current size of the code files under a root directory.
pub trait FileSizeSource {
    /// Map of repo-relative path to size in bytes.
    fn sizes(&self, root: &Path) -> Result<HashMap<String, u64>, ChurnmapError>;
}

/// Receives the results of an analysis run.
pub trait ResultSink {
    /// Store the scored hotspots, replacing any earlier run.
    fn save_hotspots(&mut self, hotspots: &[FileMetric]) -> Result<(), ChurnmapError>;

    /// Store the per-file author sets, replacing any earlier run.
    fn save_bus_factor(
        &mut self,
        authors: &BTreeMap<String, BTreeSet<String>>,
    ) -> Result<(), ChurnmapError>;
}

/// A commit source backed by rows already in memory.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
/// use churnmap_core::{CommitRecord, CommitSource, MemorySource};
///
/// let source = MemorySource::new(vec![
///     CommitRecord::new("a1", "2024-01-01T00:00:00", "alice", "src/a.rs"),
///     CommitRecord::new("b2", "2024-01-02T00:00:00", "GitHub", "src/a.rs"),
///     CommitRecord::new("c3", "2024-01-03T00:00:00", "bob", "src/b.rs"),
/// ]);
/// assert_eq!(source.rows().unwrap().len(), 2);
///
/// let only_a: BTreeSet<String> = ["src/a.rs".to_string()].into();
/// assert_eq!(source.rows_for(&only_a).unwrap().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    rows: Vec<CommitRecord>,
}

impl MemorySource {
    /// Wrap `rows`, dropping any authored by the automation bot.
    pub fn new(rows: Vec<CommitRecord>) -> Self {
        Self {
            rows: rows.into_iter().filter(|row| !row.is_bot()).collect(),
        }
    }
}

impl CommitSource for MemorySource {
    fn rows(&self) -> Result<Vec<CommitRecord>, ChurnmapError> {
        Ok(self.rows.clone())
    }

    fn rows_for(&self, files: &BTreeSet<String>) -> Result<Vec<CommitRecord>, ChurnmapError> {
        Ok(self
            .rows
            .iter()
            .filter(|row| files.contains(&row.file))
            .cloned()
            .collect())
    }
}

/// A size source backed by a fixed map; the root is ignored.
impl FileSizeSource for HashMap<String, u64> {
    fn sizes(&self, _root: &Path) -> Result<HashMap<String, u64>, ChurnmapError> {
        Ok(self.clone())
    }
}
