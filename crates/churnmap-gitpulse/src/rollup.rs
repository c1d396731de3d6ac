//! Per-directory commit totals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::paths::{dirname, normalize};

/// Commit totals per directory prefix.
///
/// # Examples
///
/// ```
/// use churnmap_gitpulse::rollup::rollup;
///
/// let counts = vec![
///     ("a/b/x.py".to_string(), 5),
///     ("a/b/y.py".to_string(), 3),
///     ("a/c/z.py".to_string(), 2),
/// ];
/// let result = rollup(&counts, Some(2));
/// assert_eq!(result.totals["a/b"], 8);
/// assert_eq!(result.totals["a/c"], 2);
/// assert_eq!(result.directory_count, 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryRollup {
    /// Commit total keyed by directory; top-level files roll up under `""`.
    pub totals: BTreeMap<String, u64>,
    /// Number of distinct directory keys.
    pub directory_count: usize,
}

impl DirectoryRollup {
    /// Directories ordered by total descending, ties by name.
    pub fn ranked(&self) -> Vec<(&str, u64)> {
        let mut ranked: Vec<(&str, u64)> = self
            .totals
            .iter()
            .map(|(dir, total)| (dir.as_str(), *total))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}

/// Sum per-file commit counts into per-directory totals.
///
/// Paths are rename-normalized first. With `depth`, only the first `depth`
/// segments of each directory form its key.
pub fn rollup(file_commit_counts: &[(String, u64)], depth: Option<usize>) -> DirectoryRollup {
    let mut totals: BTreeMap<String, u64> = BTreeMap::new();

    for (file, count) in file_commit_counts {
        let path = normalize(file);
        let key = directory_key(dirname(&path), depth);
        *totals.entry(key).or_default() += count;
    }

    let directory_count = totals.len();
    DirectoryRollup {
        totals,
        directory_count,
    }
}

fn directory_key(directory: &str, depth: Option<usize>) -> String {
    match depth {
        Some(depth) => directory
            .split('/')
            .take(depth)
            .collect::<Vec<_>>()
            .join("/"),
        None => directory.to_string(),
    }
}
