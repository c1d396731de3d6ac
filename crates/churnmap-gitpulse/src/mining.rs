//! Git history extraction via git2.
//!
//! Walks commit history oldest-first and flattens it into one
//! [`CommitRecord`] per (commit, touched file), with line counts, author,
//! and a UTC timestamp.

use std::path::Path;

use chrono::DateTime;
use churnmap_core::{
    format_timestamp, window_start, ChurnmapConfig, ChurnmapError, CommitRecord, BOT_AUTHOR,
};
use git2::{Delta, DiffFindOptions, DiffOptions, Patch, Repository, Sort};

/// Options for history mining.
///
/// # Examples
///
/// ```
/// use churnmap_gitpulse::mining::MiningOptions;
///
/// let opts = MiningOptions::default();
/// assert!(opts.since_days.is_none());
/// assert!(opts.max_files_per_commit.is_none());
/// assert_eq!(opts.exclude_authors, vec!["GitHub"]);
/// ```
#[derive(Debug, Clone)]
pub struct MiningOptions {
    /// Only include commits from the last N days (default: full history).
    pub since_days: Option<u64>,
    /// Skip commits touching more files than this (default: no limit).
    pub max_files_per_commit: Option<usize>,
    /// Branch to walk (default: HEAD).
    pub branch: Option<String>,
    /// Authors whose commits are never recorded (default: `["GitHub"]`).
    pub exclude_authors: Vec<String>,
    /// Paths matching any of these patterns are never recorded.
    pub exclude_paths: Vec<glob::Pattern>,
}

impl Default for MiningOptions {
    fn default() -> Self {
        Self {
            since_days: None,
            max_files_per_commit: None,
            branch: None,
            exclude_authors: vec![BOT_AUTHOR.to_string()],
            exclude_paths: Vec::new(),
        }
    }
}

impl MiningOptions {
    /// Build options from the `[history]` and `[bus_factor]` sections.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnmapError::Config`] if an exclude pattern is not a valid glob.
    pub fn from_config(config: &ChurnmapConfig) -> Result<Self, ChurnmapError> {
        let exclude_paths = config
            .history
            .exclude_paths
            .iter()
            .map(|pat| {
                glob::Pattern::new(pat).map_err(|e| {
                    ChurnmapError::Config(format!("invalid exclude pattern '{pat}': {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut exclude_authors = config.bus_factor.excluded_authors.clone();
        if !exclude_authors.iter().any(|a| a == BOT_AUTHOR) {
            exclude_authors.push(BOT_AUTHOR.to_string());
        }

        Ok(Self {
            since_days: None,
            max_files_per_commit: config.history.max_files_per_commit,
            branch: config.history.branch.clone(),
            exclude_authors,
            exclude_paths,
        })
    }

    fn is_excluded_path(&self, path: &str) -> bool {
        self.exclude_paths.iter().any(|p| p.matches(path))
    }
}

/// Mine commit rows from a git repository.
///
/// Returns rows oldest commit first. Commits by excluded authors, and
/// commits touching more files than `max_files_per_commit`, are skipped.
///
/// # Errors
///
/// Returns [`ChurnmapError::Git`] if the repository cannot be opened or walked.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use churnmap_gitpulse::mining::{mine_history, MiningOptions};
///
/// let rows = mine_history(Path::new("."), &MiningOptions::default()).unwrap();
/// for row in rows.iter().take(5) {
///     println!("{} {} {}", row.commit_hash, row.author, row.file);
/// }
/// ```
pub fn mine_history(
    repo_path: &Path,
    options: &MiningOptions,
) -> Result<Vec<CommitRecord>, ChurnmapError> {
    let repo = Repository::open(repo_path)
        .map_err(|e| ChurnmapError::Git(format!("failed to open repository: {e}")))?;

    let mut revwalk = repo
        .revwalk()
        .map_err(|e| ChurnmapError::Git(format!("failed to create revwalk: {e}")))?;

    revwalk
        .set_sorting(Sort::TIME | Sort::REVERSE)
        .map_err(|e| ChurnmapError::Git(format!("failed to set sorting: {e}")))?;

    if let Some(ref branch) = options.branch {
        let reference = repo
            .resolve_reference_from_short_name(branch)
            .map_err(|e| ChurnmapError::Git(format!("failed to resolve branch '{branch}': {e}")))?;
        let oid = reference
            .target()
            .ok_or_else(|| ChurnmapError::Git("branch has no target".into()))?;
        revwalk
            .push(oid)
            .map_err(|e| ChurnmapError::Git(format!("failed to push oid: {e}")))?;
    } else {
        revwalk
            .push_head()
            .map_err(|e| ChurnmapError::Git(format!("failed to push HEAD: {e}")))?;
    }

    let cutoff = options.since_days.and_then(compute_cutoff);
    let mut rows = Vec::new();
    let mut skipped_large = 0usize;

    for oid_result in revwalk {
        let oid = oid_result.map_err(|e| ChurnmapError::Git(format!("revwalk error: {e}")))?;

        let commit = repo
            .find_commit(oid)
            .map_err(|e| ChurnmapError::Git(format!("failed to find commit: {e}")))?;

        let seconds = commit.time().seconds();
        if cutoff.is_some_and(|c| seconds < c) {
            continue;
        }

        let author = commit.author();
        let author_name = author.name().unwrap_or("unknown").to_string();
        if options.exclude_authors.iter().any(|a| *a == author_name) {
            continue;
        }

        let changes = extract_file_changes(&repo, &commit)?;
        if options
            .max_files_per_commit
            .is_some_and(|max| changes.len() > max)
        {
            skipped_large += 1;
            continue;
        }

        let timestamp = DateTime::from_timestamp(seconds, 0)
            .map(|ts| format_timestamp(&ts))
            .ok_or_else(|| {
                ChurnmapError::Git(format!("commit {oid} has out-of-range time {seconds}"))
            })?;
        let hash = oid.to_string();
        let short_hash = &hash[..hash.len().min(8)];

        for change in changes {
            if options.is_excluded_path(&change.path) {
                continue;
            }
            rows.push(CommitRecord {
                commit_hash: short_hash.to_string(),
                timestamp: timestamp.clone(),
                author: author_name.clone(),
                file: change.path,
                lines_added: change.lines_added,
                lines_removed: change.lines_removed,
            });
        }
    }

    if skipped_large > 0 {
        log::info!("skipped {skipped_large} commits above the file limit");
    }
    log::debug!("mined {} commit rows", rows.len());
    Ok(rows)
}

/// Earliest commit time to keep, or `None` if the span reaches past the
/// earliest representable instant.
fn compute_cutoff(since_days: u64) -> Option<i64> {
    let days = i64::try_from(since_days).ok()?;
    window_start(chrono::Utc::now(), days).map(|start| start.timestamp())
}

struct FileChange {
    path: String,
    lines_added: u64,
    lines_removed: u64,
}

fn extract_file_changes(
    repo: &Repository,
    commit: &git2::Commit,
) -> Result<Vec<FileChange>, ChurnmapError> {
    let commit_tree = commit
        .tree()
        .map_err(|e| ChurnmapError::Git(format!("failed to get commit tree: {e}")))?;

    let parent_tree = if commit.parent_count() > 0 {
        let parent = commit
            .parent(0)
            .map_err(|e| ChurnmapError::Git(format!("failed to get parent: {e}")))?;
        Some(
            parent
                .tree()
                .map_err(|e| ChurnmapError::Git(format!("failed to get parent tree: {e}")))?,
        )
    } else {
        None
    };

    let mut diff_opts = DiffOptions::new();
    let mut diff = repo
        .diff_tree_to_tree(
            parent_tree.as_ref(),
            Some(&commit_tree),
            Some(&mut diff_opts),
        )
        .map_err(|e| ChurnmapError::Git(format!("failed to compute diff: {e}")))?;

    let mut find_opts = DiffFindOptions::new();
    find_opts.renames(true);
    diff.find_similar(Some(&mut find_opts))
        .map_err(|e| ChurnmapError::Git(format!("failed to find renames: {e}")))?;

    let mut changes = Vec::new();
    for (idx, delta) in diff.deltas().enumerate() {
        // Deleted files only have an old side.
        let side = if delta.status() == Delta::Deleted {
            delta.old_file()
        } else {
            delta.new_file()
        };
        let path = match side.path() {
            Some(p) => p.to_string_lossy().replace('\\', "/"),
            None => continue,
        };
        if path.is_empty() {
            continue;
        }

        let (lines_added, lines_removed) = match Patch::from_diff(&diff, idx) {
            Ok(Some(patch)) => match patch.line_stats() {
                Ok((_, added, removed)) => (added as u64, removed as u64),
                Err(_) => (0, 0),
            },
            _ => (0, 0),
        };

        changes.push(FileChange {
            path,
            lines_added,
            lines_removed,
        });
    }

    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{IndexAddOption, Signature, Time};
    use std::fs;

    const DAY: i64 = 86_400;
    const BASE: i64 = 1_700_000_000;

    fn commit_files(repo: &Repository, author: &str, when: i64, files: &[(&str, &str)]) {
        let root = repo.workdir().unwrap().to_path_buf();
        for (path, content) in files {
            let full = root.join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::new(
            author,
            &format!("{author}@example.com"),
            &Time::new(when, 0),
        )
        .unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, "change", &tree, &parents)
            .unwrap();
    }

    fn sample_repo() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_files(
            &repo,
            "alice",
            BASE,
            &[("src/lib.rs", "fn a() {}\n"), ("README.md", "# x\n")],
        );
        commit_files(&repo, "bob", BASE + DAY, &[("src/lib.rs", "fn a() {}\nfn b() {}\n")]);
        commit_files(&repo, "GitHub", BASE + 2 * DAY, &[("src/lib.rs", "fn c() {}\n")]);
        (dir, repo)
    }

    #[test]
    fn mining_options_defaults_are_correct() {
        let opts = MiningOptions::default();
        assert!(opts.since_days.is_none());
        assert!(opts.max_files_per_commit.is_none());
        assert!(opts.branch.is_none());
        assert_eq!(opts.exclude_authors, vec!["GitHub"]);
        assert!(opts.exclude_paths.is_empty());
    }

    #[test]
    fn options_from_config_keep_bot_exclusion() {
        let mut config = ChurnmapConfig::default();
        config.bus_factor.excluded_authors = vec!["dependabot[bot]".into()];
        config.history.exclude_paths = vec!["*.lock".into()];
        config.history.max_files_per_commit = Some(40);

        let opts = MiningOptions::from_config(&config).unwrap();
        assert!(opts.exclude_authors.contains(&"GitHub".to_string()));
        assert!(opts.exclude_authors.contains(&"dependabot[bot]".to_string()));
        assert!(opts.is_excluded_path("deep/dir/Cargo.lock"));
        assert!(!opts.is_excluded_path("src/lib.rs"));
        assert_eq!(opts.max_files_per_commit, Some(40));
    }

    #[test]
    fn invalid_exclude_pattern_is_config_error() {
        let mut config = ChurnmapConfig::default();
        config.history.exclude_paths = vec!["[unclosed".into()];
        let result = MiningOptions::from_config(&config);
        assert!(matches!(result, Err(ChurnmapError::Config(_))));
    }

    #[test]
    fn mines_one_row_per_file_oldest_first() {
        let (dir, _repo) = sample_repo();
        let rows = mine_history(dir.path(), &MiningOptions::default()).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].author, "alice");
        assert_eq!(rows[0].timestamp, "2023-11-14T22:13:20");
        let first_files: Vec<&str> = rows[..2].iter().map(|r| r.file.as_str()).collect();
        assert!(first_files.contains(&"src/lib.rs"));
        assert!(first_files.contains(&"README.md"));
        assert_eq!(rows[2].author, "bob");
        assert_eq!(rows[2].file, "src/lib.rs");
        assert_eq!(rows[2].commit_hash.len(), 8);
    }

    #[test]
    fn bot_commits_are_skipped() {
        let (dir, _repo) = sample_repo();
        let rows = mine_history(dir.path(), &MiningOptions::default()).unwrap();
        assert!(rows.iter().all(|r| r.author != "GitHub"));
    }

    #[test]
    fn line_counts_are_recorded() {
        let (dir, _repo) = sample_repo();
        let rows = mine_history(dir.path(), &MiningOptions::default()).unwrap();
        let bob = rows.iter().find(|r| r.author == "bob").unwrap();
        assert_eq!(bob.lines_added, 1);
        assert_eq!(bob.lines_removed, 0);
    }

    #[test]
    fn large_commits_are_skipped() {
        let (dir, _repo) = sample_repo();
        let opts = MiningOptions {
            max_files_per_commit: Some(1),
            ..MiningOptions::default()
        };
        let rows = mine_history(dir.path(), &opts).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].author, "bob");
    }

    #[test]
    fn excluded_paths_are_not_recorded() {
        let (dir, _repo) = sample_repo();
        let opts = MiningOptions {
            exclude_paths: vec![glob::Pattern::new("*.md").unwrap()],
            ..MiningOptions::default()
        };
        let rows = mine_history(dir.path(), &opts).unwrap();
        assert!(rows.iter().all(|r| r.file != "README.md"));
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn renamed_file_is_recorded_under_new_path() {
        let (dir, repo) = sample_repo();
        let root = dir.path();
        fs::create_dir_all(root.join("core")).unwrap();
        fs::rename(root.join("src/lib.rs"), root.join("core/lib.rs")).unwrap();
        let mut index = repo.index().unwrap();
        index.remove_path(Path::new("src/lib.rs")).unwrap();
        index.write().unwrap();
        commit_files(&repo, "carol", BASE + 3 * DAY, &[]);

        let rows = mine_history(root, &MiningOptions::default()).unwrap();
        let carol: Vec<&CommitRecord> = rows.iter().filter(|r| r.author == "carol").collect();
        assert_eq!(carol.len(), 1);
        assert_eq!(carol[0].file, "core/lib.rs");
    }

    #[test]
    fn oversized_since_keeps_full_history() {
        assert!(compute_cutoff(u64::MAX).is_none());
        assert!(compute_cutoff(200_000_000).is_none());

        let (dir, _repo) = sample_repo();
        let opts = MiningOptions {
            since_days: Some(u64::MAX),
            ..MiningOptions::default()
        };
        let rows = mine_history(dir.path(), &opts).unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn missing_repository_is_git_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = mine_history(dir.path(), &MiningOptions::default());
        assert!(matches!(result, Err(ChurnmapError::Git(_))));
    }
}
