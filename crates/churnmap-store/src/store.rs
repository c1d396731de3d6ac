//! SQLite storage for mined history and analysis results.
//!
//! The `commits` table holds one row per (commit, file) pair as mined from
//! git. Each analysis run replaces the `files` (hotspot scores) and
//! `bus_factor` (file, author) tables wholesale.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use churnmap_core::{
    ChurnmapError, CommitRecord, CommitSource, FileMetric, ResultSink, BOT_AUTHOR,
};
use rusqlite::{params, params_from_iter, Connection};
use serde::{Deserialize, Serialize};

/// Row counts for a history database.
///
/// # Examples
///
/// ```
/// use churnmap_store::store::StoreStats;
///
/// let stats = StoreStats {
///     commit_rows: 120,
///     distinct_commits: 40,
///     distinct_files: 25,
/// };
/// assert!(stats.distinct_commits <= stats.commit_rows);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// Rows in the commit table.
    pub commit_rows: usize,
    /// Distinct commit hashes.
    pub distinct_commits: usize,
    /// Distinct file paths.
    pub distinct_files: usize,
}

/// SQLite-backed commit table and result store.
///
/// # Examples
///
/// ```
/// use churnmap_core::{CommitRecord, CommitSource};
/// use churnmap_store::store::HistoryStore;
///
/// let mut store = HistoryStore::in_memory().unwrap();
/// store
///     .replace_commits(&[CommitRecord::new("a1b2c3d4", "2024-01-01T00:00:00", "alice", "src/lib.rs")])
///     .unwrap();
/// assert_eq!(store.commit_count().unwrap(), 1);
/// assert_eq!(store.rows().unwrap()[0].author, "alice");
/// ```
pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    /// Open or create a history database at the given path.
    ///
    /// Creates the parent directory and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnmapError::Database`] if the database cannot be opened.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use churnmap_store::store::HistoryStore;
    ///
    /// let store = HistoryStore::open(Path::new(".churnmap/history.db")).unwrap();
    /// ```
    pub fn open(path: &Path) -> Result<Self, ChurnmapError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ChurnmapError::Database(format!("failed to create database directory: {e}"))
                })?;
            }
        }
        let conn = Connection::open(path)
            .map_err(|e| ChurnmapError::Database(format!("failed to open database: {e}")))?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnmapError::Database`] if schema creation fails.
    pub fn in_memory() -> Result<Self, ChurnmapError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            ChurnmapError::Database(format!("failed to create in-memory database: {e}"))
        })?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), ChurnmapError> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS commits (
                    commit_hash TEXT NOT NULL,
                    timestamp TEXT NOT NULL,
                    author TEXT NOT NULL,
                    file TEXT NOT NULL,
                    lines_added INTEGER NOT NULL DEFAULT 0,
                    lines_removed INTEGER NOT NULL DEFAULT 0
                );

                CREATE INDEX IF NOT EXISTS commits_file ON commits(file);

                CREATE TABLE IF NOT EXISTS files (
                    file TEXT PRIMARY KEY,
                    commits INTEGER NOT NULL,
                    complexity INTEGER NOT NULL,
                    age_days INTEGER NOT NULL,
                    score REAL NOT NULL
                );

                CREATE TABLE IF NOT EXISTS bus_factor (
                    file TEXT NOT NULL,
                    author TEXT NOT NULL,
                    PRIMARY KEY (file, author)
                );
                ",
            )
            .map_err(|e| ChurnmapError::Database(format!("failed to create schema: {e}")))?;

        Ok(())
    }

    /// Replace the whole commit table with `rows` in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnmapError::Database`] on write failure; the previous
    /// contents are kept in that case.
    pub fn replace_commits(&mut self, rows: &[CommitRecord]) -> Result<(), ChurnmapError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| ChurnmapError::Database(format!("failed to begin transaction: {e}")))?;

        tx.execute("DELETE FROM commits", [])
            .map_err(|e| ChurnmapError::Database(format!("failed to clear commits: {e}")))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO commits
                     (commit_hash, timestamp, author, file, lines_added, lines_removed)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(|e| ChurnmapError::Database(format!("failed to prepare insert: {e}")))?;

            for row in rows {
                stmt.execute(params![
                    row.commit_hash,
                    row.timestamp,
                    row.author,
                    row.file,
                    row.lines_added as i64,
                    row.lines_removed as i64,
                ])
                .map_err(|e| ChurnmapError::Database(format!("failed to insert commit: {e}")))?;
            }
        }

        tx.commit()
            .map_err(|e| ChurnmapError::Database(format!("failed to commit transaction: {e}")))?;

        log::debug!("stored {} commit rows", rows.len());
        Ok(())
    }

    /// Number of rows in the commit table.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnmapError::Database`] on query failure.
    pub fn commit_count(&self) -> Result<usize, ChurnmapError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM commits", [], |row| row.get(0))
            .map_err(|e| ChurnmapError::Database(format!("failed to count commits: {e}")))?;
        Ok(count as usize)
    }

    /// Row counts for the commit table.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnmapError::Database`] on query failure.
    pub fn stats(&self) -> Result<StoreStats, ChurnmapError> {
        let (rows, commits, files): (i64, i64, i64) = self
            .conn
            .query_row(
                "SELECT COUNT(*), COUNT(DISTINCT commit_hash), COUNT(DISTINCT file) FROM commits",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(|e| ChurnmapError::Database(format!("failed to get stats: {e}")))?;

        Ok(StoreStats {
            commit_rows: rows as usize,
            distinct_commits: commits as usize,
            distinct_files: files as usize,
        })
    }

    /// Hotspots saved by the last analysis run, highest score first.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnmapError::Database`] on query failure.
    pub fn load_hotspots(&self) -> Result<Vec<FileMetric>, ChurnmapError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT file, commits, complexity, age_days, score
                 FROM files ORDER BY score DESC, file ASC",
            )
            .map_err(|e| ChurnmapError::Database(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(FileMetric {
                    file: row.get(0)?,
                    commits: row.get::<_, i64>(1)? as u64,
                    complexity: row.get::<_, i64>(2)? as u64,
                    age_days: row.get(3)?,
                    score: row.get(4)?,
                })
            })
            .map_err(|e| ChurnmapError::Database(format!("failed to load hotspots: {e}")))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| ChurnmapError::Database(format!("failed to read hotspot row: {e}")))
    }

    /// Author sets saved by the last analysis run.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnmapError::Database`] on query failure.
    pub fn load_bus_factor(&self) -> Result<BTreeMap<String, BTreeSet<String>>, ChurnmapError> {
        let mut stmt = self
            .conn
            .prepare("SELECT file, author FROM bus_factor")
            .map_err(|e| ChurnmapError::Database(format!("failed to prepare query: {e}")))?;

        let pairs = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(|e| ChurnmapError::Database(format!("failed to load bus factor: {e}")))?;

        let mut authors: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for pair in pairs {
            let (file, author) = pair
                .map_err(|e| ChurnmapError::Database(format!("failed to read bus factor row: {e}")))?;
            authors.entry(file).or_default().insert(author);
        }
        Ok(authors)
    }

    fn query_rows(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<CommitRecord>, ChurnmapError> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| ChurnmapError::Database(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map(params, |row| {
                Ok(CommitRecord {
                    commit_hash: row.get(0)?,
                    timestamp: row.get(1)?,
                    author: row.get(2)?,
                    file: row.get(3)?,
                    lines_added: row.get::<_, i64>(4)? as u64,
                    lines_removed: row.get::<_, i64>(5)? as u64,
                })
            })
            .map_err(|e| ChurnmapError::Database(format!("failed to query commits: {e}")))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| ChurnmapError::Database(format!("failed to read commit row: {e}")))
    }
}

/// Files bound per `IN (...)` query; stays well under SQLite's variable limit.
const FILES_PER_QUERY: usize = 500;

const SELECT_COMMITS: &str = "SELECT commit_hash, timestamp, author, file, lines_added, lines_removed
     FROM commits WHERE author != ?1";

impl CommitSource for HistoryStore {
    fn rows(&self) -> Result<Vec<CommitRecord>, ChurnmapError> {
        self.query_rows(SELECT_COMMITS, params![BOT_AUTHOR])
    }

    fn rows_for(&self, files: &BTreeSet<String>) -> Result<Vec<CommitRecord>, ChurnmapError> {
        let files: Vec<&str> = files.iter().map(String::as_str).collect();
        let mut rows = Vec::new();

        for chunk in files.chunks(FILES_PER_QUERY) {
            let placeholders = (0..chunk.len())
                .map(|i| format!("?{}", i + 2))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!("{SELECT_COMMITS} AND file IN ({placeholders})");

            let values = std::iter::once(BOT_AUTHOR).chain(chunk.iter().copied());
            rows.extend(self.query_rows(&sql, params_from_iter(values))?);
        }

        Ok(rows)
    }
}

impl ResultSink for HistoryStore {
    fn save_hotspots(&mut self, hotspots: &[FileMetric]) -> Result<(), ChurnmapError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| ChurnmapError::Database(format!("failed to begin transaction: {e}")))?;

        tx.execute("DELETE FROM files", [])
            .map_err(|e| ChurnmapError::Database(format!("failed to clear hotspots: {e}")))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO files (file, commits, complexity, age_days, score)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(|e| ChurnmapError::Database(format!("failed to prepare insert: {e}")))?;

            for hotspot in hotspots {
                stmt.execute(params![
                    hotspot.file,
                    hotspot.commits as i64,
                    hotspot.complexity as i64,
                    hotspot.age_days,
                    hotspot.score,
                ])
                .map_err(|e| ChurnmapError::Database(format!("failed to insert hotspot: {e}")))?;
            }
        }

        tx.commit()
            .map_err(|e| ChurnmapError::Database(format!("failed to commit transaction: {e}")))
    }

    fn save_bus_factor(
        &mut self,
        authors: &BTreeMap<String, BTreeSet<String>>,
    ) -> Result<(), ChurnmapError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| ChurnmapError::Database(format!("failed to begin transaction: {e}")))?;

        tx.execute("DELETE FROM bus_factor", [])
            .map_err(|e| ChurnmapError::Database(format!("failed to clear bus factor: {e}")))?;

        {
            let mut stmt = tx
                .prepare("INSERT OR IGNORE INTO bus_factor (file, author) VALUES (?1, ?2)")
                .map_err(|e| ChurnmapError::Database(format!("failed to prepare insert: {e}")))?;

            for (file, file_authors) in authors {
                for author in file_authors {
                    stmt.execute(params![file, author]).map_err(|e| {
                        ChurnmapError::Database(format!("failed to insert bus factor row: {e}"))
                    })?;
                }
            }
        }

        tx.commit()
            .map_err(|e| ChurnmapError::Database(format!("failed to commit transaction: {e}")))
    }
}
