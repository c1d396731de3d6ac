use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ChurnmapError;
use crate::types::BOT_AUTHOR;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".churnmap.toml";

/// Top-level configuration loaded from `.churnmap.toml`.
///
/// Each analysis run owns one of these and passes it explicitly to every
/// component; nothing is kept in process-wide state.
///
/// # Examples
///
/// ```
/// use churnmap_core::ChurnmapConfig;
///
/// let config = ChurnmapConfig::default();
/// assert_eq!(config.scoring.min_commits, 2);
/// assert_eq!(config.scoring.recent_days, 180);
/// assert_eq!(config.bus_factor.window_days, 365);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChurnmapConfig {
    /// Hotspot scoring policy.
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Bus-factor detection settings.
    #[serde(default)]
    pub bus_factor: BusFactorConfig,
    /// File-size measurement settings.
    #[serde(default)]
    pub sizes: SizeConfig,
    /// History extraction settings.
    #[serde(default)]
    pub history: HistoryConfig,
    /// Directory rollup settings.
    #[serde(default)]
    pub rollup: RollupConfig,
    /// Result database settings.
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl ChurnmapConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnmapError::Io`] if the file cannot be read, or
    /// [`ChurnmapError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use churnmap_core::ChurnmapConfig;
    /// use std::path::Path;
    ///
    /// let config = ChurnmapConfig::from_file(Path::new(".churnmap.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, ChurnmapError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnmapError::Toml`] if parsing fails, or
    /// [`ChurnmapError::Config`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use churnmap_core::ChurnmapConfig;
    ///
    /// let toml = r#"
    /// [scoring]
    /// recent_days = 90
    /// "#;
    /// let config = ChurnmapConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.scoring.recent_days, 90);
    /// assert_eq!(config.scoring.min_commits, 2);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, ChurnmapError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve configuration: an explicit path, else `.churnmap.toml` in
    /// `dir` if present, else defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnmapError::FileNotFound`] when an explicit path does not
    /// exist, or any error from [`ChurnmapConfig::from_file`].
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<Self, ChurnmapError> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ChurnmapError::FileNotFound(path.to_path_buf()));
                }
                Self::from_file(path)
            }
            None => {
                let default_path = dir.join(CONFIG_FILE_NAME);
                if default_path.exists() {
                    Self::from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn validate(&self) -> Result<(), ChurnmapError> {
        if self.bus_factor.window_days < 0 {
            return Err(ChurnmapError::Config(format!(
                "bus_factor.window_days must not be negative, got {}",
                self.bus_factor.window_days
            )));
        }
        if self.rollup.depth == Some(0) {
            return Err(ChurnmapError::Config(
                "rollup.depth must be at least 1 when set".into(),
            ));
        }
        Ok(())
    }
}

/// Hotspot scoring policy constants.
///
/// # Examples
///
/// ```
/// use churnmap_core::ScoringConfig;
///
/// let config = ScoringConfig::default();
/// assert_eq!(config.min_commits, 2);
/// assert_eq!(config.recent_days, 180);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Files need strictly more distinct commits than this to be scored (default: 2).
    #[serde(default = "default_min_commits")]
    pub min_commits: u64,
    /// Effective ages below this many days use the linear regime (default: 180).
    #[serde(default = "default_recent_days")]
    pub recent_days: u64,
}

fn default_min_commits() -> u64 {
    2
}

fn default_recent_days() -> u64 {
    180
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_commits: default_min_commits(),
            recent_days: default_recent_days(),
        }
    }
}

/// Bus-factor detection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusFactorConfig {
    /// Trailing window in days (default: 365).
    #[serde(default = "default_window_days")]
    pub window_days: i64,
    /// Authors never counted as maintainers (default: `["GitHub"]`).
    #[serde(default = "default_excluded_authors")]
    pub excluded_authors: Vec<String>,
}

fn default_window_days() -> i64 {
    365
}

fn default_excluded_authors() -> Vec<String> {
    vec![BOT_AUTHOR.to_string()]
}

impl Default for BusFactorConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            excluded_authors: default_excluded_authors(),
        }
    }
}

/// File-size measurement settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeConfig {
    /// Extensions (without the dot) treated as non-code and never measured.
    #[serde(default = "default_exclude_extensions")]
    pub exclude_extensions: Vec<String>,
}

fn default_exclude_extensions() -> Vec<String> {
    [
        "md", "lock", "jpg", "jpeg", "png", "gif", "yaml", "yml", "json", "xml", "scss",
    ]
    .iter()
    .map(|ext| ext.to_string())
    .collect()
}

impl Default for SizeConfig {
    fn default() -> Self {
        Self {
            exclude_extensions: default_exclude_extensions(),
        }
    }
}

/// History extraction settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Branch to walk instead of HEAD.
    pub branch: Option<String>,
    /// Glob patterns for paths that are never recorded (e.g. `"*.lock"`).
    #[serde(default)]
    pub exclude_paths: Vec<String>,
    /// Skip commits touching more files than this.
    pub max_files_per_commit: Option<usize>,
}

/// Directory rollup settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupConfig {
    /// Number of leading path segments kept per directory key (default: 2).
    #[serde(default = "default_rollup_depth")]
    pub depth: Option<usize>,
}

fn default_rollup_depth() -> Option<usize> {
    Some(2)
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            depth: default_rollup_depth(),
        }
    }
}

/// Result database settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database path, relative to the analyzed repository (default: `.churnmap/history.db`).
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from(".churnmap").join("history.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = ChurnmapConfig::default();
        assert_eq!(config.scoring.min_commits, 2);
        assert_eq!(config.scoring.recent_days, 180);
        assert_eq!(config.bus_factor.window_days, 365);
        assert_eq!(config.bus_factor.excluded_authors, vec!["GitHub"]);
        assert!(config.sizes.exclude_extensions.contains(&"md".to_string()));
        assert!(config.sizes.exclude_extensions.contains(&"scss".to_string()));
        assert!(config.history.exclude_paths.is_empty());
        assert!(config.history.max_files_per_commit.is_none());
        assert_eq!(config.rollup.depth, Some(2));
        assert_eq!(
            config.database.path,
            PathBuf::from(".churnmap").join("history.db")
        );
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = ChurnmapConfig::from_toml("").unwrap();
        assert_eq!(config, ChurnmapConfig::default());
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[scoring]
min_commits = 4
recent_days = 90

[bus_factor]
window_days = 180
excluded_authors = ["GitHub", "dependabot[bot]"]

[sizes]
exclude_extensions = ["md", "svg"]

[history]
branch = "main"
exclude_paths = ["*.lock", "vendor/**"]
max_files_per_commit = 50

[rollup]
depth = 3

[database]
path = "out/history.db"
"#;
        let config = ChurnmapConfig::from_toml(toml).unwrap();
        assert_eq!(config.scoring.min_commits, 4);
        assert_eq!(config.scoring.recent_days, 90);
        assert_eq!(config.bus_factor.window_days, 180);
        assert_eq!(
            config.bus_factor.excluded_authors,
            vec!["GitHub", "dependabot[bot]"]
        );
        assert_eq!(config.sizes.exclude_extensions, vec!["md", "svg"]);
        assert_eq!(config.history.branch.as_deref(), Some("main"));
        assert_eq!(config.history.exclude_paths, vec!["*.lock", "vendor/**"]);
        assert_eq!(config.history.max_files_per_commit, Some(50));
        assert_eq!(config.rollup.depth, Some(3));
        assert_eq!(config.database.path, PathBuf::from("out/history.db"));
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = ChurnmapConfig::from_toml("{{invalid}}");
        assert!(result.is_err());
    }

    #[test]
    fn negative_window_is_rejected() {
        let result = ChurnmapConfig::from_toml("[bus_factor]\nwindow_days = -1\n");
        assert!(matches!(result, Err(ChurnmapError::Config(_))));
    }

    #[test]
    fn zero_depth_is_rejected() {
        let result = ChurnmapConfig::from_toml("[rollup]\ndepth = 0\n");
        assert!(matches!(result, Err(ChurnmapError::Config(_))));
    }

    #[test]
    fn resolve_prefers_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("custom.toml");
        std::fs::write(&explicit, "[scoring]\nrecent_days = 30\n").unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[scoring]\nrecent_days = 60\n",
        )
        .unwrap();

        let config = ChurnmapConfig::resolve(Some(&explicit), dir.path()).unwrap();
        assert_eq!(config.scoring.recent_days, 30);

        let config = ChurnmapConfig::resolve(None, dir.path()).unwrap();
        assert_eq!(config.scoring.recent_days, 60);
    }

    #[test]
    fn resolve_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ChurnmapConfig::resolve(None, dir.path()).unwrap();
        assert_eq!(config, ChurnmapConfig::default());
    }

    #[test]
    fn resolve_missing_explicit_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let result = ChurnmapConfig::resolve(Some(&missing), dir.path());
        assert!(matches!(result, Err(ChurnmapError::FileNotFound(_))));
    }
}
