use std::path::PathBuf;

/// Errors that can occur across the churnmap crates.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary crate surfaces it through `miette` at the boundary.
///
/// # Examples
///
/// ```
/// use churnmap_core::ChurnmapError;
///
/// let err = ChurnmapError::Config("unknown section".into());
/// assert!(err.to_string().contains("unknown section"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ChurnmapError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git operation failure.
    #[error("git error: {0}")]
    Git(String),

    /// SQLite storage failure.
    #[error("database error: {0}")]
    Database(String),

    /// A commit row carries a timestamp that is not ISO-8601 with seconds.
    #[error("malformed timestamp {value:?} on {file} ({commit_hash})")]
    #[diagnostic(help("expected a timestamp like 2024-03-01T12:30:00"))]
    MalformedTimestamp {
        /// Commit the row belongs to.
        commit_hash: String,
        /// File the row touches.
        file: String,
        /// The unparseable timestamp text.
        value: String,
    },

    /// A logarithm was requested with a base that is not greater than one.
    #[error("logarithm base must be greater than 1, got {0}")]
    DegenerateLogBase(u64),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}
