//! Core types, configuration, and error handling for churnmap.
//!
//! This crate provides the shared foundation used by the other churnmap crates:
//! - [`ChurnmapError`]: unified error type using `thiserror`
//! - [`ChurnmapConfig`]: configuration loaded from `.churnmap.toml`
//! - Shared records: [`CommitRecord`], [`FileMetric`], [`OutputFormat`]
//! - Collaborator interfaces: [`CommitSource`], [`FileSizeSource`], [`ResultSink`]

mod config;
mod error;
mod source;
mod types;

pub use config::{
    BusFactorConfig, ChurnmapConfig, DatabaseConfig, HistoryConfig, RollupConfig, ScoringConfig,
    SizeConfig, CONFIG_FILE_NAME,
};
pub use error::ChurnmapError;
pub use source::{CommitSource, FileSizeSource, MemorySource, ResultSink};
pub use types::{
    format_timestamp, parse_timestamp, window_start, CommitRecord, FileMetric, OutputFormat,
    BOT_AUTHOR, TIMESTAMP_FORMAT,
};

/// A convenience `Result` type for churnmap operations.
pub type Result<T> = std::result::Result<T, ChurnmapError>;
