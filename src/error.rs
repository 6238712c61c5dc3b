//! # Error Types
//!
//! Fatal run errors and the per-profile read errors that the pipeline
//! isolates at the profile boundary.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while reading a single profile's history database.
///
/// These never abort a run on their own; the pipeline reports them and moves
/// on to the next profile.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to copy {path}: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open history copy: {0}")]
    Open(#[source] rusqlite::Error),
    #[error("history query failed: {0}")]
    Query(#[source] rusqlite::Error),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no browser profile folders found in {}", base_dir.display())]
    NotFound { base_dir: PathBuf },
    #[error("no history records could be extracted from any profile")]
    NoData,
    #[error("output path is not a directory: {}", .0.display())]
    OutputNotDirectory(PathBuf),
    #[error("{0} records exceed the worksheet row limit")]
    TooManyRows(usize),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid profile pattern: {0}")]
    Pattern(#[from] globset::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("cannot resolve the user profile directory (USERPROFILE unset and no home directory)")]
    NoUserProfile,
}
