//! Error types for admission and activity-log operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while opening or configuring the activity log.
///
/// These are fatal at startup: a process should not run with a half-usable
/// diagnostic log.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The backing file could not be created, sized, or mapped.
    #[error("activity log io error at {path}: {source}")]
    Io {
        /// File the operation targeted.
        path: PathBuf,
        /// Underlying io failure.
        #[source]
        source: std::io::Error,
    },
    /// Requested capacity is outside the supported range.
    #[error("invalid activity log capacity {0}")]
    InvalidCapacity(usize),
    /// Requested record size is outside the supported range or misaligned.
    #[error("invalid activity log record size {0}")]
    InvalidRecordSize(usize),
    /// An existing file declares a different geometry than requested.
    #[error("activity log {field} mismatch: file declares {found}, configured {expected}")]
    Mismatch {
        /// Header field that differs (`capacity` or `record size`).
        field: &'static str,
        /// Value requested by configuration.
        expected: usize,
        /// Value stored in the existing file.
        found: usize,
    },
    /// An existing file does not carry a recognizable header.
    #[error("activity log header unrecognized: {0}")]
    BadHeader(String),
    /// Configuration values failed validation.
    #[error("invalid tracker configuration: {0}")]
    Invalid(String),
}

/// Errors returned by the admission controller.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The caller's context was cancelled before a unit was acquired.
    #[error("admission canceled")]
    AdmissionCanceled,
    /// The caller's deadline passed before a unit was acquired.
    #[error("admission timed out")]
    AdmissionTimedOut,
    /// Startup configuration failure.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Errors produced while reading a log file offline.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// No log file exists at the given path.
    #[error("activity log not found: {0}")]
    NotFound(PathBuf),
    /// The file exists but is not a readable activity log.
    #[error("activity log format error: {0}")]
    Format(String),
    /// Other io failure while opening or mapping the file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
