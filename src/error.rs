//! Error types for kg-sweep
//!
//! Every message names the offending input so the operator can fix the
//! sweep without reading the source.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// kg-sweep error types
#[derive(Error, Debug)]
pub enum Error {
    /// Directory name does not follow `{version}_lr{lr}_bs{bs}_ep{epoch}`
    #[error("Invalid run name '{name}': {reason}")]
    InvalidRunName {
        /// Name that failed to parse
        name: String,
        /// What did not match
        reason: String,
    },

    /// Metrics file line could not be parsed
    #[error("Metrics parse error at line {line}: {reason}")]
    MetricsParse {
        /// 1-based line number
        line: usize,
        /// What went wrong
        reason: String,
    },

    /// Metrics file has no "average metrics" mapping
    #[error("Metrics document has no '{0}' mapping")]
    MissingAverageMetrics(String),

    /// Requested dataset version is not present under the dataset root
    #[error("Unknown dataset version '{version}'\nAvailable versions under {root}: {available}")]
    UnknownVersion {
        /// Requested version
        version: String,
        /// Dataset root that was searched
        root: PathBuf,
        /// Comma-separated list of versions found
        available: String,
    },

    /// Invalid sweep configuration
    #[error("Invalid sweep configuration: {0}")]
    Config(String),

    /// External process exited unsuccessfully and the sweep was told to abort
    #[error("Run '{run}' failed with {status}\nRe-run the sweep to retry unfinished runs.")]
    LaunchFailed {
        /// Run (or evaluation target) name
        run: String,
        /// Exit description
        status: String,
    },

    /// Results table could not be assembled or written
    #[error("Results table error: {0}")]
    Table(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// JSON (config file or report) error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`Error::InvalidRunName`].
    pub(crate) fn invalid_run_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRunName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Error::MetricsParse`].
    pub(crate) fn metrics_parse(line: usize, reason: impl Into<String>) -> Self {
        Self::MetricsParse {
            line,
            reason: reason.into(),
        }
    }
}
