//! Error types for the orchestrator
//!
//! Three families, none of them fatal:
//! - Backend call rejections (the request itself failed)
//! - Local precondition rejections (no backend call was made)
//! - Configuration and wire decoding failures

use std::path::PathBuf;

/// A backend call settled with an error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Backend refused the request
    #[error("rejected: {0}")]
    Rejected(String),

    /// Transport / IPC failure
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Backend cancelled the work
    #[error("cancelled")]
    Cancelled,

    /// Stop requested while the backend had no scan
    #[error("no scan is currently running")]
    NoScanRunning,
}

/// A user operation refused before any backend call
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejected {
    /// Scan requested without an artist URL
    #[error("artist URL is empty")]
    EmptyUrl,

    /// A scan from this client is still running
    #[error("a scan is already running")]
    ScanAlreadyRunning,

    /// Batch requested without a destination folder
    #[error("no download folder selected")]
    EmptyFolder,

    /// Batch requested with nothing to download
    #[error("no releases selected")]
    EmptySelection,

    /// A download batch is still running
    #[error("a download batch is already running")]
    BatchAlreadyRunning,
}

impl Rejected {
    /// Message appended to the log as a warning
    #[must_use]
    pub fn log_message(self) -> &'static str {
        match self {
            Self::EmptyUrl => "Please enter an artist URL first",
            Self::ScanAlreadyRunning => "A scan is already running",
            Self::EmptyFolder => "Please select a download folder first",
            Self::EmptySelection => "No albums selected",
            Self::BatchAlreadyRunning => "Downloads are already running",
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for [`crate::OrchestratorConfig`]
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Notification decoding errors
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// A line was not a valid notification
    #[error("line {line}: {source}")]
    Malformed {
        /// 1-based line number
        line: usize,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },
}
