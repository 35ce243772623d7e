//! Orchestrator configuration
//!
//! Startup settings only. Nothing here is written back to disk.

use crate::error::ConfigError;
use crate::types::AudioFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Format requested for every download in a batch
    pub download_format: AudioFormat,
    /// Initial destination folder
    pub download_folder: Option<PathBuf>,
    /// Mirror every log sink entry to `tracing`
    pub mirror_log_to_tracing: bool,
}

impl OrchestratorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With download format
    #[inline]
    #[must_use]
    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.download_format = format;
        self
    }

    /// With initial download folder
    #[inline]
    #[must_use]
    pub fn with_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.download_folder = Some(folder.into());
        self
    }

    /// With log mirroring toggled
    #[inline]
    #[must_use]
    pub fn with_log_mirroring(mut self, enabled: bool) -> Self {
        self.mirror_log_to_tracing = enabled;
        self
    }

    /// Parse from TOML text; missing keys take their defaults
    ///
    /// # Errors
    /// `ConfigError::Parse` on invalid TOML or unknown values
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// `ConfigError::Read` if the file cannot be read, `ConfigError::Parse` otherwise
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            download_format: AudioFormat::Flac,
            download_folder: None,
            mirror_log_to_tracing: true,
        }
    }
}
