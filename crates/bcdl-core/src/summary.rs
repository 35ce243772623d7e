//! Session summary shown after a batch completes

use crate::batch::{BatchController, BatchCounters};
use serde::Serialize;

/// Read-only projection of the last batch's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    /// Releases downloaded
    pub downloaded: usize,
    /// Releases failed
    pub failed: usize,
    /// Releases skipped
    pub skipped: usize,
    /// Whether the summary panel is shown
    pub visible: bool,
}

impl SessionSummary {
    /// Project the batch counters
    #[must_use]
    pub fn project(batch: &BatchController, visible: bool) -> Self {
        Self::from_counters(batch.counters(), visible)
    }

    /// Build from raw counters
    #[must_use]
    pub fn from_counters(counters: BatchCounters, visible: bool) -> Self {
        Self {
            downloaded: counters.downloaded,
            failed: counters.failed,
            skipped: counters.skipped,
            visible,
        }
    }

    /// One-line rendering for the status panel
    #[must_use]
    pub fn line(&self) -> String {
        format!(
            "Downloaded: {} • Failed: {} • Skipped: {}",
            self.downloaded, self.failed, self.skipped
        )
    }
}
