//! Download batch controller
//!
//! Tracks one batch over a snapshot of release ids. Each item ends in
//! exactly one of downloaded / failed, so the counters never exceed the
//! snapshot size.
//!
//! Terminal notifications decide an item's outcome. The settlement of the
//! item's own download call is only a fallback, consulted when the work list
//! has drained and no terminal notification arrived for that item.

use crate::error::{BackendError, Rejected};
use crate::log_sink::LogSink;
use crate::state_machine::{transition, BatchPhase};
use crate::types::{AudioFormat, ReleaseId};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Per-item progress
#[derive(Debug, Clone, PartialEq, Eq)]
enum ItemState {
    Queued,
    Started,
    CallSucceeded,
    CallRejected(String),
    Downloaded,
    Failed,
}

impl ItemState {
    fn is_terminal(&self) -> bool {
        matches!(self, Self::Downloaded | Self::Failed)
    }
}

/// Outcome counters for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchCounters {
    /// Items reported downloaded
    pub downloaded: usize,
    /// Items reported failed
    pub failed: usize,
    /// Reserved; no backend notification populates it yet
    pub skipped: usize,
    /// Items in the snapshot
    pub total: usize,
}

impl BatchCounters {
    /// Items with a final outcome
    #[inline]
    #[must_use]
    pub fn settled(&self) -> usize {
        self.downloaded + self.failed + self.skipped
    }
}

/// Live batch progress for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    /// Counters so far
    pub counters: BatchCounters,
    /// Item most recently started
    pub current: Option<ReleaseId>,
    /// Latest advisory progress text for `current`
    pub last_message: Option<String>,
}

/// Download batch state
#[derive(Debug, Clone, Default)]
pub struct BatchController {
    phase: BatchPhase,
    folder: Option<PathBuf>,
    format: AudioFormat,
    items: IndexMap<ReleaseId, ItemState>,
    skipped: usize,
    current: Option<ReleaseId>,
    last_message: Option<String>,
}

impl BatchController {
    /// Create an idle controller
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> BatchPhase {
        self.phase
    }

    /// True while the work list is being processed
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.phase == BatchPhase::Running
    }

    /// Destination of the current or last batch
    #[inline]
    #[must_use]
    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    /// Format of the current or last batch
    #[inline]
    #[must_use]
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Snapshot ids of the current or last batch, in work order
    pub fn work_list(&self) -> impl Iterator<Item = &ReleaseId> {
        self.items.keys()
    }

    /// Start a batch over `ids`.
    ///
    /// Duplicate ids are collapsed, first occurrence kept. Returns the work
    /// list the driver must process.
    ///
    /// # Errors
    /// `BatchAlreadyRunning`, `EmptyFolder` or `EmptySelection`; counters and
    /// phase are left untouched and a warning is logged.
    pub fn begin(
        &mut self,
        folder: &Path,
        ids: impl IntoIterator<Item = ReleaseId>,
        format: AudioFormat,
        log: &mut LogSink,
    ) -> Result<Vec<ReleaseId>, Rejected> {
        let items: IndexMap<ReleaseId, ItemState> =
            ids.into_iter().map(|id| (id, ItemState::Queued)).collect();

        let rejection = if self.is_running() {
            Some(Rejected::BatchAlreadyRunning)
        } else if folder.as_os_str().is_empty() {
            Some(Rejected::EmptyFolder)
        } else if items.is_empty() {
            Some(Rejected::EmptySelection)
        } else {
            None
        };
        if let Some(rejection) = rejection {
            log.warning(rejection.log_message());
            return Err(rejection);
        }

        transition(&mut self.phase, BatchPhase::Running);
        self.folder = Some(folder.to_path_buf());
        self.format = format;
        self.items = items;
        self.skipped = 0;
        self.current = None;
        self.last_message = None;

        log.info(format!(
            "Downloading {} albums to {} ({format})",
            self.items.len(),
            folder.display()
        ));
        Ok(self.items.keys().cloned().collect())
    }

    /// `download:start`
    pub fn on_started(&mut self, id: &ReleaseId, log: &mut LogSink) {
        log.info(format!("Starting download: {id}"));
        let tracked = match self.tracked_mut(id) {
            Some(state) => {
                if !state.is_terminal() {
                    *state = ItemState::Started;
                }
                true
            }
            None => false,
        };
        if tracked {
            self.current = Some(id.clone());
            self.last_message = None;
        }
    }

    /// `download:progress`; advisory only
    pub fn on_progress(&mut self, id: &ReleaseId, message: &str) {
        tracing::debug!(%id, "{message}");
        if self.tracked_mut(id).is_some() {
            self.current = Some(id.clone());
            self.last_message = Some(message.to_owned());
        }
    }

    /// `download:complete`
    pub fn on_completed(&mut self, id: &ReleaseId, log: &mut LogSink) {
        log.success(format!("Download complete: {id}"));
        self.settle_by_notification(id, ItemState::Downloaded);
    }

    /// `download:error`
    pub fn on_failed(&mut self, id: &ReleaseId, error: &str, log: &mut LogSink) {
        log.error(format!("Download failed: {id}: {error}"));
        self.settle_by_notification(id, ItemState::Failed);
    }

    /// The download call for `id` settled; recorded as fallback only
    pub fn on_call_settled(&mut self, id: &ReleaseId, result: &Result<(), BackendError>) {
        let Some(state) = self.tracked_mut(id) else {
            return;
        };
        if state.is_terminal() {
            return;
        }
        *state = match result {
            Ok(()) => ItemState::CallSucceeded,
            Err(e) => ItemState::CallRejected(e.to_string()),
        };
    }

    /// Every call in the work list has settled.
    ///
    /// Resolves items still lacking a terminal notification from their call
    /// outcome, moves to Idle and returns the final counters. Returns `None`
    /// if no batch was running.
    pub fn finish(&mut self, log: &mut LogSink) -> Option<BatchCounters> {
        if !self.is_running() {
            tracing::debug!("drain signal without a running batch");
            return None;
        }

        for (id, state) in &mut self.items {
            match state {
                ItemState::Downloaded | ItemState::Failed => {}
                ItemState::CallSucceeded => {
                    tracing::debug!(%id, "no completion notification; call succeeded");
                    *state = ItemState::Downloaded;
                }
                ItemState::CallRejected(error) => {
                    log.error(format!("Download failed: {id}: {error}"));
                    *state = ItemState::Failed;
                }
                ItemState::Queued | ItemState::Started => {
                    log.error(format!("Download failed: {id}: no outcome reported"));
                    *state = ItemState::Failed;
                }
            }
        }

        transition(&mut self.phase, BatchPhase::Idle);
        self.current = None;
        self.last_message = None;

        let counters = self.counters();
        log.success(format!(
            "All downloads finished ({} downloaded, {} failed, {} skipped)",
            counters.downloaded, counters.failed, counters.skipped
        ));
        Some(counters)
    }

    /// Counters derived from item states
    #[must_use]
    pub fn counters(&self) -> BatchCounters {
        let mut counters = BatchCounters {
            skipped: self.skipped,
            total: self.items.len(),
            ..BatchCounters::default()
        };
        for state in self.items.values() {
            match state {
                ItemState::Downloaded => counters.downloaded += 1,
                ItemState::Failed => counters.failed += 1,
                _ => {}
            }
        }
        counters
    }

    /// Progress view while running
    #[must_use]
    pub fn progress(&self) -> Option<BatchProgress> {
        self.is_running().then(|| BatchProgress {
            counters: self.counters(),
            current: self.current.clone(),
            last_message: self.last_message.clone(),
        })
    }

    fn tracked_mut(&mut self, id: &ReleaseId) -> Option<&mut ItemState> {
        if !self.is_running() {
            return None;
        }
        self.items.get_mut(id)
    }

    fn settle_by_notification(&mut self, id: &ReleaseId, outcome: ItemState) {
        match self.tracked_mut(id) {
            Some(state) if !state.is_terminal() => *state = outcome,
            Some(_) => tracing::debug!(%id, "duplicate terminal notification"),
            None => tracing::debug!(%id, "download notification outside the running batch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    fn ids(list: &[&str]) -> Vec<ReleaseId> {
        list.iter().map(|s| ReleaseId::from(*s)).collect()
    }

    fn running(list: &[&str]) -> (BatchController, LogSink) {
        let mut batch = BatchController::new();
        let mut log = LogSink::new(false);
        batch
            .begin(Path::new("/music"), ids(list), AudioFormat::Flac, &mut log)
            .unwrap();
        (batch, log)
    }

    #[test]
    fn begin_rejects_without_touching_counters() {
        let (mut batch, mut log) = running(&["x"]);
        batch.on_completed(&"x".into(), &mut log);
        batch.finish(&mut log);
        let before = batch.counters();

        let err = batch.begin(Path::new(""), ids(&["x"]), AudioFormat::Flac, &mut log);
        assert_eq!(err, Err(Rejected::EmptyFolder));
        let err = batch.begin(Path::new("/music"), Vec::new(), AudioFormat::Flac, &mut log);
        assert_eq!(err, Err(Rejected::EmptySelection));

        assert_eq!(batch.counters(), before);
        assert_eq!(batch.phase(), BatchPhase::Idle);
        assert_eq!(log.last().unwrap().severity, Severity::Warning);
    }

    #[test]
    fn begin_rejects_while_running() {
        let (mut batch, mut log) = running(&["x"]);
        let err = batch.begin(Path::new("/music"), ids(&["y"]), AudioFormat::Flac, &mut log);
        assert_eq!(err, Err(Rejected::BatchAlreadyRunning));
        assert_eq!(batch.work_list().count(), 1);
    }

    #[test]
    fn begin_collapses_duplicates() {
        let mut batch = BatchController::new();
        let mut log = LogSink::new(false);
        let work = batch
            .begin(Path::new("/m"), ids(&["a", "b", "a"]), AudioFormat::Mp3320, &mut log)
            .unwrap();
        assert_eq!(work, ids(&["a", "b"]));
        assert_eq!(batch.counters().total, 2);
        assert_eq!(batch.format(), AudioFormat::Mp3320);
    }

    #[test]
    fn mixed_outcome_batch() {
        let (mut batch, mut log) = running(&["x", "y"]);
        batch.on_started(&"x".into(), &mut log);
        batch.on_completed(&"x".into(), &mut log);
        batch.on_call_settled(&"x".into(), &Ok(()));
        batch.on_started(&"y".into(), &mut log);
        batch.on_failed(&"y".into(), "network", &mut log);
        batch.on_call_settled(&"y".into(), &Err(BackendError::Rejected("network".into())));

        let counters = batch.finish(&mut log).unwrap();
        assert_eq!(
            counters,
            BatchCounters {
                downloaded: 1,
                failed: 1,
                skipped: 0,
                total: 2
            }
        );
        // the rejection must not add a second error line
        assert_eq!(log.count(Severity::Error), 1);
        assert!(!batch.is_running());
    }

    #[test]
    fn duplicate_terminal_notifications_count_once() {
        let (mut batch, mut log) = running(&["x"]);
        batch.on_completed(&"x".into(), &mut log);
        batch.on_completed(&"x".into(), &mut log);
        batch.on_failed(&"x".into(), "late", &mut log);
        assert_eq!(batch.counters().downloaded, 1);
        assert_eq!(batch.counters().failed, 0);
    }

    #[test]
    fn late_notification_overrides_call_outcome() {
        let (mut batch, mut log) = running(&["x"]);
        batch.on_call_settled(&"x".into(), &Err(BackendError::Unavailable("ipc".into())));
        batch.on_completed(&"x".into(), &mut log);
        let counters = batch.finish(&mut log).unwrap();
        assert_eq!(counters.downloaded, 1);
        assert_eq!(counters.failed, 0);
    }

    #[test]
    fn call_outcome_fills_missing_notifications() {
        let (mut batch, mut log) = running(&["ok", "bad"]);
        batch.on_call_settled(&"ok".into(), &Ok(()));
        batch.on_call_settled(&"bad".into(), &Err(BackendError::Unavailable("ipc".into())));

        let counters = batch.finish(&mut log).unwrap();
        assert_eq!(counters.downloaded, 1);
        assert_eq!(counters.failed, 1);
        assert_eq!(counters.settled(), counters.total);
        assert!(log
            .entries()
            .iter()
            .any(|e| e.message == "Download failed: bad: backend unavailable: ipc"));
    }

    #[test]
    fn foreign_ids_are_logged_not_counted() {
        let (mut batch, mut log) = running(&["x"]);
        batch.on_completed(&"stranger".into(), &mut log);
        assert_eq!(batch.counters().downloaded, 0);
        assert_eq!(log.last().unwrap().message, "Download complete: stranger");
    }

    #[test]
    fn progress_tracks_current_item() {
        let (mut batch, mut log) = running(&["x"]);
        batch.on_started(&"x".into(), &mut log);
        batch.on_progress(&"x".into(), "Selected format: flac");

        let progress = batch.progress().unwrap();
        assert_eq!(progress.current, Some("x".into()));
        assert_eq!(progress.last_message.as_deref(), Some("Selected format: flac"));

        batch.on_completed(&"x".into(), &mut log);
        batch.finish(&mut log);
        assert!(batch.progress().is_none());
    }

    #[test]
    fn finish_without_batch_is_ignored() {
        let mut batch = BatchController::new();
        let mut log = LogSink::new(false);
        assert!(batch.finish(&mut log).is_none());
        assert!(log.is_empty());
    }
}
