//! Session state and the single event dispatcher
//!
//! `Session` owns every piece of orchestrator state. Its methods are the only
//! mutation entry points: user operations (`begin_scan`, `toggle`, ...) and
//! [`Session::apply`] for events coming off the queue. Presentation reads
//! [`SessionView`] snapshots.

use crate::batch::{BatchController, BatchProgress};
use crate::catalog::Catalog;
use crate::config::OrchestratorConfig;
use crate::error::{BackendError, Rejected};
use crate::log_sink::{LogEntry, LogSink};
use crate::scan::ScanController;
use crate::selection::SelectionSet;
use crate::snapshot::Snapshot;
use crate::summary::SessionSummary;
use crate::types::{AudioFormat, Release, ReleaseId};
use crate::wire::Notification;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Everything the dispatcher applies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Backend notification
    Notification(Notification),
    /// The start-scan call failed
    ScanCallRejected(BackendError),
    /// The stop-scan call succeeded
    StopCallAccepted,
    /// The stop-scan call failed
    StopCallRejected(BackendError),
    /// One download call settled
    DownloadCallSettled {
        /// Release the call was for
        id: ReleaseId,
        /// Call outcome
        result: Result<(), BackendError>,
    },
    /// Every download call of the running batch has settled
    BatchDrained,
}

impl From<Notification> for Event {
    fn from(n: Notification) -> Self {
        Self::Notification(n)
    }
}

/// Read-only snapshot for the presentation layer
///
/// The catalog, selection and log share storage with the session, so taking
/// a view does not copy them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// A scan is requested or running
    pub scanning: bool,
    /// Artist URL of the current or last scan
    pub scan_url: Option<String>,
    /// A download batch is running
    pub downloading: bool,
    /// Catalog in discovery order
    pub releases: Snapshot<Release>,
    /// Selected ids present in the catalog, in catalog order
    pub selected: Snapshot<ReleaseId>,
    /// Destination folder
    pub folder: Option<PathBuf>,
    /// Last batch summary
    pub summary: SessionSummary,
    /// Running batch progress
    pub batch: Option<BatchProgress>,
    /// Full log
    pub log: Snapshot<LogEntry>,
}

/// Orchestrator state
#[derive(Debug, Clone)]
pub struct Session {
    log: LogSink,
    catalog: Catalog,
    selection: SelectionSet,
    selected: Snapshot<ReleaseId>,
    scan: ScanController,
    batch: BatchController,
    summary_visible: bool,
    folder: Option<PathBuf>,
    format: AudioFormat,
}

impl Session {
    /// Fresh session: empty catalog, empty log
    #[must_use]
    pub fn new(config: &OrchestratorConfig) -> Self {
        Self {
            log: LogSink::new(config.mirror_log_to_tracing),
            catalog: Catalog::new(),
            selection: SelectionSet::new(),
            selected: Snapshot::default(),
            scan: ScanController::new(),
            batch: BatchController::new(),
            summary_visible: false,
            folder: config.download_folder.clone(),
            format: config.download_format,
        }
    }

    /// Log sink
    #[inline]
    #[must_use]
    pub fn log(&self) -> &LogSink {
        &self.log
    }

    /// Catalog store
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Selection set
    #[inline]
    #[must_use]
    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// Scan controller
    #[inline]
    #[must_use]
    pub fn scan(&self) -> &ScanController {
        &self.scan
    }

    /// Batch controller
    #[inline]
    #[must_use]
    pub fn batch(&self) -> &BatchController {
        &self.batch
    }

    /// Destination folder
    #[inline]
    #[must_use]
    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    /// Summary projection
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary::project(&self.batch, self.summary_visible)
    }

    /// Start a scan locally
    ///
    /// # Errors
    /// See [`ScanController::begin`]
    pub fn begin_scan(&mut self, url: &str) -> Result<(), Rejected> {
        self.scan
            .begin(url, &mut self.catalog, &mut self.selection, &mut self.log)?;
        self.summary_visible = false;
        self.refresh_selected();
        Ok(())
    }

    /// Flip selection of `id`
    pub fn toggle(&mut self, id: &ReleaseId) -> bool {
        let selected = self.selection.toggle(id);
        self.refresh_selected();
        selected
    }

    /// Select every non-paid release, returning the selection size
    pub fn select_all_eligible(&mut self) -> usize {
        self.selection
            .select_all_eligible(&self.catalog, Release::is_eligible);
        self.refresh_selected();
        self.selection.len()
    }

    /// Deselect everything
    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.refresh_selected();
    }

    /// Set the destination folder; an empty path clears it
    pub fn set_folder(&mut self, folder: PathBuf) {
        self.folder = (!folder.as_os_str().is_empty()).then_some(folder);
    }

    /// Record a picked folder
    pub fn folder_picked(&mut self, folder: PathBuf) {
        self.log.info(format!("Selected folder: {}", folder.display()));
        self.set_folder(folder);
    }

    /// Record a failed folder pick
    pub fn folder_pick_failed(&mut self, error: &BackendError) {
        self.log.error(format!("Error selecting folder: {error}"));
    }

    /// Selected ids in catalog order
    #[must_use]
    pub fn selected_work_list(&self) -> Vec<ReleaseId> {
        self.selection.ordered_by(&self.catalog)
    }

    /// Start a batch over `ids`; returns the snapshot work list and format
    ///
    /// # Errors
    /// See [`BatchController::begin`]
    pub fn begin_batch(
        &mut self,
        folder: &Path,
        ids: impl IntoIterator<Item = ReleaseId>,
    ) -> Result<(Vec<ReleaseId>, AudioFormat), Rejected> {
        let work = self.batch.begin(folder, ids, self.format, &mut self.log)?;
        self.summary_visible = false;
        Ok((work, self.format))
    }

    /// Apply one event. Never fails; every path ends in a stable state.
    pub fn apply(&mut self, event: Event) {
        match event {
            Event::Notification(n) => self.apply_notification(n),
            Event::ScanCallRejected(e) => self.scan.on_start_rejected(&e, &mut self.log),
            Event::StopCallAccepted => self.scan.on_stop_accepted(),
            Event::StopCallRejected(e) => self.scan.on_stop_rejected(&e, &mut self.log),
            Event::DownloadCallSettled { id, result } => {
                self.batch.on_call_settled(&id, &result);
            }
            Event::BatchDrained => {
                if self.batch.finish(&mut self.log).is_some() {
                    self.summary_visible = true;
                }
            }
        }
    }

    fn refresh_selected(&mut self) {
        self.selected = self.selected_work_list().into();
    }

    fn apply_notification(&mut self, n: Notification) {
        tracing::trace!(event = n.name(), "applying notification");
        let catalog_event = matches!(
            n,
            Notification::ScanDiscovered(_) | Notification::ScanCompleted(_)
        );
        match n {
            Notification::ScanStarted(url) => self.scan.on_started(&url, &mut self.log),
            Notification::ScanDiscovered(release) => {
                self.scan
                    .on_discovered(release, &mut self.catalog, &mut self.log);
            }
            Notification::ScanCompleted(releases) => self.scan.on_completed(
                releases,
                &mut self.catalog,
                &mut self.selection,
                &mut self.log,
            ),
            Notification::ScanFailed(error) => self.scan.on_failed(&error, &mut self.log),
            Notification::ScanStopped(count) => self.scan.on_stopped(count, &mut self.log),
            Notification::DownloadStarted(id) => self.batch.on_started(&id, &mut self.log),
            Notification::DownloadProgress(p) => self.batch.on_progress(&p.url, &p.message),
            Notification::DownloadCompleted(id) => self.batch.on_completed(&id, &mut self.log),
            Notification::DownloadFailed(f) => {
                self.batch.on_failed(&f.url, &f.error, &mut self.log);
            }
            Notification::LogError(message) => self.log.error(message),
        }
        if catalog_event {
            self.refresh_selected();
        }
    }

    /// Snapshot for presentation
    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView {
            scanning: self.scan.is_scanning(),
            scan_url: self.scan.url().map(str::to_owned),
            downloading: self.batch.is_running(),
            releases: self.catalog.snapshot(),
            selected: self.selected.clone(),
            folder: self.folder.clone(),
            summary: self.summary(),
            batch: self.batch.progress(),
            log: self.log.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AcquisitionStatus, Severity};
    use crate::wire::DownloadFailure;

    fn session() -> Session {
        Session::new(&OrchestratorConfig::new().with_log_mirroring(false))
    }

    fn release(id: &str, status: AcquisitionStatus) -> Release {
        Release::new(id, id, status)
    }

    #[test]
    fn new_session_is_empty() {
        let s = session();
        let view = s.view();
        assert!(view.releases.is_empty());
        assert!(view.log.is_empty());
        assert!(!view.scanning && !view.downloading);
        assert!(!view.summary.visible);
    }

    #[test]
    fn select_all_eligible_skips_paid() {
        let mut s = session();
        s.begin_scan("u").unwrap();
        s.apply(Notification::ScanCompleted(vec![
            release("a", AcquisitionStatus::Paid),
            release("b", AcquisitionStatus::Free),
            release("c", AcquisitionStatus::NameYourPrice),
        ])
        .into());

        assert_eq!(s.select_all_eligible(), 2);
        assert_eq!(s.selected_work_list(), vec![ReleaseId::from("b"), ReleaseId::from("c")]);
    }

    #[test]
    fn batch_completion_shows_summary_and_new_scan_hides_it() {
        let mut s = session();
        s.begin_batch(Path::new("/m"), vec!["x".into(), "y".into()]).unwrap();
        s.apply(Notification::DownloadCompleted("x".into()).into());
        s.apply(
            Notification::DownloadFailed(DownloadFailure {
                url: "y".into(),
                error: "network".into(),
            })
            .into(),
        );
        s.apply(Event::BatchDrained);

        let summary = s.summary();
        assert!(summary.visible);
        assert_eq!((summary.downloaded, summary.failed, summary.skipped), (1, 1, 0));

        s.begin_scan("u").unwrap();
        assert!(!s.summary().visible);
    }

    #[test]
    fn rejected_batch_keeps_previous_summary() {
        let mut s = session();
        s.begin_batch(Path::new("/m"), vec!["x".into()]).unwrap();
        s.apply(Notification::DownloadCompleted("x".into()).into());
        s.apply(Event::BatchDrained);

        assert!(s.begin_batch(Path::new(""), vec!["x".into()]).is_err());
        assert!(s.summary().visible);
        assert_eq!(s.summary().downloaded, 1);
    }

    #[test]
    fn stop_rejection_does_not_end_scan() {
        let mut s = session();
        s.begin_scan("u").unwrap();
        s.apply(Notification::ScanStarted("u".into()).into());
        s.apply(Event::StopCallRejected(BackendError::NoScanRunning));
        s.apply(Notification::ScanDiscovered(release("a", AcquisitionStatus::Free)).into());
        s.apply(Notification::ScanCompleted(Vec::new()).into());

        let view = s.view();
        assert!(!view.scanning);
        assert_eq!(view.releases.len(), 1);
        assert_eq!(view.log.last().unwrap().message, "Found 1 albums");
    }

    #[test]
    fn view_selection_follows_catalog_changes() {
        let mut s = session();
        s.begin_scan("u").unwrap();
        s.toggle(&"b".into());
        assert!(s.view().selected.is_empty());

        s.apply(Notification::ScanDiscovered(release("a", AcquisitionStatus::Free)).into());
        s.apply(Notification::ScanDiscovered(release("b", AcquisitionStatus::Paid)).into());
        assert_eq!(s.view().selected, vec![ReleaseId::from("b")]);

        s.apply(
            Notification::ScanCompleted(vec![release("a", AcquisitionStatus::Free)]).into(),
        );
        assert!(s.view().selected.is_empty());

        s.select_all_eligible();
        let view = s.view();
        assert_eq!(view.selected, vec![ReleaseId::from("a")]);
        s.clear_selection();
        assert_eq!(view.selected.len(), 1);
        assert!(s.view().selected.is_empty());
    }

    #[test]
    fn log_error_passthrough() {
        let mut s = session();
        s.apply(Notification::LogError("Failed to init browser".into()).into());
        let last = s.log().last().unwrap();
        assert_eq!(last.message, "Failed to init browser");
        assert_eq!(last.severity, Severity::Error);
    }

    #[test]
    fn folder_handling() {
        let mut s = session();
        s.folder_picked(PathBuf::from("/music"));
        assert_eq!(s.folder(), Some(Path::new("/music")));
        assert_eq!(s.log().last().unwrap().message, "Selected folder: /music");

        s.set_folder(PathBuf::new());
        assert!(s.folder().is_none());

        s.folder_pick_failed(&BackendError::Cancelled);
        assert_eq!(s.log().last().unwrap().message, "Error selecting folder: cancelled");
    }
}
