//! Scan session controller
//!
//! Phases: Idle -> Scanning -> Idle. The local request moves to Scanning so
//! a second request is refused without reaching the backend; every move back
//! to Idle is driven by a notification (or by the local fallback when the
//! start call itself is rejected).

use crate::catalog::Catalog;
use crate::error::{BackendError, Rejected};
use crate::log_sink::LogSink;
use crate::selection::SelectionSet;
use crate::state_machine::{transition, ScanPhase};
use crate::types::Release;

/// Scan session state
#[derive(Debug, Clone, Default)]
pub struct ScanController {
    phase: ScanPhase,
    url: Option<String>,
    stop_requested: bool,
}

impl ScanController {
    /// Create an idle controller
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// True while a scan is requested or running
    #[inline]
    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.phase == ScanPhase::Scanning
    }

    /// Artist URL of the current or last scan
    #[inline]
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// True once a stop was accepted by the backend and not yet confirmed
    #[inline]
    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Local start: check preconditions, reset catalog and selection.
    ///
    /// # Errors
    /// `Rejected::EmptyUrl` or `Rejected::ScanAlreadyRunning`; nothing is
    /// mutated except the warning appended to `log`.
    pub fn begin(
        &mut self,
        url: &str,
        catalog: &mut Catalog,
        selection: &mut SelectionSet,
        log: &mut LogSink,
    ) -> Result<(), Rejected> {
        let url = url.trim();
        let rejection = if url.is_empty() {
            Some(Rejected::EmptyUrl)
        } else if self.is_scanning() {
            Some(Rejected::ScanAlreadyRunning)
        } else {
            None
        };
        if let Some(rejection) = rejection {
            log.warning(rejection.log_message());
            return Err(rejection);
        }

        catalog.reset();
        selection.clear();
        transition(&mut self.phase, ScanPhase::Scanning);
        self.url = Some(url.to_owned());
        self.stop_requested = false;
        Ok(())
    }

    /// The start call itself failed
    pub fn on_start_rejected(&mut self, error: &BackendError, log: &mut LogSink) {
        if !self.is_scanning() {
            // a scan:error notification already ended the session
            tracing::debug!("start rejection after scan ended: {error}");
            return;
        }
        self.finish();
        log.error(format!("Scan error: {error}"));
    }

    /// The backend accepted a stop request; Idle waits for `scan:stopped`
    pub fn on_stop_accepted(&mut self) {
        if self.is_scanning() {
            self.stop_requested = true;
        }
    }

    /// The stop call failed
    pub fn on_stop_rejected(&mut self, error: &BackendError, log: &mut LogSink) {
        // phase is left alone; only scan:stopped, scan:complete or scan:error end a scan
        self.stop_requested = false;
        match error {
            BackendError::NoScanRunning => log.warning("No scan is running"),
            _ => log.error(format!("Failed to stop scan: {error}")),
        }
    }

    /// `scan:start`
    pub fn on_started(&mut self, url: &str, log: &mut LogSink) {
        transition(&mut self.phase, ScanPhase::Scanning);
        if self.url.is_none() {
            self.url = Some(url.to_owned());
        }
        log.info(format!("Scanning artist: {url}"));
    }

    /// `scan:album_found`
    pub fn on_discovered(&mut self, release: Release, catalog: &mut Catalog, log: &mut LogSink) {
        if !self.is_scanning() {
            tracing::debug!(id = %release.id, "dropping discovery outside a scan");
            return;
        }
        let title = release.title.clone();
        if catalog.upsert_one(release) {
            log.info(format!("Found album: {title}"));
        } else {
            tracing::debug!(%title, "duplicate discovery");
        }
    }

    /// `scan:complete`
    ///
    /// An empty result list means the backend delivered incrementally only;
    /// the discovered catalog is kept.
    pub fn on_completed(
        &mut self,
        releases: Vec<Release>,
        catalog: &mut Catalog,
        selection: &mut SelectionSet,
        log: &mut LogSink,
    ) {
        self.finish();
        let count = if releases.is_empty() {
            catalog.len()
        } else {
            let kept = catalog.replace_all(releases);
            selection.retain_in(catalog);
            kept
        };
        log.success(format!("Found {count} albums"));
    }

    /// `scan:error`; whatever was discovered stays
    pub fn on_failed(&mut self, error: &str, log: &mut LogSink) {
        self.finish();
        log.error(format!("Scan error: {error}"));
    }

    /// `scan:stopped`
    pub fn on_stopped(&mut self, count: usize, log: &mut LogSink) {
        self.finish();
        log.warning(format!("Scan stopped. Found {count} albums."));
    }

    fn finish(&mut self) {
        transition(&mut self.phase, ScanPhase::Idle);
        self.stop_requested = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AcquisitionStatus, ReleaseId, Severity};

    struct Parts {
        scan: ScanController,
        catalog: Catalog,
        selection: SelectionSet,
        log: LogSink,
    }

    fn parts() -> Parts {
        Parts {
            scan: ScanController::new(),
            catalog: Catalog::new(),
            selection: SelectionSet::new(),
            log: LogSink::new(false),
        }
    }

    fn release(id: &str) -> Release {
        Release::new(id, id.to_uppercase(), AcquisitionStatus::Free)
    }

    fn ids(catalog: &Catalog) -> Vec<&str> {
        catalog.ids().map(ReleaseId::as_str).collect()
    }

    #[test]
    fn begin_resets_catalog_and_selection() {
        let mut p = parts();
        p.catalog.upsert_one(release("old"));
        p.selection.toggle(&"old".into());

        p.scan
            .begin("https://artist.example/music", &mut p.catalog, &mut p.selection, &mut p.log)
            .unwrap();

        assert!(p.scan.is_scanning());
        assert!(p.catalog.is_empty());
        assert!(p.selection.is_empty());
        assert_eq!(p.scan.url(), Some("https://artist.example/music"));
    }

    #[test]
    fn begin_rejects_empty_url_and_second_scan() {
        let mut p = parts();
        let err = p.scan.begin("  ", &mut p.catalog, &mut p.selection, &mut p.log);
        assert_eq!(err, Err(Rejected::EmptyUrl));
        assert!(!p.scan.is_scanning());

        p.scan.begin("u", &mut p.catalog, &mut p.selection, &mut p.log).unwrap();
        p.catalog.upsert_one(release("a"));
        let err = p.scan.begin("u", &mut p.catalog, &mut p.selection, &mut p.log);
        assert_eq!(err, Err(Rejected::ScanAlreadyRunning));
        assert_eq!(p.catalog.len(), 1);
        assert_eq!(p.log.count(Severity::Warning), 2);
    }

    #[test]
    fn discoveries_before_confirmation_are_applied() {
        let mut p = parts();
        p.scan.begin("u", &mut p.catalog, &mut p.selection, &mut p.log).unwrap();
        p.scan.on_discovered(release("a"), &mut p.catalog, &mut p.log);
        p.scan.on_started("u", &mut p.log);
        p.scan.on_discovered(release("b"), &mut p.catalog, &mut p.log);
        p.scan.on_discovered(release("a"), &mut p.catalog, &mut p.log);

        assert_eq!(ids(&p.catalog), ["a", "b"]);
    }

    #[test]
    fn bulk_completion_replaces_incremental() {
        let mut p = parts();
        p.scan.begin("u", &mut p.catalog, &mut p.selection, &mut p.log).unwrap();
        p.scan.on_discovered(release("a"), &mut p.catalog, &mut p.log);
        p.scan.on_discovered(release("b"), &mut p.catalog, &mut p.log);
        p.selection.toggle(&"b".into());

        p.scan.on_completed(
            vec![release("a"), release("c")],
            &mut p.catalog,
            &mut p.selection,
            &mut p.log,
        );

        assert!(!p.scan.is_scanning());
        assert_eq!(ids(&p.catalog), ["a", "c"]);
        assert!(p.selection.is_empty());
        assert_eq!(p.log.last().unwrap().message, "Found 2 albums");
        assert_eq!(p.log.last().unwrap().severity, Severity::Success);
    }

    #[test]
    fn empty_completion_keeps_incremental_catalog() {
        let mut p = parts();
        p.scan.begin("u", &mut p.catalog, &mut p.selection, &mut p.log).unwrap();
        p.scan.on_discovered(release("a"), &mut p.catalog, &mut p.log);
        p.scan.on_completed(Vec::new(), &mut p.catalog, &mut p.selection, &mut p.log);

        assert_eq!(ids(&p.catalog), ["a"]);
        assert_eq!(p.log.last().unwrap().message, "Found 1 albums");
    }

    #[test]
    fn failure_keeps_partial_catalog() {
        let mut p = parts();
        p.scan.begin("u", &mut p.catalog, &mut p.selection, &mut p.log).unwrap();
        p.scan.on_discovered(release("a"), &mut p.catalog, &mut p.log);
        p.scan.on_failed("music grid not found", &mut p.log);

        assert!(!p.scan.is_scanning());
        assert_eq!(ids(&p.catalog), ["a"]);
        assert_eq!(p.log.last().unwrap().message, "Scan error: music grid not found");
    }

    #[test]
    fn discoveries_after_end_are_dropped() {
        let mut p = parts();
        p.scan.begin("u", &mut p.catalog, &mut p.selection, &mut p.log).unwrap();
        p.scan.on_stopped(0, &mut p.log);
        p.scan.on_discovered(release("late"), &mut p.catalog, &mut p.log);
        assert!(p.catalog.is_empty());
    }

    #[test]
    fn stop_waits_for_notification() {
        let mut p = parts();
        p.scan.begin("u", &mut p.catalog, &mut p.selection, &mut p.log).unwrap();
        p.scan.on_stop_accepted();
        assert!(p.scan.is_scanning());
        assert!(p.scan.stop_requested());

        p.scan.on_stopped(3, &mut p.log);
        assert!(!p.scan.is_scanning());
        assert!(!p.scan.stop_requested());
        assert_eq!(p.log.last().unwrap().severity, Severity::Warning);
        assert_eq!(p.log.last().unwrap().message, "Scan stopped. Found 3 albums.");
    }

    #[test]
    fn stop_rejection_keeps_scan_running() {
        let mut p = parts();
        p.scan.begin("u", &mut p.catalog, &mut p.selection, &mut p.log).unwrap();
        p.scan.on_started("u", &mut p.log);
        p.scan.on_stop_rejected(&BackendError::NoScanRunning, &mut p.log);

        assert!(p.scan.is_scanning());
        assert!(!p.scan.stop_requested());
        assert_eq!(p.log.last().unwrap().severity, Severity::Warning);

        p.scan.on_discovered(release("a"), &mut p.catalog, &mut p.log);
        p.scan
            .on_stop_rejected(&BackendError::Unavailable("ipc".into()), &mut p.log);
        assert!(p.scan.is_scanning());
        assert_eq!(p.log.last().unwrap().message, "Failed to stop scan: backend unavailable: ipc");

        p.scan.on_completed(Vec::new(), &mut p.catalog, &mut p.selection, &mut p.log);
        assert!(!p.scan.is_scanning());
        assert_eq!(ids(&p.catalog), ["a"]);
    }

    #[test]
    fn start_rejection_falls_back_to_idle_once() {
        let mut p = parts();
        p.scan.begin("u", &mut p.catalog, &mut p.selection, &mut p.log).unwrap();
        p.scan.on_failed("boom", &mut p.log);
        p.scan
            .on_start_rejected(&BackendError::Rejected("boom".into()), &mut p.log);
        assert_eq!(p.log.count(Severity::Error), 1);

        p.scan.begin("u", &mut p.catalog, &mut p.selection, &mut p.log).unwrap();
        p.scan
            .on_start_rejected(&BackendError::Unavailable("ipc".into()), &mut p.log);
        assert!(!p.scan.is_scanning());
        assert_eq!(p.log.count(Severity::Error), 2);
    }
}
