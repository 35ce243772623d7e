//! Backend that replays pre-recorded notifications

use crate::backend::{Backend, NotificationSink};
use crate::error::BackendError;
use crate::types::{AudioFormat, ReleaseId};
use crate::wire::Notification;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A call the backend received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// `start_scan(url)`
    StartScan(String),
    /// `stop_scan()`
    StopScan,
    /// `pick_folder()`
    PickFolder,
    /// `download(id, folder, format)`
    Download {
        /// Release requested
        id: ReleaseId,
        /// Destination
        folder: PathBuf,
        /// Format requested
        format: AudioFormat,
    },
}

/// Recorded behavior for a [`ScriptedBackend`]
#[derive(Debug, Clone, Default)]
pub struct Script {
    scan: Vec<Notification>,
    downloads: HashMap<ReleaseId, Vec<Notification>>,
    reject_scan: Option<BackendError>,
    reject_stop: Option<BackendError>,
    reject_downloads: HashMap<ReleaseId, BackendError>,
    folder: Option<PathBuf>,
}

impl Script {
    /// Empty script: scans emit nothing, downloads succeed
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a recorded notification stream.
    ///
    /// Download notifications go to their release, everything else is
    /// emitted when the scan starts.
    #[must_use]
    pub fn from_notifications(notifications: impl IntoIterator<Item = Notification>) -> Self {
        notifications
            .into_iter()
            .fold(Self::new(), |script, n| match n.download_id().cloned() {
                Some(id) => script.download_event(id, n),
                None => script.scan_event(n),
            })
    }

    /// Emit `n` when the scan starts
    #[must_use]
    pub fn scan_event(mut self, n: Notification) -> Self {
        self.scan.push(n);
        self
    }

    /// Emit every item of `events` when the scan starts
    #[must_use]
    pub fn scan_events(mut self, events: impl IntoIterator<Item = Notification>) -> Self {
        self.scan.extend(events);
        self
    }

    /// Emit `n` when `id` is downloaded
    #[must_use]
    pub fn download_event(mut self, id: impl Into<ReleaseId>, n: Notification) -> Self {
        self.downloads.entry(id.into()).or_default().push(n);
        self
    }

    /// Reject the start-scan call
    #[must_use]
    pub fn reject_scan(mut self, error: BackendError) -> Self {
        self.reject_scan = Some(error);
        self
    }

    /// Reject the stop-scan call
    #[must_use]
    pub fn reject_stop(mut self, error: BackendError) -> Self {
        self.reject_stop = Some(error);
        self
    }

    /// Reject the download call for `id` after emitting its notifications
    #[must_use]
    pub fn reject_download(mut self, id: impl Into<ReleaseId>, error: BackendError) -> Self {
        self.reject_downloads.insert(id.into(), error);
        self
    }

    /// Folder returned by `pick_folder`
    #[must_use]
    pub fn folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.folder = Some(folder.into());
        self
    }
}

/// Backend that plays back a [`Script`] and records calls
#[derive(Debug)]
pub struct ScriptedBackend {
    sink: NotificationSink,
    script: Script,
    calls: Mutex<Vec<BackendCall>>,
    discovered: Mutex<usize>,
}

impl ScriptedBackend {
    /// Play `script` into `sink`
    #[must_use]
    pub fn new(sink: NotificationSink, script: Script) -> Self {
        Self {
            sink,
            script,
            calls: Mutex::new(Vec::new()),
            discovered: Mutex::new(0),
        }
    }

    /// Every call received so far
    #[must_use]
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    /// Ids passed to `download`, in call order
    #[must_use]
    pub fn downloaded_ids(&self) -> Vec<ReleaseId> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                BackendCall::Download { id, .. } => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of `start_scan` calls
    #[must_use]
    pub fn scan_calls(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, BackendCall::StartScan(_)))
            .count()
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn start_scan(&self, artist_url: &str) -> Result<(), BackendError> {
        self.record(BackendCall::StartScan(artist_url.to_owned()));
        if let Some(e) = &self.script.reject_scan {
            return Err(e.clone());
        }
        let mut discovered = 0;
        for n in &self.script.scan {
            if matches!(n, Notification::ScanDiscovered(_)) {
                discovered += 1;
            }
            self.sink.emit(n.clone());
        }
        *self.discovered.lock() = discovered;
        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), BackendError> {
        self.record(BackendCall::StopScan);
        if let Some(e) = &self.script.reject_stop {
            return Err(e.clone());
        }
        let count = *self.discovered.lock();
        self.sink.emit(Notification::ScanStopped(count));
        Ok(())
    }

    async fn pick_folder(&self) -> Result<Option<PathBuf>, BackendError> {
        self.record(BackendCall::PickFolder);
        Ok(self.script.folder.clone())
    }

    async fn download(
        &self,
        id: &ReleaseId,
        folder: &Path,
        format: AudioFormat,
    ) -> Result<(), BackendError> {
        self.record(BackendCall::Download {
            id: id.clone(),
            folder: folder.to_path_buf(),
            format,
        });

        match self.script.downloads.get(id) {
            Some(events) => {
                for n in events {
                    self.sink.emit(n.clone());
                }
            }
            None if !self.script.reject_downloads.contains_key(id) => {
                self.sink.emit(Notification::DownloadStarted(id.clone()));
                self.sink.emit(Notification::DownloadCompleted(id.clone()));
            }
            None => {}
        }

        match self.script.reject_downloads.get(id) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}
