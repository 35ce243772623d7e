//! Async orchestrator
//!
//! Owns the [`Session`] and the dispatcher task. Responsibilities:
//! - Run user operations against the session, then call the backend
//! - Apply queued events one at a time
//! - Drive download batches strictly one call at a time
//! - Publish a [`SessionView`] after every mutation

use crate::backend::{Backend, Envelope, NotificationInbox};
use crate::config::OrchestratorConfig;
use crate::error::Rejected;
use crate::session::{Event, Session, SessionView};
use crate::types::ReleaseId;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// State shared with the dispatcher task
#[derive(Debug)]
struct Shared {
    session: Mutex<Session>,
    views: watch::Sender<SessionView>,
}

impl Shared {
    /// Run one handler under the lock and publish the result
    fn mutate<T>(&self, f: impl FnOnce(&mut Session) -> T) -> T {
        let mut session = self.session.lock();
        let out = f(&mut session);
        self.views.send_replace(session.view());
        out
    }
}

#[derive(Debug)]
struct Inner<B> {
    backend: B,
    shared: Arc<Shared>,
    queue: mpsc::UnboundedSender<Envelope>,
    config: OrchestratorConfig,
}

impl<B> Inner<B> {
    fn post(&self, event: Event) {
        if self.queue.send(Envelope::Event(event)).is_err() {
            tracing::warn!("event queue closed; dispatcher has stopped");
        }
    }
}

/// Posts `BatchDrained` when the batch driver ends, including by panic or abort
struct DrainOnDrop<B> {
    inner: Arc<Inner<B>>,
}

impl<B> Drop for DrainOnDrop<B> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!("batch driver panicked; draining batch");
        }
        self.inner.post(Event::BatchDrained);
    }
}

/// Client-side scan and download orchestrator
///
/// Cheap to clone; clones share one session.
#[derive(Debug)]
pub struct Orchestrator<B> {
    inner: Arc<Inner<B>>,
}

impl<B> Clone for Orchestrator<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Backend + 'static> Orchestrator<B> {
    /// Create the orchestrator and spawn its dispatcher.
    ///
    /// Must be called inside a tokio runtime. The dispatcher exits once every
    /// sender (orchestrator clones, notification sinks, batch drivers) is gone.
    pub fn spawn(config: OrchestratorConfig, backend: B, inbox: NotificationInbox) -> Self {
        let session = Session::new(&config);
        let (views, _) = watch::channel(session.view());
        let shared = Arc::new(Shared {
            session: Mutex::new(session),
            views,
        });

        tokio::spawn(dispatch(Arc::clone(&shared), inbox.rx));

        Self {
            inner: Arc::new(Inner {
                backend,
                shared,
                queue: inbox.tx,
                config,
            }),
        }
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    /// Backend handle
    #[inline]
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    /// Start scanning `url`.
    ///
    /// A rejected call is recovered locally (logged, back to Idle); only
    /// precondition failures are returned.
    ///
    /// # Errors
    /// `Rejected::EmptyUrl`, `Rejected::ScanAlreadyRunning`
    pub async fn start_scan(&self, url: &str) -> Result<(), Rejected> {
        self.inner.shared.mutate(|s| s.begin_scan(url))?;
        tracing::info!(url = url.trim(), "scan requested");

        if let Err(e) = self.inner.backend.start_scan(url.trim()).await {
            tracing::warn!("start scan call rejected: {e}");
            self.inner.post(Event::ScanCallRejected(e));
        }
        Ok(())
    }

    /// Request cancellation of the running scan. A no-op while idle.
    pub async fn stop_scan(&self) {
        let scanning = self.inner.shared.session.lock().scan().is_scanning();
        if !scanning {
            tracing::debug!("stop requested with no scan running");
            return;
        }

        match self.inner.backend.stop_scan().await {
            Ok(()) => self.inner.post(Event::StopCallAccepted),
            Err(e) => {
                tracing::warn!("stop scan call rejected: {e}");
                self.inner.post(Event::StopCallRejected(e));
            }
        }
    }

    /// Flip selection of one release, returning the new membership
    pub fn toggle(&self, id: &ReleaseId) -> bool {
        self.inner.shared.mutate(|s| s.toggle(id))
    }

    /// Select every non-paid release in the catalog
    pub fn select_all_eligible(&self) -> usize {
        self.inner.shared.mutate(Session::select_all_eligible)
    }

    /// Deselect everything
    pub fn clear_selection(&self) {
        self.inner.shared.mutate(Session::clear_selection);
    }

    /// Set the destination folder directly
    pub fn set_folder(&self, folder: impl Into<PathBuf>) {
        let folder = folder.into();
        self.inner.shared.mutate(|s| s.set_folder(folder));
    }

    /// Ask the backend for a destination folder.
    ///
    /// Returns the picked folder; a cancelled pick leaves the current one.
    pub async fn pick_folder(&self) -> Option<PathBuf> {
        match self.inner.backend.pick_folder().await {
            Ok(Some(folder)) if !folder.as_os_str().is_empty() => {
                self.inner
                    .shared
                    .mutate(|s| s.folder_picked(folder.clone()));
                Some(folder)
            }
            Ok(_) => None,
            Err(e) => {
                self.inner.shared.mutate(|s| s.folder_pick_failed(&e));
                None
            }
        }
    }

    /// Start a batch over `ids` into `folder`.
    ///
    /// The ids are snapshotted; the returned handle completes once every
    /// download call has settled and the drain event is queued. The drain
    /// event is queued even if a backend call panics.
    ///
    /// # Errors
    /// `EmptyFolder`, `EmptySelection`, `BatchAlreadyRunning`
    pub fn start_batch(
        &self,
        folder: impl Into<PathBuf>,
        ids: Vec<ReleaseId>,
    ) -> Result<JoinHandle<()>, Rejected> {
        let folder = folder.into();
        let (work, format) = self.inner.shared.mutate(|s| s.begin_batch(&folder, ids))?;
        tracing::info!(items = work.len(), folder = %folder.display(), "batch started");

        let drain = DrainOnDrop {
            inner: Arc::clone(&self.inner),
        };
        Ok(tokio::spawn(async move {
            let inner = &drain.inner;
            for id in work {
                let result = inner.backend.download(&id, &folder, format).await;
                if let Err(e) = &result {
                    tracing::warn!(%id, "download call rejected: {e}");
                }
                inner.post(Event::DownloadCallSettled { id, result });
            }
        }))
    }

    /// Download the selected releases, in catalog order, into the session folder
    ///
    /// # Errors
    /// As [`Orchestrator::start_batch`]
    pub fn download_selected(&self) -> Result<JoinHandle<()>, Rejected> {
        let (folder, work) = {
            let session = self.inner.shared.session.lock();
            (
                session.folder().map(PathBuf::from).unwrap_or_default(),
                session.selected_work_list(),
            )
        };
        self.start_batch(folder, work)
    }

    /// Current snapshot
    #[must_use]
    pub fn view(&self) -> SessionView {
        self.inner.shared.session.lock().view()
    }

    /// Snapshot stream, updated after every handler
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.inner.shared.views.subscribe()
    }

    /// Wait until every event queued before this call has been applied
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.inner.queue.send(Envelope::Flush(tx)).is_err() {
            return;
        }
        let _ = rx.await;
    }

    /// Read the session under the lock
    pub fn inspect<T>(&self, f: impl FnOnce(&Session) -> T) -> T {
        f(&self.inner.shared.session.lock())
    }
}

/// Apply queued events one at a time until every sender is dropped
async fn dispatch(shared: Arc<Shared>, mut rx: mpsc::UnboundedReceiver<Envelope>) {
    while let Some(envelope) = rx.recv().await {
        match envelope {
            Envelope::Event(event) => shared.mutate(|s| s.apply(event)),
            Envelope::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    tracing::debug!("event queue closed, dispatcher exiting");
}
