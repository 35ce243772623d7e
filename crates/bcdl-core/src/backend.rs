//! Backend seam
//!
//! The backend is reached through two surfaces:
//! - [`Backend`]: request/response calls, each independently failable
//! - [`NotificationSink`]: fire-and-forget notifications pushed by the backend
//!
//! Both feed the same FIFO queue, so a notification sent before a call
//! returns is applied before anything the orchestrator posts after that call.

use crate::error::BackendError;
use crate::session::Event;
use crate::types::{AudioFormat, ReleaseId};
use crate::wire::Notification;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};

/// Request/response surface of the backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    /// Begin scanning an artist page; results arrive as notifications
    async fn start_scan(&self, artist_url: &str) -> Result<(), BackendError>;

    /// Request cancellation of the running scan
    async fn stop_scan(&self) -> Result<(), BackendError>;

    /// Ask the user for a destination; `None` when cancelled
    async fn pick_folder(&self) -> Result<Option<PathBuf>, BackendError>;

    /// Download one release; outcome arrives as notifications
    async fn download(
        &self,
        id: &ReleaseId,
        folder: &Path,
        format: AudioFormat,
    ) -> Result<(), BackendError>;
}

/// Queue item: an event to apply, or a barrier to acknowledge
#[derive(Debug)]
pub(crate) enum Envelope {
    Event(Event),
    Flush(oneshot::Sender<()>),
}

/// Handle the backend uses to push notifications
#[derive(Debug, Clone)]
pub struct NotificationSink {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl NotificationSink {
    /// Push one notification. Returns `false` once the orchestrator is gone.
    pub fn emit(&self, notification: Notification) -> bool {
        self.tx.send(Envelope::Event(notification.into())).is_ok()
    }
}

/// Receiving half, consumed by the orchestrator
#[derive(Debug)]
pub struct NotificationInbox {
    pub(crate) rx: mpsc::UnboundedReceiver<Envelope>,
    pub(crate) tx: mpsc::UnboundedSender<Envelope>,
}

/// Create the notification queue shared by backend and orchestrator
#[must_use]
pub fn notification_channel() -> (NotificationSink, NotificationInbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        NotificationSink { tx: tx.clone() },
        NotificationInbox { rx, tx },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sink_feeds_inbox_in_order() {
        let (sink, mut inbox) = notification_channel();
        assert!(sink.emit(Notification::ScanStarted("u".into())));
        assert!(sink.emit(Notification::ScanStopped(0)));

        let first = inbox.rx.recv().await.unwrap();
        assert!(matches!(
            first,
            Envelope::Event(Event::Notification(Notification::ScanStarted(_)))
        ));
        let second = inbox.rx.recv().await.unwrap();
        assert!(matches!(
            second,
            Envelope::Event(Event::Notification(Notification::ScanStopped(0)))
        ));
    }

    #[test]
    fn emit_reports_closed_queue() {
        let (sink, inbox) = notification_channel();
        drop(inbox);
        assert!(!sink.emit(Notification::LogError("x".into())));
    }
}
