//! bcdl Core - artist scan and batch download orchestration
//!
//! The client-side half of a music-store downloader:
//! - Tracks scan lifecycle and builds a de-duplicated, ordered catalog
//! - Maintains the user's selection against that catalog
//! - Drives download batches strictly one release at a time
//! - Reconciles asynchronous backend notifications into counters and a log
//!
//! The backend (browser automation, file dialogs) sits behind the
//! [`Backend`] trait and pushes [`Notification`]s through a
//! [`NotificationSink`].
//!
//! # Example
//!
//! ```rust,ignore
//! use bcdl_core::prelude::*;
//! use bcdl_core::harness::{Script, ScriptedBackend};
//!
//! # async fn example() {
//! let (sink, inbox) = notification_channel();
//! let backend = ScriptedBackend::new(sink, Script::new());
//! let orch = Orchestrator::spawn(OrchestratorConfig::new(), backend, inbox);
//!
//! orch.start_scan("https://artist.example").await.ok();
//! orch.flush().await;
//! orch.select_all_eligible();
//! if let Ok(driver) = orch.download_selected() {
//!     driver.await.ok();
//! }
//! orch.flush().await;
//! println!("{}", orch.view().summary.line());
//! # }
//! ```

#![warn(unreachable_pub)]

// Domain
pub mod catalog;
pub mod error;
pub mod selection;
pub mod state_machine;
pub mod summary;
pub mod types;

// Controllers
pub mod batch;
pub mod log_sink;
pub mod scan;
pub mod session;
pub mod snapshot;

// Wiring
pub mod backend;
pub mod config;
pub mod orchestrator;
pub mod wire;

pub mod harness;

// Re-exports for convenience
pub use backend::{notification_channel, Backend, NotificationInbox, NotificationSink};
pub use batch::{BatchController, BatchCounters, BatchProgress};
pub use catalog::Catalog;
pub use config::OrchestratorConfig;
pub use error::{BackendError, ConfigError, Rejected, WireError};
pub use log_sink::{LogEntry, LogSink};
pub use orchestrator::Orchestrator;
pub use scan::ScanController;
pub use selection::SelectionSet;
pub use session::{Event, Session, SessionView};
pub use snapshot::Snapshot;
pub use state_machine::{validate_transition, BatchPhase, IllegalTransition, Phase, ScanPhase};
pub use summary::SessionSummary;
pub use types::{AcquisitionStatus, AudioFormat, Release, ReleaseId, Severity};
pub use wire::{decode_line, decode_script, encode_line, Notification};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving an orchestrator
    pub use crate::{
        notification_channel, AcquisitionStatus, AudioFormat, Backend, BackendError,
        Notification, NotificationSink, Orchestrator, OrchestratorConfig, Rejected, Release,
        ReleaseId, SessionSummary, SessionView, Severity,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
