//! Append-only, user-visible activity log
//!
//! Entries are never removed or rewritten within a session. When mirroring is
//! on, each entry is also emitted as a `tracing` event under `bcdl::log`.

use crate::snapshot::{AppendBuffer, Snapshot};
use crate::types::Severity;
use chrono::{DateTime, Local};
use serde::Serialize;

/// One log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Capture time
    pub timestamp: DateTime<Local>,
    /// Message text
    pub message: String,
    /// Severity tag
    pub severity: Severity,
}

impl LogEntry {
    /// `HH:MM:SS` rendering used by the log panel
    #[must_use]
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

/// Ordered, append-only record of log entries
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    entries: Vec<LogEntry>,
    shared: AppendBuffer<LogEntry>,
    mirror: bool,
}

impl LogSink {
    /// Create an empty log
    #[inline]
    #[must_use]
    pub fn new(mirror_to_tracing: bool) -> Self {
        Self {
            entries: Vec::new(),
            shared: AppendBuffer::new(),
            mirror: mirror_to_tracing,
        }
    }

    /// Append one entry stamped with the current time
    pub fn append(&mut self, message: impl Into<String>, severity: Severity) {
        let message = message.into();
        if self.mirror {
            match severity {
                Severity::Info | Severity::Success => {
                    tracing::info!(target: "bcdl::log", %severity, "{message}");
                }
                Severity::Warning => tracing::warn!(target: "bcdl::log", "{message}"),
                Severity::Error => tracing::error!(target: "bcdl::log", "{message}"),
            }
        }
        let entry = LogEntry {
            timestamp: Local::now(),
            message,
            severity,
        };
        self.shared.push(entry.clone());
        self.entries.push(entry);
    }

    /// Append at info severity
    #[inline]
    pub fn info(&mut self, message: impl Into<String>) {
        self.append(message, Severity::Info);
    }

    /// Append at success severity
    #[inline]
    pub fn success(&mut self, message: impl Into<String>) {
        self.append(message, Severity::Success);
    }

    /// Append at warning severity
    #[inline]
    pub fn warning(&mut self, message: impl Into<String>) {
        self.append(message, Severity::Warning);
    }

    /// Append at error severity
    #[inline]
    pub fn error(&mut self, message: impl Into<String>) {
        self.append(message, Severity::Error);
    }

    /// All entries in append order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries so far, sharing storage with the sink
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<LogEntry> {
        self.shared.snapshot()
    }

    /// Most recent entry
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been logged
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count of entries at one severity
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|e| e.severity == severity).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_in_order_without_dedup() {
        let mut log = LogSink::new(false);
        log.info("one");
        log.info("one");
        log.error("two");

        let messages: Vec<_> = log.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["one", "one", "two"]);
        assert_eq!(log.count(Severity::Info), 2);
        assert_eq!(log.last().map(|e| e.severity), Some(Severity::Error));
    }

    #[test]
    fn timestamps_are_monotonic() {
        let mut log = LogSink::new(false);
        for i in 0..10 {
            log.warning(format!("w{i}"));
        }
        assert!(log
            .entries()
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn time_label_shape() {
        let mut log = LogSink::new(true);
        log.success("done");
        let label = log.entries()[0].time_label();
        assert_eq!(label.len(), 8);
        assert_eq!(label.matches(':').count(), 2);
    }

    #[test]
    fn snapshot_matches_entries() {
        let mut log = LogSink::new(false);
        log.info("one");
        let early = log.snapshot();
        log.error("two");

        assert_eq!(early.len(), 1);
        assert_eq!(log.snapshot(), log.entries().to_vec());
    }
}
