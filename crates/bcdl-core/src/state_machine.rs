//! Phase machines for the scan and download controllers

use serde::Serialize;
use std::fmt::Debug;

/// Illegal phase change
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal transition {from} -> {to}")]
pub struct IllegalTransition {
    /// Current phase
    pub from: &'static str,
    /// Requested phase
    pub to: &'static str,
}

/// A controller phase with a fixed transition table
pub trait Phase: Copy + Eq + Debug + 'static {
    /// Phases reachable from `self`
    fn allowed_transitions(self) -> &'static [Self];

    /// Short name for diagnostics
    fn name(self) -> &'static str;
}

/// Scan session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ScanPhase {
    /// No scan in progress
    #[default]
    Idle,
    /// Scan requested or confirmed
    Scanning,
}

impl Phase for ScanPhase {
    fn allowed_transitions(self) -> &'static [Self] {
        match self {
            // Scanning -> Scanning is the backend confirming our own request
            Self::Idle => &[Self::Scanning],
            Self::Scanning => &[Self::Idle, Self::Scanning],
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
        }
    }
}

/// Download batch phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum BatchPhase {
    /// No batch in progress
    #[default]
    Idle,
    /// Work list being processed
    Running,
}

impl Phase for BatchPhase {
    fn allowed_transitions(self) -> &'static [Self] {
        match self {
            Self::Idle => &[Self::Running],
            Self::Running => &[Self::Idle],
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
        }
    }
}

/// Validates a phase transition.
///
/// # Errors
/// `IllegalTransition` if `to` is not reachable from `from`
pub fn validate_transition<P: Phase>(from: P, to: P) -> Result<(), IllegalTransition> {
    if from.allowed_transitions().contains(&to) {
        Ok(())
    } else {
        Err(IllegalTransition {
            from: from.name(),
            to: to.name(),
        })
    }
}

/// Move `phase` to `to` if the table allows it, returning whether it moved
pub fn transition<P: Phase>(phase: &mut P, to: P) -> bool {
    match validate_transition(*phase, to) {
        Ok(()) => {
            *phase = to;
            true
        }
        Err(e) => {
            tracing::debug!("ignored phase change: {e}");
            false
        }
    }
}
