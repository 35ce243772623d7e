//! Orchestrator simulator
//!
//! Generates seeded artist catalogs and backend behavior, runs the full
//! scan -> select -> download flow through a real [`Orchestrator`] and checks
//! the session invariants after each step.

use super::scripted::{Script, ScriptedBackend};
use crate::backend::notification_channel;
use crate::config::OrchestratorConfig;
use crate::error::BackendError;
use crate::orchestrator::Orchestrator;
use crate::types::{AcquisitionStatus, Release, ReleaseId};
use crate::wire::{DownloadFailure, DownloadProgress, Notification};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// How the simulated backend reports scan results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// One `scan:album_found` per release, empty completion
    Incremental,
    /// Only the `scan:complete` list
    Bulk,
    /// Discoveries and the full completion list
    Both,
}

impl FromStr for DeliveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incremental" => Ok(Self::Incremental),
            "bulk" => Ok(Self::Bulk),
            "both" => Ok(Self::Both),
            other => Err(format!("unknown delivery mode: {other}")),
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Incremental => "incremental",
            Self::Bulk => "bulk",
            Self::Both => "both",
        };
        f.write_str(s)
    }
}

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Independent sessions to run
    pub sessions: usize,
    /// Releases per artist
    pub releases: usize,
    /// Probability a release is paid
    pub paid_ratio: f64,
    /// Probability an eligible download fails
    pub fail_rate: f64,
    /// Share of failures reported only by a rejected call
    pub silent_failure_rate: f64,
    /// Probability a discovery is delivered twice
    pub duplicate_rate: f64,
    /// Scan delivery mode
    pub mode: DeliveryMode,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            sessions: 10,
            releases: 25,
            paid_ratio: 0.3,
            fail_rate: 0.2,
            silent_failure_rate: 0.25,
            duplicate_rate: 0.1,
            mode: DeliveryMode::Both,
        }
    }
}

/// Invariant checked by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantCheck {
    /// Final catalog equals the generated releases, in order, without duplicates
    CatalogMatchesDiscovery,
    /// Selection holds exactly the non-paid releases
    SelectionIsEligibleSet,
    /// Downloads were requested once each, in catalog order
    DownloadsFollowWorkList,
    /// Counters add up to the work list and match the scripted outcomes
    CountersAddUp,
    /// Scan and batch are idle with the summary shown
    SessionSettled,
    /// A user operation was refused unexpectedly
    OperationAccepted,
}

/// A specific invariant violation
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Session index
    pub session: usize,
    /// Failed check
    pub check: InvariantCheck,
    /// Details
    pub details: String,
}

/// Final report from the simulator
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Configuration used
    pub config: SimulatorConfig,
    /// Sessions completed
    pub sessions_run: usize,
    /// Unique releases generated
    pub releases_seen: usize,
    /// Downloads requested
    pub downloads_attempted: usize,
    /// Downloads reported complete
    pub downloaded: usize,
    /// Downloads reported failed
    pub failed: usize,
    /// Violations found
    pub violations: Vec<InvariantViolation>,
}

impl SimulationReport {
    /// Check if simulation passed all criteria
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate a text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== bcdl Simulator Report ===\n\n");
        report.push_str(&format!("Seed: {}\n", self.config.seed));
        report.push_str(&format!("Delivery Mode: {}\n", self.config.mode));
        report.push_str(&format!("Sessions: {}\n", self.sessions_run));
        report.push_str(&format!("Releases: {}\n", self.releases_seen));
        report.push_str(&format!("Downloads Attempted: {}\n", self.downloads_attempted));
        report.push_str(&format!("Downloaded: {}\n", self.downloaded));
        report.push_str(&format!("Failed: {}\n", self.failed));
        report.push_str(&format!("Violations: {}\n", self.violations.len()));

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                report.push_str(&format!(
                    "{}. session {} {:?}: {}\n",
                    i + 1,
                    v.session,
                    v.check,
                    v.details
                ));
            }
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));

        report
    }
}

/// Scripted outcome of one download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    ReportedFailure,
    SilentFailure,
}

/// One generated artist session
struct Plan {
    url: String,
    releases: Vec<Release>,
    script: Script,
    expected_downloaded: usize,
    expected_failed: usize,
}

fn plan_session(rng: &mut StdRng, config: &SimulatorConfig, index: usize) -> Plan {
    let url = format!("https://artist-{index}.example/music");
    let releases: Vec<Release> = (0..config.releases)
        .map(|i| {
            let status = if rng.gen_bool(config.paid_ratio) {
                AcquisitionStatus::Paid
            } else if rng.gen_bool(0.5) {
                AcquisitionStatus::Free
            } else {
                AcquisitionStatus::NameYourPrice
            };
            Release::new(
                format!("https://artist-{index}.example/album/release-{i}"),
                format!("Release {i}"),
                status,
            )
            .with_artist(format!("Artist {index}"))
        })
        .collect();

    let mut script = Script::new().scan_event(Notification::ScanStarted(url.clone()));

    let mut delivered = Vec::new();
    for release in &releases {
        delivered.push(release.clone());
        if rng.gen_bool(config.duplicate_rate) {
            delivered.push(release.clone());
        }
    }
    match config.mode {
        DeliveryMode::Incremental => {
            script = script
                .scan_events(delivered.into_iter().map(Notification::ScanDiscovered))
                .scan_event(Notification::ScanCompleted(Vec::new()));
        }
        DeliveryMode::Bulk => {
            script = script.scan_event(Notification::ScanCompleted(delivered));
        }
        DeliveryMode::Both => {
            script = script
                .scan_events(delivered.into_iter().map(Notification::ScanDiscovered))
                .scan_event(Notification::ScanCompleted(releases.clone()));
        }
    }

    let mut expected_downloaded = 0;
    let mut expected_failed = 0;
    for release in releases.iter().filter(|r| r.is_eligible()) {
        let id = release.id.clone();
        let outcome = if !rng.gen_bool(config.fail_rate) {
            Outcome::Success
        } else if rng.gen_bool(config.silent_failure_rate) {
            Outcome::SilentFailure
        } else {
            Outcome::ReportedFailure
        };

        match outcome {
            Outcome::Success => {
                expected_downloaded += 1;
                script = script
                    .download_event(id.clone(), Notification::DownloadStarted(id.clone()))
                    .download_event(
                        id.clone(),
                        Notification::DownloadProgress(DownloadProgress {
                            url: id.clone(),
                            message: "Selected format: flac".into(),
                        }),
                    )
                    .download_event(id.clone(), Notification::DownloadCompleted(id));
            }
            Outcome::ReportedFailure => {
                expected_failed += 1;
                script = script
                    .download_event(id.clone(), Notification::DownloadStarted(id.clone()))
                    .download_event(
                        id.clone(),
                        Notification::DownloadFailed(DownloadFailure {
                            url: id.clone(),
                            error: "format selector not found".into(),
                        }),
                    )
                    .reject_download(id, BackendError::Rejected("format selector not found".into()));
            }
            Outcome::SilentFailure => {
                expected_failed += 1;
                script = script.reject_download(id, BackendError::Unavailable("ipc closed".into()));
            }
        }
    }

    Plan {
        url,
        releases,
        script,
        expected_downloaded,
        expected_failed,
    }
}

/// Run the simulator
pub async fn run_simulation(config: SimulatorConfig) -> SimulationReport {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut report = SimulationReport {
        config: config.clone(),
        sessions_run: 0,
        releases_seen: 0,
        downloads_attempted: 0,
        downloaded: 0,
        failed: 0,
        violations: Vec::new(),
    };

    for index in 0..config.sessions {
        let plan = plan_session(&mut rng, &config, index);
        run_session(index, plan, &mut report).await;
        report.sessions_run += 1;
    }

    report
}

async fn run_session(index: usize, plan: Plan, report: &mut SimulationReport) {
    let mut violate = |check: InvariantCheck, details: String| {
        report.violations.push(InvariantViolation {
            session: index,
            check,
            details,
        });
    };

    let (sink, inbox) = notification_channel();
    let backend = ScriptedBackend::new(sink, plan.script);
    let orch = Orchestrator::spawn(
        OrchestratorConfig::new()
            .with_folder(format!("/tmp/bcdl-sim/{index}"))
            .with_log_mirroring(false),
        backend,
        inbox,
    );

    if let Err(e) = orch.start_scan(&plan.url).await {
        violate(InvariantCheck::OperationAccepted, format!("start_scan: {e}"));
        return;
    }
    orch.flush().await;

    let expected_ids: Vec<ReleaseId> = plan.releases.iter().map(|r| r.id.clone()).collect();
    let actual_ids: Vec<ReleaseId> = orch.view().releases.iter().map(|r| r.id).collect();
    if actual_ids != expected_ids {
        violate(
            InvariantCheck::CatalogMatchesDiscovery,
            format!("expected {} releases, catalog has {}", expected_ids.len(), actual_ids.len()),
        );
    }
    let unique: HashSet<&ReleaseId> = actual_ids.iter().collect();
    if unique.len() != actual_ids.len() {
        violate(
            InvariantCheck::CatalogMatchesDiscovery,
            "duplicate ids in catalog".into(),
        );
    }

    orch.select_all_eligible();
    let eligible: Vec<ReleaseId> = plan
        .releases
        .iter()
        .filter(|r| r.is_eligible())
        .map(|r| r.id.clone())
        .collect();
    let selected = orch.view().selected;
    if selected != eligible {
        violate(
            InvariantCheck::SelectionIsEligibleSet,
            format!("expected {} selected, got {}", eligible.len(), selected.len()),
        );
    }

    if eligible.is_empty() {
        return;
    }

    let driver = match orch.download_selected() {
        Ok(driver) => driver,
        Err(e) => {
            violate(InvariantCheck::OperationAccepted, format!("download_selected: {e}"));
            return;
        }
    };
    if let Err(e) = driver.await {
        violate(InvariantCheck::OperationAccepted, format!("batch driver: {e}"));
        return;
    }
    orch.flush().await;

    if orch.backend().downloaded_ids() != eligible {
        violate(
            InvariantCheck::DownloadsFollowWorkList,
            "download calls differ from the selected work list".into(),
        );
    }

    let view = orch.view();
    let summary = view.summary;
    if summary.downloaded + summary.failed != eligible.len()
        || summary.downloaded != plan.expected_downloaded
        || summary.failed != plan.expected_failed
        || summary.skipped != 0
    {
        violate(
            InvariantCheck::CountersAddUp,
            format!(
                "expected {}/{} got {}/{}/{}",
                plan.expected_downloaded,
                plan.expected_failed,
                summary.downloaded,
                summary.failed,
                summary.skipped
            ),
        );
    }
    if view.scanning || view.downloading || !summary.visible {
        violate(
            InvariantCheck::SessionSettled,
            format!(
                "scanning={} downloading={} summary_visible={}",
                view.scanning, view.downloading, summary.visible
            ),
        );
    }

    report.releases_seen += plan.releases.len();
    report.downloads_attempted += eligible.len();
    report.downloaded += summary.downloaded;
    report.failed += summary.failed;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_simulation_passes() {
        let report = run_simulation(SimulatorConfig {
            sessions: 3,
            ..SimulatorConfig::default()
        })
        .await;
        assert!(report.passed(), "{}", report.generate_text());
        assert_eq!(report.sessions_run, 3);
    }

    #[tokio::test]
    async fn every_mode_passes() {
        for mode in [DeliveryMode::Incremental, DeliveryMode::Bulk, DeliveryMode::Both] {
            let report = run_simulation(SimulatorConfig {
                seed: 7,
                sessions: 2,
                mode,
                ..SimulatorConfig::default()
            })
            .await;
            assert!(report.passed(), "{}", report.generate_text());
        }
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("bulk".parse::<DeliveryMode>(), Ok(DeliveryMode::Bulk));
        assert!("random".parse::<DeliveryMode>().is_err());
    }
}
