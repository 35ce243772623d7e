//! Testing utilities for bcdl workspace
//!
//! Shared release fixtures, scripted scans and orchestrator setup.

#![allow(missing_docs)]

use bcdl_core::harness::{Script, ScriptedBackend};
use bcdl_core::wire::{DownloadFailure, DownloadProgress};
use bcdl_core::{
    notification_channel, AcquisitionStatus, Notification, Orchestrator, OrchestratorConfig,
    Release, ReleaseId, SessionView,
};
use std::time::Duration;

pub const ARTIST_URL: &str = "https://artist.example/music";

pub fn album_url(slug: &str) -> String {
    format!("https://artist.example/album/{slug}")
}

pub fn release(slug: &str, status: AcquisitionStatus) -> Release {
    Release::new(album_url(slug), slug.to_uppercase(), status).with_artist("Test Artist")
}

pub fn free_release(slug: &str) -> Release {
    release(slug, AcquisitionStatus::Free).with_price("Free Download")
}

pub fn nyp_release(slug: &str) -> Release {
    release(slug, AcquisitionStatus::NameYourPrice).with_price("name your price")
}

pub fn paid_release(slug: &str) -> Release {
    release(slug, AcquisitionStatus::Paid).with_price("$7 USD")
}

pub fn id(slug: &str) -> ReleaseId {
    ReleaseId::new(album_url(slug))
}

/// start, one discovery per release, empty completion
pub fn incremental_scan(releases: &[Release]) -> Vec<Notification> {
    let mut events = vec![Notification::ScanStarted(ARTIST_URL.into())];
    events.extend(releases.iter().cloned().map(Notification::ScanDiscovered));
    events.push(Notification::ScanCompleted(Vec::new()));
    events
}

/// start, then the full list in the completion
pub fn bulk_scan(releases: &[Release]) -> Vec<Notification> {
    vec![
        Notification::ScanStarted(ARTIST_URL.into()),
        Notification::ScanCompleted(releases.to_vec()),
    ]
}

pub fn download_ok(id: &ReleaseId) -> Vec<Notification> {
    vec![
        Notification::DownloadStarted(id.clone()),
        Notification::DownloadProgress(DownloadProgress {
            url: id.clone(),
            message: "Selected format: flac".into(),
        }),
        Notification::DownloadCompleted(id.clone()),
    ]
}

pub fn download_err(id: &ReleaseId, error: &str) -> Vec<Notification> {
    vec![
        Notification::DownloadStarted(id.clone()),
        Notification::DownloadFailed(DownloadFailure {
            url: id.clone(),
            error: error.into(),
        }),
    ]
}

pub fn test_config() -> OrchestratorConfig {
    OrchestratorConfig::new()
        .with_folder("/music")
        .with_log_mirroring(false)
}

pub fn setup_orchestrator(script: Script) -> Orchestrator<ScriptedBackend> {
    setup_orchestrator_with(test_config(), script)
}

pub fn setup_orchestrator_with(
    config: OrchestratorConfig,
    script: Script,
) -> Orchestrator<ScriptedBackend> {
    let (sink, inbox) = notification_channel();
    Orchestrator::spawn(config, ScriptedBackend::new(sink, script), inbox)
}

/// Wait until a published view satisfies `pred`; panics after five seconds
pub async fn wait_for_view(
    orch: &Orchestrator<ScriptedBackend>,
    pred: impl FnMut(&SessionView) -> bool,
) -> SessionView {
    let mut views = orch.subscribe();
    let view = tokio::time::timeout(Duration::from_secs(5), views.wait_for(pred))
        .await
        .expect("timed out waiting for session view")
        .expect("dispatcher stopped");
    view.clone()
}
