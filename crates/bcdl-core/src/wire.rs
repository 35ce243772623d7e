//! Notification wire format
//!
//! Backend notifications are adjacently tagged JSON objects,
//! `{"event": "scan:album_found", "data": {...}}`, one per line when
//! recorded to a script.

use crate::error::WireError;
use crate::types::{AcquisitionStatus, Release, ReleaseId};
use serde::{Deserialize, Deserializer, Serialize};

/// Release record as the backend sends it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRelease {
    /// Release title
    #[serde(default)]
    pub title: String,
    /// Artist display name
    #[serde(default)]
    pub artist: String,
    /// Cover art URL
    #[serde(default)]
    pub cover_url: String,
    /// Canonical URL, the release id
    pub url: String,
    /// Free download flag
    #[serde(default)]
    pub is_free: bool,
    /// Name-your-price flag
    #[serde(default)]
    pub is_nyp: bool,
    /// Price text
    #[serde(default)]
    pub price: String,
    /// `free`, `nyp` or `paid`
    #[serde(default)]
    pub status: String,
}

impl WireRelease {
    /// Resolve the acquisition status.
    ///
    /// The `status` string wins; the flags are consulted only when it is
    /// missing or unknown, and anything unresolved is treated as paid.
    #[must_use]
    pub fn acquisition_status(&self) -> AcquisitionStatus {
        if let Some(status) = AcquisitionStatus::from_wire(&self.status) {
            return status;
        }
        if self.is_free {
            AcquisitionStatus::Free
        } else if self.is_nyp {
            AcquisitionStatus::NameYourPrice
        } else {
            AcquisitionStatus::Paid
        }
    }
}

impl From<WireRelease> for Release {
    fn from(wire: WireRelease) -> Self {
        let acquisition_status = wire.acquisition_status();
        Self {
            id: ReleaseId::new(wire.url),
            title: wire.title,
            artist_name: wire.artist,
            cover_image_url: wire.cover_url,
            price_display: wire.price,
            acquisition_status,
        }
    }
}

impl From<Release> for WireRelease {
    fn from(release: Release) -> Self {
        let status = release.acquisition_status;
        Self {
            title: release.title,
            artist: release.artist_name,
            cover_url: release.cover_image_url,
            url: release.id.as_str().to_owned(),
            is_free: status == AcquisitionStatus::Free,
            is_nyp: status == AcquisitionStatus::NameYourPrice,
            price: release.price_display,
            status: status.as_wire().to_owned(),
        }
    }
}

/// `download:progress` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadProgress {
    /// Release being downloaded
    pub url: ReleaseId,
    /// Human-readable step
    pub message: String,
}

/// `download:error` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadFailure {
    /// Release that failed
    pub url: ReleaseId,
    /// Backend error text
    pub error: String,
}

/// Asynchronous backend notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum Notification {
    /// Scan accepted for this artist URL
    #[serde(rename = "scan:start")]
    ScanStarted(String),

    /// One release discovered
    #[serde(rename = "scan:album_found")]
    ScanDiscovered(Release),

    /// Scan finished with the full result list
    #[serde(rename = "scan:complete")]
    ScanCompleted(#[serde(deserialize_with = "null_as_empty")] Vec<Release>),

    /// Scan aborted by an error
    #[serde(rename = "scan:error")]
    ScanFailed(String),

    /// Scan cancelled on request after discovering this many releases
    #[serde(rename = "scan:stopped")]
    ScanStopped(usize),

    /// Download of one release began
    #[serde(rename = "download:start")]
    DownloadStarted(ReleaseId),

    /// Advisory progress text
    #[serde(rename = "download:progress")]
    DownloadProgress(DownloadProgress),

    /// Download of one release finished
    #[serde(rename = "download:complete")]
    DownloadCompleted(ReleaseId),

    /// Download of one release failed
    #[serde(rename = "download:error")]
    DownloadFailed(DownloadFailure),

    /// Generic backend error passthrough
    #[serde(rename = "log:error")]
    LogError(String),
}

impl Notification {
    /// Event name on the wire
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ScanStarted(_) => "scan:start",
            Self::ScanDiscovered(_) => "scan:album_found",
            Self::ScanCompleted(_) => "scan:complete",
            Self::ScanFailed(_) => "scan:error",
            Self::ScanStopped(_) => "scan:stopped",
            Self::DownloadStarted(_) => "download:start",
            Self::DownloadProgress(_) => "download:progress",
            Self::DownloadCompleted(_) => "download:complete",
            Self::DownloadFailed(_) => "download:error",
            Self::LogError(_) => "log:error",
        }
    }

    /// Release a download notification refers to
    #[must_use]
    pub fn download_id(&self) -> Option<&ReleaseId> {
        match self {
            Self::DownloadStarted(id) | Self::DownloadCompleted(id) => Some(id),
            Self::DownloadProgress(p) => Some(&p.url),
            Self::DownloadFailed(f) => Some(&f.url),
            _ => None,
        }
    }

    /// Whether this belongs to the scan lifecycle
    #[must_use]
    pub fn is_scan_event(&self) -> bool {
        matches!(
            self,
            Self::ScanStarted(_)
                | Self::ScanDiscovered(_)
                | Self::ScanCompleted(_)
                | Self::ScanFailed(_)
                | Self::ScanStopped(_)
        )
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Release>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Release>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode a single notification line
///
/// # Errors
/// `WireError::Malformed` with `line` set to 1
pub fn decode_line(line: &str) -> Result<Notification, WireError> {
    serde_json::from_str(line).map_err(|source| WireError::Malformed { line: 1, source })
}

/// Decode a JSON-lines script, skipping blank lines and `#` comments
///
/// # Errors
/// `WireError::Malformed` naming the first bad line
pub fn decode_script(text: &str) -> Result<Vec<Notification>, WireError> {
    text.lines()
        .enumerate()
        .filter(|(_, l)| {
            let l = l.trim();
            !l.is_empty() && !l.starts_with('#')
        })
        .map(|(i, l)| {
            serde_json::from_str(l).map_err(|source| WireError::Malformed { line: i + 1, source })
        })
        .collect()
}

/// Encode one notification as a single JSON line
///
/// # Errors
/// Propagates `serde_json` failures
pub fn encode_line(notification: &Notification) -> Result<String, serde_json::Error> {
    serde_json::to_string(notification)
}
