//! Core types for the orchestrator
//!
//! Defines the data model shared by every controller:
//! - Release identifiers and catalog entries
//! - Acquisition status and download formats
//! - Log severities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical release identifier (the release page URL)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseId(String);

impl ReleaseId {
    /// Wrap a release URL
    #[inline]
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Borrow the underlying URL
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty identifier (malformed wire records)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReleaseId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ReleaseId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// How a release can be acquired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AcquisitionStatus {
    /// Free download
    Free,
    /// Name your price (zero is accepted)
    NameYourPrice,
    /// Must be purchased
    Paid,
}

impl AcquisitionStatus {
    /// Wire identifier (`free`, `nyp`, `paid`)
    #[inline]
    #[must_use]
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::NameYourPrice => "nyp",
            Self::Paid => "paid",
        }
    }

    /// Parse a wire identifier, case-insensitive
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "free" => Some(Self::Free),
            "nyp" => Some(Self::NameYourPrice),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }

    /// Whether the release can be downloaded without paying
    #[inline]
    #[must_use]
    pub fn is_eligible(self) -> bool {
        !matches!(self, Self::Paid)
    }
}

impl fmt::Display for AcquisitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// One discovered catalog entry. Immutable once inserted.
///
/// Serializes as the backend's wire record (see [`crate::wire::WireRelease`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "crate::wire::WireRelease", into = "crate::wire::WireRelease")]
pub struct Release {
    /// Canonical URL, unique within a session
    pub id: ReleaseId,
    /// Release title
    pub title: String,
    /// Artist display name
    pub artist_name: String,
    /// Cover art URL
    pub cover_image_url: String,
    /// Price text as shown on the page
    pub price_display: String,
    /// Free / name-your-price / paid
    pub acquisition_status: AcquisitionStatus,
}

impl Release {
    /// Create a release with empty artist, cover and price
    #[must_use]
    pub fn new(
        id: impl Into<ReleaseId>,
        title: impl Into<String>,
        acquisition_status: AcquisitionStatus,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist_name: String::new(),
            cover_image_url: String::new(),
            price_display: String::new(),
            acquisition_status,
        }
    }

    /// With artist name
    #[inline]
    #[must_use]
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist_name = artist.into();
        self
    }

    /// With cover image URL
    #[inline]
    #[must_use]
    pub fn with_cover(mut self, url: impl Into<String>) -> Self {
        self.cover_image_url = url.into();
        self
    }

    /// With price text
    #[inline]
    #[must_use]
    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price_display = price.into();
        self
    }

    /// Whether "select all eligible" picks this release
    #[inline]
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.acquisition_status.is_eligible()
    }
}

/// Audio format identifiers accepted by the download page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudioFormat {
    /// FLAC (lossless)
    #[default]
    Flac,
    /// MP3 320 kbps
    #[serde(rename = "mp3-320")]
    Mp3320,
    /// MP3 V0
    #[serde(rename = "mp3-v0")]
    Mp3V0,
    /// AAC
    AacHi,
    /// Ogg Vorbis
    Vorbis,
    /// Apple lossless
    Alac,
    /// WAV
    Wav,
    /// AIFF
    AiffLossless,
}

impl AudioFormat {
    /// Every format, in download-page order
    pub const ALL: [Self; 8] = [
        Self::Mp3V0,
        Self::Mp3320,
        Self::Flac,
        Self::AacHi,
        Self::Vorbis,
        Self::Alac,
        Self::Wav,
        Self::AiffLossless,
    ];

    /// Identifier passed to the backend
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flac => "flac",
            Self::Mp3320 => "mp3-320",
            Self::Mp3V0 => "mp3-v0",
            Self::AacHi => "aac-hi",
            Self::Vorbis => "vorbis",
            Self::Alac => "alac",
            Self::Wav => "wav",
            Self::AiffLossless => "aiff-lossless",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| format!("unknown audio format: {s}"))
    }
}

/// Log entry severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Neutral progress
    Info,
    /// Something finished well
    Success,
    /// Rejected request or user-initiated stop
    Warning,
    /// Failure reported by the backend
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!(AcquisitionStatus::from_wire("NYP"), Some(AcquisitionStatus::NameYourPrice));
        assert_eq!(AcquisitionStatus::from_wire(" free "), Some(AcquisitionStatus::Free));
        assert_eq!(AcquisitionStatus::from_wire("unavailable"), None);
    }

    #[test]
    fn only_paid_is_ineligible() {
        assert!(AcquisitionStatus::Free.is_eligible());
        assert!(AcquisitionStatus::NameYourPrice.is_eligible());
        assert!(!AcquisitionStatus::Paid.is_eligible());
    }

    #[test]
    fn audio_format_identifiers() {
        assert_eq!(AudioFormat::default().as_str(), "flac");
        assert_eq!("MP3-320".parse::<AudioFormat>(), Ok(AudioFormat::Mp3320));
        assert!("ogg".parse::<AudioFormat>().is_err());

        let json = serde_json::to_string(&AudioFormat::AiffLossless).unwrap();
        assert_eq!(json, "\"aiff-lossless\"");
    }

    #[test]
    fn release_builder() {
        let release = Release::new("https://a.example/album/x", "X", AcquisitionStatus::Free)
            .with_artist("A")
            .with_price("$0");
        assert_eq!(release.id.as_str(), "https://a.example/album/x");
        assert_eq!(release.artist_name, "A");
        assert!(release.is_eligible());
    }
}
