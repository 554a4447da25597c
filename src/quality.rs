//! Quality normalization and rendition selection
//!
//! A quality request is a resolution ("720p") for video or a bitrate
//! ("128kbps") for audio. Bare digits are accepted and normalized according
//! to the requested format. Selection against a manifest prefers the exact
//! value, then the nearest available below, then the nearest above.

use crate::error::{DownloadError, Result};
use crate::types::MediaFormat;
use serde::{Deserialize, Serialize};

/// A normalized quality request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityTarget {
    /// Numeric component (720 for "720p", 128 for "128kbps")
    pub value: u32,
    /// The format the target applies to, fixing the unit
    pub format: MediaFormat,
}

impl QualityTarget {
    /// Parse a user-supplied quality string for the given format
    ///
    /// Accepts "720p" / "128kbps" with the unit matching the format, or bare
    /// digits which take the format's unit. Returns `None` for anything else
    /// (wrong unit, empty, zero, garbage).
    pub fn parse(raw: &str, format: MediaFormat) -> Option<Self> {
        let s = raw.trim().to_lowercase();
        let digits = match format {
            MediaFormat::Mp4 => s.strip_suffix('p').unwrap_or(&s),
            MediaFormat::Mp3 => s.strip_suffix("kbps").unwrap_or(&s),
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let value: u32 = digits.parse().ok()?;
        if value == 0 {
            return None;
        }
        Some(Self { value, format })
    }

    /// Canonical string form ("720p" / "128kbps")
    pub fn normalized(&self) -> String {
        label(self.value, self.format)
    }
}

impl std::fmt::Display for QualityTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.normalized())
    }
}

/// Canonical label for a quality value in the given format's unit
pub fn label(value: u32, format: MediaFormat) -> String {
    match format {
        MediaFormat::Mp4 => format!("{value}p"),
        MediaFormat::Mp3 => format!("{value}kbps"),
    }
}

/// One downloadable rendition advertised by an extraction backend
///
/// For video, `value` is the vertical resolution and `progressive` tells
/// whether the stream already carries audio. Audio renditions report their
/// bitrate and are always treated as self-contained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendition {
    /// Resolution in pixels (video) or bitrate in kbps (audio)
    pub value: u32,
    /// Video only: stream carries both audio and video
    pub progressive: bool,
    /// Backend-specific stream selector passed back to `fetch`
    pub tag: String,
}

/// The resolver's choice for one download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuality {
    /// The rendition to fetch
    pub rendition: Rendition,
    /// Label of what was actually chosen ("480p" when 720p was unavailable)
    pub actual: String,
    /// Whether a separate audio stream must be fetched and merged
    pub merge: bool,
}

/// Pick the rendition for a quality target from the advertised set
///
/// Exact value first, else the highest value below the target, else the
/// lowest above it. An empty set is a `NoStreamsAvailable` failure. For
/// video, a non-progressive pick sets `merge`; audio never merges.
pub fn resolve(target: QualityTarget, available: &[Rendition]) -> Result<ResolvedQuality> {
    if available.is_empty() {
        return Err(DownloadError::NoStreamsAvailable {
            format: target.format.as_str().to_string(),
        }
        .into());
    }

    let chosen = pick(target.value, available);
    let merge = target.format == MediaFormat::Mp4 && !chosen.progressive;

    Ok(ResolvedQuality {
        actual: label(chosen.value, target.format),
        rendition: chosen.clone(),
        merge,
    })
}

fn pick(target: u32, available: &[Rendition]) -> &Rendition {
    if let Some(exact) = best_at(target, available) {
        return exact;
    }
    if let Some(below) = available
        .iter()
        .filter(|r| r.value < target)
        .max_by_key(|r| (r.value, r.progressive))
    {
        return below;
    }
    // Everything is above the target; take the closest
    #[allow(clippy::unwrap_used)] // non-empty checked by caller
    available
        .iter()
        .filter(|r| r.value > target)
        .min_by_key(|r| (r.value, std::cmp::Reverse(r.progressive)))
        .unwrap()
}

/// Among renditions at exactly `value`, prefer a progressive one
fn best_at(value: u32, available: &[Rendition]) -> Option<&Rendition> {
    available
        .iter()
        .filter(|r| r.value == value)
        .max_by_key(|r| r.progressive)
}
