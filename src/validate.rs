//! Submission validation: URLs, payload fields, folder pre-flight
//!
//! Everything here runs synchronously before a task record exists. A
//! payload that fails any check produces a [`ValidationFailure`] and no
//! task; for batches the whole submission is rejected if any single item
//! is invalid.

use crate::config::Config;
use crate::error::{ValidationFailure, VideoError};
use crate::fsutil;
use crate::quality::QualityTarget;
use crate::types::{ItemSpec, MediaFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;
use utoipa::ToSchema;

/// Hosts accepted as YouTube video URLs
const YOUTUBE_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "youtu.be",
];

/// One video's raw request fields, exactly as submitted
///
/// All fields optional so missing-field reporting can name each absent
/// one instead of failing on the first deserialization error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ItemRequest {
    /// The video URL
    #[serde(default)]
    pub video_link: Option<String>,
    /// "mp4" or "mp3"
    #[serde(default)]
    pub format: Option<String>,
    /// Requested quality ("720p", "128kbps", bare digits accepted)
    #[serde(default)]
    pub quality: Option<String>,
    /// Target folder for the output file
    #[serde(default)]
    pub folder: Option<String>,
    /// Optional filename stem override
    #[serde(default)]
    pub name: Option<String>,
}

/// What is wrong with one item, before it is wrapped for single/batch reporting
#[derive(Debug, Clone)]
pub struct ItemIssue {
    /// Human-readable description
    pub message: String,
    /// Required fields that were missing or empty
    pub missing_fields: Vec<String>,
}

/// Check that a URL is a YouTube single-video URL
///
/// Rejects non-YouTube hosts, bare hosts with no path or query, and
/// playlist URLs (a `list=` query parameter or a path under `/playlist`).
pub fn check_video_link(raw: &str) -> Result<(), String> {
    let parsed = Url::parse(raw).map_err(|_| format!("Invalid video URL: {raw}"))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("Invalid video URL: {raw}"));
    }

    let host = match parsed.host_str() {
        Some(h) => h.to_lowercase(),
        None => return Err(format!("Invalid video URL: {raw}")),
    };
    if !YOUTUBE_HOSTS.contains(&host.as_str()) {
        return Err(format!("Not a YouTube URL: {raw}"));
    }

    // A bare host points at nothing downloadable
    let has_path = parsed.path() != "/" && !parsed.path().is_empty();
    let has_query = parsed.query().is_some_and(|q| !q.is_empty());
    if !has_path && !has_query {
        return Err(format!("Invalid video URL: {raw}"));
    }

    if is_playlist(&parsed) {
        return Err(format!("Playlist URLs are not supported: {raw}"));
    }

    Ok(())
}

/// Playlist detection: `list=` query parameter or a `/playlist` path
pub fn is_playlist(url: &Url) -> bool {
    if url.query_pairs().any(|(k, _)| k == "list") {
        return true;
    }
    url.path().starts_with("/playlist")
}

/// Validate one raw item into an [`ItemSpec`]
///
/// Checks, in order: required fields present, format parses, quality
/// normalizes for that format, URL is a single YouTube video, folder
/// exists (created if missing), is writable, and has free space.
pub fn validate_item(req: &ItemRequest, config: &Config) -> Result<ItemSpec, ItemIssue> {
    let mut missing = Vec::new();

    let video_link = non_empty(&req.video_link);
    if video_link.is_none() {
        missing.push("video_link".to_string());
    }
    let format_raw = non_empty(&req.format);
    if format_raw.is_none() {
        missing.push("format".to_string());
    }
    let quality_raw = non_empty(&req.quality);
    if quality_raw.is_none() {
        missing.push("quality".to_string());
    }
    let folder_raw = non_empty(&req.folder).map(PathBuf::from).or_else(|| {
        config.default_folder.clone()
    });
    if folder_raw.is_none() {
        missing.push("folder".to_string());
    }

    if !missing.is_empty() {
        return Err(ItemIssue {
            message: "Missing required fields.".to_string(),
            missing_fields: missing,
        });
    }

    // The unwraps above are guarded by the missing-fields check
    let (video_link, format_raw, quality_raw, folder) = match (
        video_link,
        format_raw,
        quality_raw,
        folder_raw,
    ) {
        (Some(v), Some(f), Some(q), Some(d)) => (v, f, q, d),
        _ => unreachable!("missing-fields check covers all four"),
    };

    let format = MediaFormat::parse(&format_raw).ok_or_else(|| ItemIssue {
        message: format!("Unsupported format: {format_raw}. Use mp4 or mp3."),
        missing_fields: Vec::new(),
    })?;

    let quality = QualityTarget::parse(&quality_raw, format).ok_or_else(|| ItemIssue {
        message: format!("Invalid quality for {format}: {quality_raw}"),
        missing_fields: Vec::new(),
    })?;

    check_video_link(&video_link).map_err(|message| ItemIssue {
        message,
        missing_fields: Vec::new(),
    })?;

    ensure_folder(&folder).map_err(|message| ItemIssue {
        message,
        missing_fields: Vec::new(),
    })?;

    Ok(ItemSpec {
        video_link,
        format,
        quality: quality.normalized(),
        folder,
        name: non_empty(&req.name).map(|n| fsutil::safe_file_stem(&n)),
    })
}

/// Validate a single-video payload
pub fn validate_single(req: &ItemRequest, config: &Config) -> Result<ItemSpec, ValidationFailure> {
    validate_item(req, config).map_err(|issue| {
        if issue.missing_fields.is_empty() {
            ValidationFailure::new(issue.message)
        } else {
            ValidationFailure::missing(issue.missing_fields)
        }
    })
}

/// Validate a batch payload, all-or-nothing
///
/// An empty `videos` array is itself invalid. Every invalid item is
/// reported with its index; no task is created if any item fails.
pub fn validate_batch(
    reqs: &[ItemRequest],
    config: &Config,
) -> Result<Vec<ItemSpec>, ValidationFailure> {
    if reqs.is_empty() {
        return Err(ValidationFailure::new(
            "videos must be a non-empty array.",
        ));
    }

    let mut specs = Vec::with_capacity(reqs.len());
    let mut errors = Vec::new();
    for (index, req) in reqs.iter().enumerate() {
        match validate_item(req, config) {
            Ok(spec) => specs.push(spec),
            Err(issue) => errors.push(VideoError {
                index,
                error: issue.message,
                missing_fields: issue.missing_fields,
            }),
        }
    }

    if errors.is_empty() {
        Ok(specs)
    } else {
        Err(ValidationFailure::batch(errors))
    }
}

/// Free-space floor for the folder pre-flight; folders with less than
/// this available are rejected at submission time
const MIN_FREE_SPACE: u64 = 50 * 1024 * 1024;

/// Create-if-missing, probe writability, then check free space
fn ensure_folder(folder: &std::path::Path) -> Result<(), String> {
    if !folder.exists()
        && let Err(e) = std::fs::create_dir_all(folder)
    {
        return Err(format!(
            "Cannot create folder {}: {e}",
            folder.display()
        ));
    }
    fsutil::ensure_writable_dir(folder)
        .map_err(|e| format!("Folder {} is not writable: {e}", folder.display()))?;
    check_free_space(folder, MIN_FREE_SPACE)
}

/// Reject folders whose filesystem reports less than `min` bytes free
///
/// A failed space query is not a rejection; platforms without a usable
/// statvfs accept the folder and surface disk-full at write time instead.
fn check_free_space(folder: &std::path::Path, min: u64) -> Result<(), String> {
    match fsutil::get_available_space(folder) {
        Ok(available) if available < min => Err(format!(
            "Folder {} has insufficient free space ({available} bytes available).",
            folder.display()
        )),
        Ok(_) => Ok(()),
        Err(e) => {
            tracing::debug!(folder = %folder.display(), error = %e, "free space check skipped");
            Ok(())
        }
    }
}

fn non_empty(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request(temp: &TempDir) -> ItemRequest {
        ItemRequest {
            video_link: Some("https://www.youtube.com/watch?v=abc123".to_string()),
            format: Some("mp4".to_string()),
            quality: Some("720p".to_string()),
            folder: Some(temp.path().to_string_lossy().into_owned()),
            name: None,
        }
    }

    // --- URL checks ---

    #[test]
    fn accepts_standard_watch_urls() {
        assert!(check_video_link("https://www.youtube.com/watch?v=abc").is_ok());
        assert!(check_video_link("https://youtube.com/watch?v=abc").is_ok());
        assert!(check_video_link("https://m.youtube.com/watch?v=abc").is_ok());
        assert!(check_video_link("https://youtu.be/abc123").is_ok());
        assert!(check_video_link("https://www.youtube.com/shorts/abc123").is_ok());
    }

    #[test]
    fn rejects_non_youtube_hosts() {
        assert!(check_video_link("https://vimeo.com/12345").is_err());
        assert!(check_video_link("https://youtube.com.evil.example/watch?v=a").is_err());
        assert!(check_video_link("https://notyoutube.com/watch?v=a").is_err());
    }

    #[test]
    fn rejects_unparseable_and_bare_urls() {
        assert!(check_video_link("not a url").is_err());
        assert!(check_video_link("https://www.youtube.com").is_err());
        assert!(check_video_link("https://www.youtube.com/").is_err());
        assert!(check_video_link("ftp://youtube.com/watch?v=a").is_err());
    }

    #[test]
    fn rejects_playlists() {
        assert!(
            check_video_link("https://www.youtube.com/playlist?list=PLx").is_err()
        );
        assert!(
            check_video_link("https://www.youtube.com/watch?v=abc&list=PLx").is_err()
        );
    }

    #[test]
    fn playlist_detection_covers_param_and_path() {
        let with_param = Url::parse("https://youtube.com/watch?v=a&list=PL1").unwrap();
        assert!(is_playlist(&with_param));

        let path_only = Url::parse("https://youtube.com/playlist?foo=1").unwrap();
        assert!(is_playlist(&path_only));

        let plain = Url::parse("https://youtube.com/watch?v=a").unwrap();
        assert!(!is_playlist(&plain));
    }

    // --- single validation ---

    #[test]
    fn valid_single_request_normalizes_quality() {
        let temp = TempDir::new().unwrap();
        let mut req = request(&temp);
        req.quality = Some("720".to_string());

        let spec = validate_single(&req, &Config::default()).unwrap();
        assert_eq!(spec.quality, "720p");
        assert_eq!(spec.format, MediaFormat::Mp4);
    }

    #[test]
    fn missing_fields_are_all_named() {
        let failure =
            validate_single(&ItemRequest::default(), &Config::default()).unwrap_err();
        assert_eq!(
            failure.missing_fields,
            vec!["video_link", "format", "quality", "folder"]
        );
    }

    #[test]
    fn whitespace_only_fields_count_as_missing() {
        let temp = TempDir::new().unwrap();
        let mut req = request(&temp);
        req.quality = Some("   ".to_string());

        let failure = validate_single(&req, &Config::default()).unwrap_err();
        assert_eq!(failure.missing_fields, vec!["quality"]);
    }

    #[test]
    fn default_folder_fills_missing_folder() {
        let temp = TempDir::new().unwrap();
        let mut req = request(&temp);
        req.folder = None;

        let config = Config {
            default_folder: Some(temp.path().to_path_buf()),
            ..Config::default()
        };
        let spec = validate_single(&req, &config).unwrap();
        assert_eq!(spec.folder, temp.path());
    }

    #[test]
    fn bad_format_is_rejected_with_message() {
        let temp = TempDir::new().unwrap();
        let mut req = request(&temp);
        req.format = Some("avi".to_string());

        let failure = validate_single(&req, &Config::default()).unwrap_err();
        assert!(failure.message.contains("avi"));
        assert!(failure.missing_fields.is_empty());
    }

    #[test]
    fn playlist_url_is_rejected_at_submission() {
        let temp = TempDir::new().unwrap();
        let mut req = request(&temp);
        req.video_link = Some("https://www.youtube.com/watch?v=a&list=PL9".to_string());

        let failure = validate_single(&req, &Config::default()).unwrap_err();
        assert!(failure.message.contains("Playlist"));
    }

    #[test]
    fn missing_folder_is_created() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        let mut req = request(&temp);
        req.folder = Some(nested.to_string_lossy().into_owned());

        let spec = validate_single(&req, &Config::default()).unwrap();
        assert_eq!(spec.folder, nested);
        assert!(nested.is_dir());
    }

    #[test]
    fn name_is_sanitized() {
        let temp = TempDir::new().unwrap();
        let mut req = request(&temp);
        req.name = Some("my/clip: final?".to_string());

        let spec = validate_single(&req, &Config::default()).unwrap();
        assert_eq!(spec.name.as_deref(), Some("my clip final"));
    }

    // --- free-space pre-flight ---

    #[test]
    fn free_space_floor_passes_ordinary_folders() {
        let temp = TempDir::new().unwrap();
        assert!(check_free_space(temp.path(), MIN_FREE_SPACE).is_ok());
    }

    #[test]
    fn unmeetable_free_space_floor_rejects_folder() {
        let temp = TempDir::new().unwrap();
        let err = check_free_space(temp.path(), u64::MAX).unwrap_err();
        assert!(err.contains("free space"));
    }

    // --- batch validation ---

    #[test]
    fn empty_batch_is_invalid() {
        let failure = validate_batch(&[], &Config::default()).unwrap_err();
        assert!(failure.message.contains("non-empty"));
    }

    #[test]
    fn batch_is_all_or_nothing_with_indexed_errors() {
        let temp = TempDir::new().unwrap();
        let good = request(&temp);
        let mut bad_url = request(&temp);
        bad_url.video_link = Some("https://vimeo.com/1".to_string());
        let missing = ItemRequest {
            folder: Some(temp.path().to_string_lossy().into_owned()),
            ..ItemRequest::default()
        };

        let failure =
            validate_batch(&[good, bad_url, missing], &Config::default()).unwrap_err();

        assert_eq!(failure.video_errors.len(), 2);
        assert_eq!(failure.video_errors[0].index, 1);
        assert!(failure.video_errors[0].error.contains("YouTube"));
        assert_eq!(failure.video_errors[1].index, 2);
        assert_eq!(
            failure.video_errors[1].missing_fields,
            vec!["video_link", "format", "quality"]
        );
    }

    #[test]
    fn valid_batch_preserves_order() {
        let temp = TempDir::new().unwrap();
        let mut first = request(&temp);
        first.quality = Some("1080p".to_string());
        let mut second = request(&temp);
        second.format = Some("mp3".to_string());
        second.quality = Some("128".to_string());

        let specs = validate_batch(&[first, second], &Config::default()).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].quality, "1080p");
        assert_eq!(specs[1].format, MediaFormat::Mp3);
        assert_eq!(specs[1].quality, "128kbps");
    }
}
