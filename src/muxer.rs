//! Stream multiplexing for adaptive downloads
//!
//! High-resolution video renditions come without audio; a [`Muxer`] joins
//! the separately fetched video and audio streams into one MP4. With no
//! ffmpeg binary the engine still runs, it just fails merges cleanly via
//! [`UnavailableMuxer`].

use crate::error::{DownloadError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;

/// Trait for joining separate audio/video streams into one file
#[async_trait]
pub trait Muxer: Send + Sync {
    /// Human-readable name for logging and the health report
    fn name(&self) -> &'static str;

    /// Whether this muxer can actually merge
    fn available(&self) -> bool;

    /// Join `video` and `audio` into `output`
    ///
    /// Inputs are staging files owned by the caller; the muxer never
    /// deletes them.
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()>;
}

/// ffmpeg-based muxer using the external binary
pub struct FfmpegMuxer {
    binary_path: PathBuf,
}

impl FfmpegMuxer {
    /// Muxer with an explicit ffmpeg path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find ffmpeg in PATH
    pub fn from_path() -> Option<Self> {
        which::which("ffmpeg").ok().map(Self::new)
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn available(&self) -> bool {
        true
    }

    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        // Video is copied as-is; audio is re-encoded to AAC so any source
        // codec lands in a spec-compliant MP4. faststart moves the moov
        // atom up front for streamable output.
        let result = Command::new(&self.binary_path)
            .arg("-y")
            .arg("-i")
            .arg(video)
            .arg("-i")
            .arg(audio)
            .arg("-c:v")
            .arg("copy")
            .arg("-c:a")
            .arg("aac")
            .arg("-movflags")
            .arg("+faststart")
            .arg(output)
            .output()
            .await
            .map_err(|e| DownloadError::MergeFailure {
                reason: format!("failed to execute ffmpeg: {e}"),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("ffmpeg failed")
                .trim()
                .to_string();
            return Err(DownloadError::MergeFailure { reason }.into());
        }
        Ok(())
    }
}

/// Stub muxer used when no ffmpeg binary can be found
///
/// Keeps the engine constructible without the binary; progressive and
/// audio downloads work normally and only merges fail.
pub struct UnavailableMuxer;

#[async_trait]
impl Muxer for UnavailableMuxer {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn available(&self) -> bool {
        false
    }

    async fn merge(&self, _video: &Path, _audio: &Path, _output: &Path) -> Result<()> {
        Err(DownloadError::MergeFailure {
            reason: "no multiplexer binary available (install ffmpeg or set FFMPEG_PATH)"
                .to_string(),
        }
        .into())
    }
}

/// Choose the muxer from configuration
///
/// Explicit path wins, then PATH discovery, then the unavailable stub
/// with a warning.
pub fn resolve_muxer(tools: &crate::config::ToolsConfig) -> Arc<dyn Muxer> {
    if let Some(path) = &tools.ffmpeg_path {
        return Arc::new(FfmpegMuxer::new(path.clone()));
    }
    if tools.search_path
        && let Some(muxer) = FfmpegMuxer::from_path()
    {
        return Arc::new(muxer);
    }
    tracing::warn!("ffmpeg not found; high-quality merges will fail");
    Arc::new(UnavailableMuxer)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolsConfig;
    use crate::error::Error;

    #[test]
    fn from_path_consistent_with_which() {
        assert_eq!(which::which("ffmpeg").is_ok(), FfmpegMuxer::from_path().is_some());
    }

    #[tokio::test]
    async fn unavailable_muxer_fails_merges_with_merge_failure() {
        let muxer = UnavailableMuxer;
        assert!(!muxer.available());

        let err = muxer
            .merge(
                Path::new("/tmp/v.mp4"),
                Path::new("/tmp/a.m4a"),
                Path::new("/tmp/out.mp4"),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Download(DownloadError::MergeFailure { .. })
        ));
    }

    #[tokio::test]
    async fn ffmpeg_muxer_with_bad_binary_reports_merge_failure() {
        let muxer = FfmpegMuxer::new(PathBuf::from("/nonexistent/ffmpeg"));
        assert!(muxer.available());

        let err = muxer
            .merge(
                Path::new("/tmp/v.mp4"),
                Path::new("/tmp/a.m4a"),
                Path::new("/tmp/out.mp4"),
            )
            .await
            .unwrap_err();
        match err {
            Error::Download(DownloadError::MergeFailure { reason }) => {
                assert!(reason.contains("execute"));
            }
            other => panic!("expected MergeFailure, got {other:?}"),
        }
    }

    #[test]
    fn explicit_path_beats_discovery() {
        let tools = ToolsConfig {
            ffmpeg_path: Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg")),
            ..ToolsConfig::default()
        };
        let muxer = resolve_muxer(&tools);
        assert_eq!(muxer.name(), "ffmpeg");
    }

    #[test]
    fn no_search_and_no_path_yields_unavailable() {
        let tools = ToolsConfig {
            ffmpeg_path: None,
            search_path: false,
            ..ToolsConfig::default()
        };
        let muxer = resolve_muxer(&tools);
        assert_eq!(muxer.name(), "unavailable");
        assert!(!muxer.available());
    }
}
