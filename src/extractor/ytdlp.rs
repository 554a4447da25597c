//! yt-dlp CLI extraction backend
//!
//! Shells out to the yt-dlp binary: `-J` for probing and `-f <tag> -o` for
//! fetching. Rendition tags are yt-dlp format ids.

use super::{Extractor, VideoManifest};
use crate::error::{DownloadError, Result};
use crate::quality::Rendition;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Extraction backend wrapping the yt-dlp CLI
pub struct YtDlpExtractor {
    binary_path: PathBuf,
}

impl YtDlpExtractor {
    /// Backend with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output> {
        Command::new(&self.binary_path)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                DownloadError::ExtractorFailure(format!("failed to execute yt-dlp: {e}")).into()
            })
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn probe(&self, url: &str) -> Result<VideoManifest> {
        let output = self.run(&["-J", "--no-playlist", url]).await?;
        if !output.status.success() {
            return Err(classify_stderr(&output.stderr, "probe"));
        }

        let info: ProbeOutput = serde_json::from_slice(&output.stdout).map_err(|e| {
            DownloadError::ExtractorFailure(format!("malformed yt-dlp output: {e}"))
        })?;

        let mut manifest = VideoManifest {
            title: info.title.unwrap_or_default(),
            ..VideoManifest::default()
        };

        for format in &info.formats {
            let has_video = format.vcodec.as_deref().is_some_and(|c| c != "none");
            let has_audio = format.acodec.as_deref().is_some_and(|c| c != "none");
            match (has_video, has_audio) {
                (true, _) => {
                    if let Some(height) = format.height.filter(|h| *h > 0.0) {
                        manifest.video.push(Rendition {
                            value: height as u32,
                            progressive: has_audio,
                            tag: format.format_id.clone(),
                        });
                    }
                }
                (false, true) => {
                    if let Some(abr) = format.abr.filter(|b| *b > 0.0) {
                        manifest.audio.push(Rendition {
                            value: abr.round() as u32,
                            progressive: true,
                            tag: format.format_id.clone(),
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(manifest)
    }

    async fn fetch(&self, url: &str, tag: &str, dest: &Path) -> Result<()> {
        let dest_str = dest.to_string_lossy();
        let output = self
            .run(&["-f", tag, "--no-playlist", "-o", &dest_str, url])
            .await?;
        if !output.status.success() {
            return Err(classify_stderr(&output.stderr, "fetch"));
        }
        Ok(())
    }
}

/// Map yt-dlp stderr chatter onto the download taxonomy
fn classify_stderr(stderr: &[u8], operation: &str) -> crate::error::Error {
    let text = String::from_utf8_lossy(stderr);
    let line = text
        .lines()
        .rev()
        .find(|l| l.contains("ERROR"))
        .unwrap_or("yt-dlp failed")
        .trim()
        .to_string();

    let lowered = line.to_lowercase();
    if lowered.contains("unable to download")
        || lowered.contains("connection")
        || lowered.contains("timed out")
        || lowered.contains("network")
    {
        DownloadError::NetworkFailure {
            operation: format!("yt-dlp {operation}"),
            reason: line,
        }
        .into()
    } else {
        DownloadError::ExtractorFailure(line).into()
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    title: Option<String>,
    #[serde(default)]
    formats: Vec<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_id: String,
    vcodec: Option<String>,
    acodec: Option<String>,
    height: Option<f64>,
    abr: Option<f64>,
}
