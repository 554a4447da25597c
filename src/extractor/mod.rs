//! Extraction backends
//!
//! An [`Extractor`] turns a video URL into a [`VideoManifest`] of
//! downloadable renditions and fetches a chosen rendition to disk.
//! Two implementations exist: a native Innertube client speaking to
//! YouTube's player API over reqwest, and a wrapper around the yt-dlp
//! CLI. The backend is chosen once at startup from configuration.

mod innertube;
mod ytdlp;

pub use innertube::InnertubeExtractor;
pub use ytdlp::YtDlpExtractor;

use crate::config::{ExtractorPreference, ToolsConfig};
use crate::error::{Error, Result};
use crate::quality::Rendition;
use crate::types::MediaFormat;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Streams advertised for one video
#[derive(Debug, Clone, Default)]
pub struct VideoManifest {
    /// Video title, used for the default filename stem
    pub title: String,
    /// Video renditions (resolution-valued)
    pub video: Vec<Rendition>,
    /// Audio renditions (bitrate-valued)
    pub audio: Vec<Rendition>,
}

impl VideoManifest {
    /// The rendition set relevant to a requested format
    pub fn renditions(&self, format: MediaFormat) -> &[Rendition] {
        match format {
            MediaFormat::Mp4 => &self.video,
            MediaFormat::Mp3 => &self.audio,
        }
    }

    /// Best available audio rendition, for merging adaptive video
    pub fn best_audio(&self) -> Option<&Rendition> {
        self.audio.iter().max_by_key(|r| r.value)
    }
}

/// Interface to an extraction backend
///
/// `probe` never touches the filesystem; `fetch` writes exactly one file
/// at `dest`. Rendition tags are backend-specific and only meaningful to
/// the backend that produced them.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Human-readable backend name for logging and the health report
    fn name(&self) -> &'static str;

    /// Query the streams available for a video
    async fn probe(&self, url: &str) -> Result<VideoManifest>;

    /// Download the rendition identified by `tag` to `dest`
    async fn fetch(&self, url: &str, tag: &str, dest: &Path) -> Result<()>;
}

/// Primary backend with automatic fallback to a secondary
///
/// Used in `auto` mode: the native client is tried first and the yt-dlp
/// CLI picks up videos the native client cannot handle. Fetch does not
/// fall back, since rendition tags are backend-specific.
pub struct FallbackExtractor {
    primary: Arc<dyn Extractor>,
    secondary: Arc<dyn Extractor>,
}

impl FallbackExtractor {
    /// Wrap a primary and secondary backend
    pub fn new(primary: Arc<dyn Extractor>, secondary: Arc<dyn Extractor>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl Extractor for FallbackExtractor {
    fn name(&self) -> &'static str {
        "auto"
    }

    async fn probe(&self, url: &str) -> Result<VideoManifest> {
        match self.primary.probe(url).await {
            Ok(manifest) => Ok(prefix_tags(manifest, self.primary.name())),
            Err(e) => {
                tracing::warn!(
                    backend = self.primary.name(),
                    error = %e,
                    "primary extractor probe failed, falling back"
                );
                let manifest = self.secondary.probe(url).await?;
                Ok(prefix_tags(manifest, self.secondary.name()))
            }
        }
    }

    async fn fetch(&self, url: &str, tag: &str, dest: &Path) -> Result<()> {
        // Tags from a probe are only valid against the backend that issued
        // them; auto mode tags both, prefixed with the backend name.
        match tag.split_once(':') {
            Some((backend, rest)) if backend == self.primary.name() => {
                self.primary.fetch(url, rest, dest).await
            }
            Some((backend, rest)) if backend == self.secondary.name() => {
                self.secondary.fetch(url, rest, dest).await
            }
            _ => self.primary.fetch(url, tag, dest).await,
        }
    }
}

/// Mark every rendition tag with the backend that issued it
fn prefix_tags(mut manifest: VideoManifest, backend: &str) -> VideoManifest {
    for r in manifest.video.iter_mut().chain(manifest.audio.iter_mut()) {
        r.tag = format!("{backend}:{}", r.tag);
    }
    manifest
}

/// Choose the extraction backend from configuration
///
/// `innertube` always succeeds; `ytdlp` requires the binary (explicit path
/// or PATH discovery); `auto` uses the native client with a yt-dlp
/// fallback when the binary is present.
pub fn resolve_extractor(tools: &ToolsConfig) -> Result<Arc<dyn Extractor>> {
    match tools.extractor {
        ExtractorPreference::Innertube => Ok(Arc::new(InnertubeExtractor::new())),
        ExtractorPreference::Ytdlp => {
            let ytdlp = find_ytdlp(tools).ok_or_else(|| Error::Config {
                message: "yt-dlp binary not found".to_string(),
                key: Some("tools.ytdlp_path".to_string()),
            })?;
            Ok(Arc::new(ytdlp))
        }
        ExtractorPreference::Auto => {
            let innertube: Arc<dyn Extractor> = Arc::new(InnertubeExtractor::new());
            match find_ytdlp(tools) {
                Some(ytdlp) => {
                    tracing::info!("yt-dlp found, enabling extractor fallback");
                    Ok(Arc::new(FallbackExtractor::new(
                        innertube,
                        Arc::new(ytdlp),
                    )))
                }
                None => Ok(innertube),
            }
        }
    }
}

fn find_ytdlp(tools: &ToolsConfig) -> Option<YtDlpExtractor> {
    if let Some(path) = &tools.ytdlp_path {
        return Some(YtDlpExtractor::new(path.clone()));
    }
    if tools.search_path {
        return YtDlpExtractor::from_path();
    }
    None
}

/// Pull the video id out of a YouTube URL
///
/// Handles `watch?v=`, `youtu.be/<id>`, `/shorts/<id>`, `/embed/<id>` and
/// `/live/<id>` forms. Callers validate the URL shape beforehand, so a
/// missing id is an extraction failure rather than a validation one.
pub(crate) fn video_id(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url).map_err(|_| {
        crate::error::DownloadError::InvalidUrl {
            url: url.to_string(),
        }
    })?;

    if let Some(host) = parsed.host_str()
        && host.eq_ignore_ascii_case("youtu.be")
    {
        if let Some(id) = parsed.path_segments().and_then(|mut s| s.next())
            && !id.is_empty()
        {
            return Ok(id.to_string());
        }
    } else {
        if let Some((_, v)) = parsed.query_pairs().find(|(k, _)| k == "v")
            && !v.is_empty()
        {
            return Ok(v.into_owned());
        }
        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();
        if segments.len() >= 2
            && matches!(segments[0], "shorts" | "embed" | "live" | "v")
        {
            return Ok(segments[1].to_string());
        }
    }

    Err(crate::error::DownloadError::InvalidUrl {
        url: url.to_string(),
    }
    .into())
}
