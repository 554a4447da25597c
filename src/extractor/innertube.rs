//! Native Innertube extraction backend
//!
//! Speaks directly to YouTube's internal player API with an Android client
//! identity, which returns direct (uncyphered) stream URLs. Rendition tags
//! are those stream URLs, so `fetch` is a plain streaming HTTP download.

use super::{Extractor, VideoManifest, video_id};
use crate::error::{DownloadError, Result};
use crate::fsutil;
use crate::quality::Rendition;
use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const DEFAULT_BASE_URL: &str = "https://www.youtube.com";
const PLAYER_ENDPOINT: &str = "/youtubei/v1/player";

// Android client identity; the player API serves direct stream URLs to it
const CLIENT_NAME: &str = "ANDROID";
const CLIENT_VERSION: &str = "19.09.37";
const ANDROID_SDK_VERSION: u32 = 30;
const USER_AGENT: &str = "com.google.android.youtube/19.09.37 (Linux; U; Android 11) gzip";

/// Extraction backend using YouTube's Innertube player API
pub struct InnertubeExtractor {
    client: reqwest::Client,
    base_url: String,
}

impl Default for InnertubeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl InnertubeExtractor {
    /// Backend against the real YouTube endpoint
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Backend against an arbitrary base URL (mock servers in tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn player_response(&self, id: &str) -> Result<PlayerResponse> {
        let body = serde_json::json!({
            "videoId": id,
            "context": {
                "client": {
                    "clientName": CLIENT_NAME,
                    "clientVersion": CLIENT_VERSION,
                    "androidSdkVersion": ANDROID_SDK_VERSION,
                    "hl": "en",
                }
            },
            "contentCheckOk": true,
            "racyCheckOk": true,
        });

        let response = self
            .client
            .post(format!("{}{PLAYER_ENDPOINT}", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| DownloadError::NetworkFailure {
                operation: "player probe".to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(DownloadError::NetworkFailure {
                operation: "player probe".to_string(),
                reason: format!("HTTP {}", response.status()),
            }
            .into());
        }

        response
            .json::<PlayerResponse>()
            .await
            .map_err(|e| {
                DownloadError::ExtractorFailure(format!("malformed player response: {e}")).into()
            })
    }
}

#[async_trait]
impl Extractor for InnertubeExtractor {
    fn name(&self) -> &'static str {
        "innertube"
    }

    async fn probe(&self, url: &str) -> Result<VideoManifest> {
        let id = video_id(url)?;
        let player = self.player_response(&id).await?;

        if let Some(status) = &player.playability_status
            && status.status.as_deref() != Some("OK")
        {
            let reason = status
                .reason
                .clone()
                .or_else(|| status.status.clone())
                .unwrap_or_else(|| "unplayable".to_string());
            return Err(DownloadError::ExtractorFailure(format!(
                "video {id} not playable: {reason}"
            ))
            .into());
        }

        let streaming = player.streaming_data.unwrap_or_default();
        let mut manifest = VideoManifest {
            title: player
                .video_details
                .and_then(|d| d.title)
                .unwrap_or_default(),
            ..VideoManifest::default()
        };

        for format in &streaming.formats {
            if let Some(r) = video_rendition(format, true) {
                manifest.video.push(r);
            }
        }
        for format in &streaming.adaptive_formats {
            let mime = format.mime_type.as_deref().unwrap_or("");
            if mime.starts_with("video/") {
                if let Some(r) = video_rendition(format, false) {
                    manifest.video.push(r);
                }
            } else if mime.starts_with("audio/")
                && let (Some(url), Some(bitrate)) = (&format.url, format.bitrate)
                && bitrate > 0
            {
                manifest.audio.push(Rendition {
                    value: (bitrate / 1000).max(1) as u32,
                    progressive: true,
                    tag: url.clone(),
                });
            }
        }

        tracing::debug!(
            video_id = %id,
            video_renditions = manifest.video.len(),
            audio_renditions = manifest.audio.len(),
            "probed video"
        );
        Ok(manifest)
    }

    async fn fetch(&self, url: &str, tag: &str, dest: &Path) -> Result<()> {
        // The tag is the direct stream URL issued by probe
        let response = self
            .client
            .get(tag)
            .send()
            .await
            .map_err(|e| DownloadError::NetworkFailure {
                operation: "stream download".to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(DownloadError::NetworkFailure {
                operation: "stream download".to_string(),
                reason: format!("HTTP {} for {url}", response.status()),
            }
            .into());
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| fsutil::classify_io(e, dest, "create stream file"))?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DownloadError::NetworkFailure {
                operation: "stream download".to_string(),
                reason: e.to_string(),
            })?;
            file.write_all(&chunk)
                .await
                .map_err(|e| fsutil::classify_io(e, dest, "write stream chunk"))?;
        }
        file.flush()
            .await
            .map_err(|e| fsutil::classify_io(e, dest, "flush stream file"))?;
        Ok(())
    }
}

fn video_rendition(format: &StreamFormat, progressive: bool) -> Option<Rendition> {
    match (&format.url, format.height) {
        (Some(url), Some(height)) if height > 0 => Some(Rendition {
            value: height,
            progressive,
            tag: url.clone(),
        }),
        // Cipher-protected entries carry no direct url and are skipped
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    video_details: Option<VideoDetails>,
    streaming_data: Option<StreamingData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoDetails {
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamingData {
    #[serde(default)]
    formats: Vec<StreamFormat>,
    #[serde(default)]
    adaptive_formats: Vec<StreamFormat>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamFormat {
    url: Option<String>,
    mime_type: Option<String>,
    height: Option<u32>,
    bitrate: Option<u64>,
}
