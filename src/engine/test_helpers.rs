//! Shared fixtures for engine tests: stub backends and builders.

use crate::config::Config;
use crate::error::{DownloadError, Result};
use crate::extractor::{Extractor, VideoManifest};
use crate::muxer::Muxer;
use crate::quality::Rendition;
use crate::types::{Task, TaskId};
use crate::validate::ItemRequest;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

use super::TubeDownloader;

/// Extractor stub with a fixed manifest and per-URL failure injection
pub(crate) struct StubExtractor {
    manifest: VideoManifest,
    fail_probe_urls: HashSet<String>,
    fail_fetch_urls: HashSet<String>,
    pub(crate) fetch_calls: AtomicUsize,
}

impl StubExtractor {
    /// Manifest: progressive 360p, adaptive 1080p, 128kbps audio
    pub(crate) fn new() -> Self {
        Self::with_manifest(default_manifest())
    }

    pub(crate) fn with_manifest(manifest: VideoManifest) -> Self {
        Self {
            manifest,
            fail_probe_urls: HashSet::new(),
            fail_fetch_urls: HashSet::new(),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn fail_probe_for(mut self, url: &str) -> Self {
        self.fail_probe_urls.insert(url.to_string());
        self
    }

    pub(crate) fn fail_fetch_for(mut self, url: &str) -> Self {
        self.fail_fetch_urls.insert(url.to_string());
        self
    }
}

#[async_trait]
impl Extractor for StubExtractor {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn probe(&self, url: &str) -> Result<VideoManifest> {
        if self.fail_probe_urls.contains(url) {
            return Err(DownloadError::NetworkFailure {
                operation: "probe".to_string(),
                reason: "injected probe failure".to_string(),
            }
            .into());
        }
        Ok(self.manifest.clone())
    }

    async fn fetch(&self, url: &str, _tag: &str, dest: &Path) -> Result<()> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch_urls.contains(url) {
            return Err(DownloadError::NetworkFailure {
                operation: "fetch".to_string(),
                reason: "injected fetch failure".to_string(),
            }
            .into());
        }
        tokio::fs::write(dest, b"stub stream data").await?;
        Ok(())
    }
}

pub(crate) fn default_manifest() -> VideoManifest {
    VideoManifest {
        title: "Stub Clip".to_string(),
        video: vec![
            Rendition {
                value: 360,
                progressive: true,
                tag: "prog360".to_string(),
            },
            Rendition {
                value: 1080,
                progressive: false,
                tag: "adpt1080".to_string(),
            },
        ],
        audio: vec![Rendition {
            value: 128,
            progressive: true,
            tag: "aud128".to_string(),
        }],
    }
}

/// Muxer stub that writes a marker file (or fails on demand)
pub(crate) struct StubMuxer {
    fail: bool,
    pub(crate) merge_calls: AtomicUsize,
}

impl StubMuxer {
    pub(crate) fn new() -> Self {
        Self {
            fail: false,
            merge_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            merge_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Muxer for StubMuxer {
    fn name(&self) -> &'static str {
        "stub-muxer"
    }

    fn available(&self) -> bool {
        true
    }

    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        self.merge_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DownloadError::MergeFailure {
                reason: "injected merge failure".to_string(),
            }
            .into());
        }
        // Both inputs must exist before a merge makes sense
        assert!(video.exists(), "video staging file missing");
        assert!(audio.exists(), "audio staging file missing");
        tokio::fs::write(output, b"merged output").await?;
        Ok(())
    }
}

pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    config.workers.count = 2;
    config.tools.search_path = false;
    config
}

/// Engine with stub backends and workers running
pub(crate) fn engine_with(
    extractor: StubExtractor,
    muxer: StubMuxer,
) -> (TubeDownloader, Vec<tokio::task::JoinHandle<()>>) {
    let engine = TubeDownloader::with_collaborators(
        test_config(),
        Arc::new(extractor),
        Arc::new(muxer),
    )
    .expect("engine construction");
    let handles = engine.start();
    (engine, handles)
}

pub(crate) fn request(temp: &TempDir, url: &str) -> ItemRequest {
    ItemRequest {
        video_link: Some(url.to_string()),
        format: Some("mp4".to_string()),
        quality: Some("360p".to_string()),
        folder: Some(temp.path().to_string_lossy().into_owned()),
        name: None,
    }
}

/// Poll the store until the task reaches a terminal state
pub(crate) async fn wait_terminal(engine: &TubeDownloader, id: TaskId) -> Task {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(task) = engine.store.get(id).await
            && task.status.is_terminal()
        {
            return task;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "task {id} did not reach a terminal state in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
