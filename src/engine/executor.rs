//! Single-item download execution.
//!
//! Probe the video, resolve the quality, fetch the stream(s), and for
//! adaptive picks merge video+audio out of a staging directory. The final
//! file only appears at its destination path once it is complete.

use super::TubeDownloader;
use crate::error::{DownloadError, Error, Result};
use crate::fsutil;
use crate::quality::{self, QualityTarget};
use crate::types::{Item, ItemOutcome, TaskId};
use std::path::{Path, PathBuf};

impl TubeDownloader {
    /// Download one item and return its outcome metadata
    ///
    /// Every error path maps into the download taxonomy and is recorded by
    /// the caller; nothing here panics or kills the worker.
    pub(crate) async fn execute_item(&self, task_id: TaskId, item: &Item) -> Result<ItemOutcome> {
        let spec = &item.spec;

        let manifest = self.extractor.probe(&spec.video_link).await?;

        // The stored quality string was normalized at submission
        let target = QualityTarget::parse(&spec.quality, spec.format).ok_or_else(|| {
            Error::Other(format!("stored quality {} did not re-parse", spec.quality))
        })?;
        let resolved = quality::resolve(target, manifest.renditions(spec.format))?;

        tracing::debug!(
            task_id = %task_id,
            index = item.index,
            requested = %spec.quality,
            actual = %resolved.actual,
            merge = resolved.merge,
            "quality resolved"
        );

        let stem = spec
            .name
            .clone()
            .unwrap_or_else(|| fsutil::safe_file_stem(&manifest.title));
        let desired = spec.folder.join(format!("{stem}{}", spec.format.extension()));
        let save_path = fsutil::unique_path(&desired)?;

        if resolved.merge {
            let audio = manifest.best_audio().ok_or_else(|| {
                Error::Download(DownloadError::NoStreamsAvailable {
                    format: "audio".to_string(),
                })
            })?;
            self.fetch_and_merge(
                &spec.video_link,
                &resolved.rendition.tag,
                &audio.tag,
                &spec.folder,
                &save_path,
            )
            .await?;
        } else {
            self.fetch_direct(&spec.video_link, &resolved.rendition.tag, &save_path)
                .await?;
        }

        // Final name may differ from the requested stem after collision
        // suffixing; report what was actually written.
        let name = save_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&stem)
            .to_string();

        Ok(ItemOutcome {
            name,
            format: spec.format,
            requested_quality: spec.quality.clone(),
            actual_quality: resolved.actual,
            save_path,
            merge: resolved.merge,
        })
    }

    /// Progressive/audio path: one stream straight to the destination
    async fn fetch_direct(&self, url: &str, tag: &str, dest: &Path) -> Result<()> {
        if let Err(e) = self.extractor.fetch(url, tag, dest).await {
            // Never leave a partial file where a completed one belongs
            let _ = tokio::fs::remove_file(dest).await;
            return Err(e);
        }
        Ok(())
    }

    /// Adaptive path: stage both streams, merge into the destination
    ///
    /// Staging lives inside the target folder so the final merge output
    /// lands on the same filesystem and disk-full surfaces early.
    async fn fetch_and_merge(
        &self,
        url: &str,
        video_tag: &str,
        audio_tag: &str,
        folder: &Path,
        dest: &Path,
    ) -> Result<()> {
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(folder)
            .map_err(|e| fsutil::classify_io(e, folder, "create staging dir"))?;

        let video_path: PathBuf = staging.path().join("video.mp4");
        let audio_path: PathBuf = staging.path().join("audio.m4a");

        self.extractor.fetch(url, video_tag, &video_path).await?;
        self.extractor.fetch(url, audio_tag, &audio_path).await?;

        if let Err(e) = self.muxer.merge(&video_path, &audio_path, dest).await {
            let _ = tokio::fs::remove_file(dest).await;
            return Err(e);
        }
        // staging (and both stream files) removed on drop
        Ok(())
    }
}
