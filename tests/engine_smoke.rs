//! End-to-end exercise of the public engine surface with injected backends.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tube_dl::quality::Rendition;
use tube_dl::validate::ItemRequest;
use tube_dl::{
    Config, DownloadError, Error, Extractor, Muxer, Result, TaskStatus, TubeDownloader,
    VideoManifest,
};

struct FakeTube;

#[async_trait]
impl Extractor for FakeTube {
    fn name(&self) -> &'static str {
        "fake-tube"
    }

    async fn probe(&self, _url: &str) -> Result<VideoManifest> {
        Ok(VideoManifest {
            title: "Integration Clip".to_string(),
            video: vec![
                Rendition {
                    value: 360,
                    progressive: true,
                    tag: "360".to_string(),
                },
                Rendition {
                    value: 720,
                    progressive: true,
                    tag: "720".to_string(),
                },
            ],
            audio: vec![Rendition {
                value: 128,
                progressive: true,
                tag: "a128".to_string(),
            }],
        })
    }

    async fn fetch(&self, _url: &str, _tag: &str, dest: &Path) -> Result<()> {
        tokio::fs::write(dest, b"fake media bytes").await?;
        Ok(())
    }
}

struct NoMuxer;

#[async_trait]
impl Muxer for NoMuxer {
    fn name(&self) -> &'static str {
        "none"
    }

    fn available(&self) -> bool {
        false
    }

    async fn merge(&self, _video: &Path, _audio: &Path, _output: &Path) -> Result<()> {
        Err(DownloadError::MergeFailure {
            reason: "no multiplexer in this test".to_string(),
        }
        .into())
    }
}

fn engine() -> TubeDownloader {
    let mut config = Config::default();
    config.workers.count = 2;
    config.tools.search_path = false;

    let downloader =
        TubeDownloader::with_collaborators(config, Arc::new(FakeTube), Arc::new(NoMuxer))
            .expect("engine construction");
    downloader.start();
    downloader
}

fn request(folder: &Path) -> ItemRequest {
    ItemRequest {
        video_link: Some("https://www.youtube.com/watch?v=jNQXAC9IVRw".to_string()),
        format: Some("mp4".to_string()),
        quality: Some("720p".to_string()),
        folder: Some(folder.to_string_lossy().into_owned()),
        name: Some("clip".to_string()),
    }
}

async fn wait_terminal(engine: &TubeDownloader, id: tube_dl::TaskId) -> tube_dl::Task {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let task = engine.task_status(id).await.expect("task should exist");
        if task.status.is_terminal() {
            return task;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "task did not finish in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn submitted_task_downloads_and_reports_outcome() {
    let engine = engine();
    let temp = tempfile::tempdir().unwrap();

    let receipt = engine.submit(request(temp.path())).await.unwrap();
    assert_eq!(receipt.status, TaskStatus::Queued);

    let task = wait_terminal(&engine, receipt.task_id).await;
    assert_eq!(task.status, TaskStatus::Completed);

    let outcome = task.items[0].outcome.as_ref().unwrap();
    assert_eq!(outcome.name, "clip");
    assert_eq!(outcome.actual_quality, "720p");
    assert!(!outcome.merge);
    assert!(outcome.save_path.exists());
}

#[tokio::test]
async fn invalid_submission_is_rejected_synchronously() {
    let engine = engine();

    let result = engine.submit(ItemRequest::default()).await;
    match result {
        Err(Error::Validation(failure)) => {
            assert!(failure.missing_fields.contains(&"video_link".to_string()));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[tokio::test]
async fn health_reflects_injected_backends() {
    let engine = engine();

    let health = engine.health().await;
    assert_eq!(health.status, "ok");
    assert_eq!(health.extractor, "fake-tube");
    assert!(!health.muxer_available);
    assert_eq!(health.workers, 2);
}

#[tokio::test]
async fn shutdown_stops_accepting_submissions() {
    let engine = engine();
    let temp = tempfile::tempdir().unwrap();

    engine.shutdown().await;

    let result = engine.submit(request(temp.path())).await;
    assert!(matches!(result, Err(Error::ShuttingDown)));
}
