use super::*;
use crate::engine::test_helpers::{StubExtractor, StubMuxer, test_config};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt; // for oneshot


const URL_A: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
const URL_B: &str = "https://youtu.be/jNQXAC9IVRw";

/// Router plus the engine behind it, with stub backends and workers running
fn test_app_with(config: Config, extractor: StubExtractor) -> (Router, Arc<TubeDownloader>) {
    let downloader = Arc::new(
        TubeDownloader::with_collaborators(
            config.clone(),
            Arc::new(extractor),
            Arc::new(StubMuxer::new()),
        )
        .expect("engine construction"),
    );
    downloader.start();

    let app = create_router(Arc::clone(&downloader), Arc::new(config));
    (app, downloader)
}

fn test_app() -> (Router, Arc<TubeDownloader>) {
    test_app_with(test_config(), StubExtractor::new())
}

/// JSON download payload targeting a temp folder
fn download_body(temp: &TempDir, url: &str) -> serde_json::Value {
    serde_json::json!({
        "video_link": url,
        "format": "mp4",
        "quality": "360p",
        "folder": temp.path().to_string_lossy(),
    })
}

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request build")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request build")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// Poll GET /api/download/:id until the reported status is terminal
async fn wait_for_terminal(app: &Router, task_id: &str) -> serde_json::Value {
    let uri = format!("/api/download/{task_id}");
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let response = app.clone().oneshot(get(&uri)).await.expect("status request");
        assert_eq!(response.status(), StatusCode::OK);
        let report = body_json(response).await;

        match report["status"].as_str() {
            Some("completed") | Some("failed") => return report,
            _ => {}
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "task {task_id} did not reach a terminal state in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
