//! # tube-dl
//!
//! Asynchronous YouTube download task engine with an embeddable REST API.
//!
//! ## Design Philosophy
//!
//! tube-dl is designed to be:
//! - **Library-first** - The REST API is optional; the engine embeds as a plain Rust crate
//! - **Non-blocking at the boundary** - Submissions validate synchronously and queue instantly;
//!   downloads run on a bounded worker pool
//! - **Self-cleaning** - Terminal task records age out on a timed retention sweep
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use tube_dl::{Config, TubeDownloader};
//! use tube_dl::validate::ItemRequest;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = TubeDownloader::new(Config::default())?;
//!     downloader.start();
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let receipt = downloader
//!         .submit(ItemRequest {
//!             video_link: Some("https://www.youtube.com/watch?v=jNQXAC9IVRw".into()),
//!             format: Some("mp4".into()),
//!             quality: Some("720p".into()),
//!             folder: Some("./downloads".into()),
//!             name: None,
//!         })
//!         .await?;
//!     println!("queued as {}", receipt.task_id);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Core download engine (decomposed into focused submodules)
pub mod engine;
/// Error types
pub mod error;
/// Extraction backends (Innertube client, yt-dlp)
pub mod extractor;
/// Filename safety, unique paths, disk space
pub mod fsutil;
/// Audio/video multiplexing (ffmpeg)
pub mod muxer;
/// Quality normalization and rendition resolution
pub mod quality;
/// In-memory task store
pub mod store;
/// Core types and events
pub mod types;
/// Submission validation
pub mod validate;

// Re-export commonly used types
pub use config::{ApiMode, Config, ExtractorPreference};
pub use engine::TubeDownloader;
pub use error::{
    ApiError, DownloadError, Error, ErrorDetail, Result, ToHttpStatus, ValidationFailure,
    VideoError,
};
pub use extractor::{Extractor, VideoManifest};
pub use muxer::Muxer;
pub use types::{
    BatchSummary, Event, HealthReport, Item, ItemOutcome, ItemSpec, MediaFormat, SubmitReceipt,
    Task, TaskCounts, TaskId, TaskKind, TaskStatus,
};

/// Helper function to run the engine with graceful signal handling.
///
/// Waits for a termination signal and then calls the engine's `shutdown()`
/// method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use tube_dl::{Config, TubeDownloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = TubeDownloader::new(Config::default())?;
///     let handles = downloader.start();
///
///     // Run with automatic signal handling
///     run_with_shutdown(&downloader).await?;
///
///     // Workers finish their current task before exiting
///     for handle in handles {
///         handle.await?;
///     }
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: &TubeDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
