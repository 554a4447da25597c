//! Application state for the API server

use crate::{Config, TubeDownloader};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone); hands out the engine for
/// submissions and status reads, and the configuration for read access.
#[derive(Clone)]
pub struct AppState {
    /// The download engine
    pub downloader: Arc<TubeDownloader>,

    /// Configuration (read access only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<TubeDownloader>, config: Arc<Config>) -> Self {
        Self { downloader, config }
    }
}
