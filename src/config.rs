//! Configuration types for tube-dl

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Environment variable overriding `retention.task_retention_minutes`
pub const ENV_RETENTION_MINUTES: &str = "TASK_RETENTION_MINUTES";
/// Environment variable overriding `retention.cleanup_interval_seconds`
pub const ENV_CLEANUP_INTERVAL_SECONDS: &str = "TASK_CLEANUP_INTERVAL_SECONDS";
/// Environment variable overriding `tools.ffmpeg_path`
pub const ENV_FFMPEG_PATH: &str = "FFMPEG_PATH";

/// Access mode for the REST API
///
/// Controls both the default bind address and whether an API key is
/// demanded. Only `unprivate` authenticates: `private` trusts the loopback
/// boundary and `public` is deliberately open. `/api/health` is exempt in
/// every mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApiMode {
    /// Loopback only, no authentication (default)
    #[default]
    Private,
    /// All interfaces, API key required
    Unprivate,
    /// All interfaces, no authentication
    Public,
}

impl ApiMode {
    /// Whether this mode demands an API key on protected routes
    pub fn requires_key(&self) -> bool {
        matches!(self, ApiMode::Unprivate)
    }

    /// Default bind address for the mode
    pub fn default_bind(&self) -> SocketAddr {
        match self {
            ApiMode::Private => SocketAddr::from(([127, 0, 0, 1], 8591)),
            ApiMode::Unprivate | ApiMode::Public => SocketAddr::from(([0, 0, 0, 0], 8591)),
        }
    }
}

/// Worker pool configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct WorkerConfig {
    /// Number of download workers (default: 3)
    #[serde(default = "default_workers")]
    pub count: usize,

    /// Bound of the dispatch queue (default: 256)
    ///
    /// Submissions block at the gateway once this many accepted tasks are
    /// waiting for a worker.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: default_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Retention and cleanup configuration for terminal task records
///
/// Effective values are floored: retention never drops below 1 minute and
/// the sweep interval never below 10 seconds, so misconfiguration cannot
/// turn the store into a busy loop that evicts results callers are still
/// polling for.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetentionConfig {
    /// How long terminal tasks remain queryable, in minutes (default: 60)
    #[serde(default = "default_retention_minutes")]
    pub task_retention_minutes: u64,

    /// How often the cleanup sweep runs, in seconds (default: 60)
    #[serde(default = "default_cleanup_interval_seconds")]
    pub cleanup_interval_seconds: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            task_retention_minutes: default_retention_minutes(),
            cleanup_interval_seconds: default_cleanup_interval_seconds(),
        }
    }
}

impl RetentionConfig {
    /// Retention window with the 60-second floor applied
    pub fn retention(&self) -> Duration {
        Duration::from_secs((self.task_retention_minutes * 60).max(60))
    }

    /// Sweep interval with the 10-second floor applied
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds.max(10))
    }
}

/// Extraction backend preference
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorPreference {
    /// Try the native Innertube client first, fall back to yt-dlp (default)
    #[default]
    Auto,
    /// Native Innertube client only
    Innertube,
    /// yt-dlp CLI only
    Ytdlp,
}

/// External tool paths (ffmpeg, yt-dlp)
///
/// Explicit paths win; otherwise binaries are discovered on PATH when
/// `search_path` is set.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolsConfig {
    /// Path to ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Path to yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Which extraction backend to prefer
    #[serde(default)]
    pub extractor: ExtractorPreference,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ytdlp_path: None,
            search_path: true,
            extractor: ExtractorPreference::default(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Access mode (default: private)
    #[serde(default)]
    pub mode: ApiMode,

    /// Address to bind to (None = mode default: 127.0.0.1:8591 private, 0.0.0.0:8591 otherwise)
    #[serde(default)]
    pub bind_address: Option<SocketAddr>,

    /// Accepted API keys, consulted only in `unprivate` mode
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            mode: ApiMode::default(),
            bind_address: None,
            api_keys: vec![],
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

impl ApiConfig {
    /// The address the server binds to, falling back to the mode default
    pub fn effective_bind(&self) -> SocketAddr {
        self.bind_address.unwrap_or_else(|| self.mode.default_bind())
    }

    /// Reject API configurations the server cannot start with
    ///
    /// Checked when the API server starts, not at engine construction;
    /// library-only use never needs keys.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.mode.requires_key() && !self.api_keys.iter().any(|k| !k.is_empty()) {
            return Err(crate::error::Error::Config {
                message: format!(
                    "api mode {:?} requires at least one non-empty api key",
                    self.mode
                ),
                key: Some("api.api_keys".to_string()),
            });
        }
        Ok(())
    }
}

/// Main configuration for TubeDownloader
///
/// Fields are organized into logical sub-configs:
/// - [`workers`](WorkerConfig) — pool size, dispatch queue bound
/// - [`retention`](RetentionConfig) — terminal task retention and sweep cadence
/// - [`tools`](ToolsConfig) — external binary paths, extraction backend
/// - [`api`](ApiConfig) — bind mode, keys, CORS, Swagger UI
///
/// `apply_env_overrides` layers the runtime environment on top; values that
/// fail to parse are ignored with a warning rather than aborting startup.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Default download folder when a request omits one (None = folder required per request)
    #[serde(default)]
    pub default_folder: Option<PathBuf>,

    /// Worker pool settings
    #[serde(default)]
    pub workers: WorkerConfig,

    /// Retention and cleanup settings
    #[serde(default)]
    pub retention: RetentionConfig,

    /// External tool paths and extraction backend
    #[serde(default)]
    pub tools: ToolsConfig,

    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Overlay environment variables onto the configuration
    ///
    /// Recognized: `TASK_RETENTION_MINUTES`, `TASK_CLEANUP_INTERVAL_SECONDS`,
    /// `FFMPEG_PATH`. Unparseable values leave the configured value in place.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var(ENV_RETENTION_MINUTES) {
            match raw.trim().parse::<u64>() {
                Ok(minutes) => self.retention.task_retention_minutes = minutes,
                Err(_) => tracing::warn!(
                    value = %raw,
                    "ignoring unparseable {ENV_RETENTION_MINUTES}"
                ),
            }
        }
        if let Ok(raw) = std::env::var(ENV_CLEANUP_INTERVAL_SECONDS) {
            match raw.trim().parse::<u64>() {
                Ok(seconds) => self.retention.cleanup_interval_seconds = seconds,
                Err(_) => tracing::warn!(
                    value = %raw,
                    "ignoring unparseable {ENV_CLEANUP_INTERVAL_SECONDS}"
                ),
            }
        }
        if let Ok(raw) = std::env::var(ENV_FFMPEG_PATH) {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                tracing::warn!("ignoring empty {ENV_FFMPEG_PATH}");
            } else {
                self.tools.ffmpeg_path = Some(PathBuf::from(trimmed));
            }
        }
    }

    /// Reject configurations the engine cannot start with
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.workers.count == 0 {
            return Err(crate::error::Error::Config {
                message: "worker count must be at least 1".to_string(),
                key: Some("workers.count".to_string()),
            });
        }
        if self.workers.queue_capacity == 0 {
            return Err(crate::error::Error::Config {
                message: "dispatch queue capacity must be at least 1".to_string(),
                key: Some("workers.queue_capacity".to_string()),
            });
        }
        Ok(())
    }
}

// Default value functions
fn default_workers() -> usize {
    3
}

fn default_queue_capacity() -> usize {
    256
}

fn default_retention_minutes() -> u64 {
    30
}

fn default_cleanup_interval_seconds() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_survives_json_round_trip() {
        let original = Config::default();

        let json = serde_json::to_string(&original).expect("Config must serialize to JSON");
        let restored: Config =
            serde_json::from_str(&json).expect("Config must deserialize from its own JSON");

        assert_eq!(restored.workers.count, original.workers.count);
        assert_eq!(
            restored.retention.task_retention_minutes,
            original.retention.task_retention_minutes
        );
        assert_eq!(restored.api.mode, original.api.mode);
        assert_eq!(restored.tools.extractor, original.tools.extractor);
    }

    #[test]
    fn empty_json_object_yields_defaults() {
        let config: Config = serde_json::from_str("{}").expect("deserialize failed");
        assert_eq!(config.workers.count, 3);
        assert_eq!(config.retention.task_retention_minutes, 30);
        assert_eq!(config.retention.cleanup_interval_seconds, 60);
        assert_eq!(config.api.mode, ApiMode::Private);
        assert!(config.tools.search_path);
    }

    #[test]
    fn retention_floor_is_one_minute() {
        let retention = RetentionConfig {
            task_retention_minutes: 0,
            cleanup_interval_seconds: 60,
        };
        assert_eq!(retention.retention(), Duration::from_secs(60));
    }

    #[test]
    fn cleanup_interval_floor_is_ten_seconds() {
        let retention = RetentionConfig {
            task_retention_minutes: 60,
            cleanup_interval_seconds: 1,
        };
        assert_eq!(retention.cleanup_interval(), Duration::from_secs(10));
    }

    #[test]
    fn configured_values_above_floors_pass_through() {
        let retention = RetentionConfig {
            task_retention_minutes: 120,
            cleanup_interval_seconds: 300,
        };
        assert_eq!(retention.retention(), Duration::from_secs(120 * 60));
        assert_eq!(retention.cleanup_interval(), Duration::from_secs(300));
    }

    #[test]
    fn private_mode_binds_loopback_without_key() {
        assert_eq!(
            ApiMode::Private.default_bind(),
            SocketAddr::from(([127, 0, 0, 1], 8591))
        );
        assert!(!ApiMode::Private.requires_key());
    }

    #[test]
    fn unprivate_mode_binds_all_interfaces_and_requires_key() {
        assert_eq!(
            ApiMode::Unprivate.default_bind(),
            SocketAddr::from(([0, 0, 0, 0], 8591))
        );
        assert!(ApiMode::Unprivate.requires_key());
    }

    #[test]
    fn public_mode_binds_all_interfaces_without_key() {
        assert_eq!(
            ApiMode::Public.default_bind(),
            SocketAddr::from(([0, 0, 0, 0], 8591))
        );
        assert!(!ApiMode::Public.requires_key());
    }

    #[test]
    fn explicit_bind_address_wins_over_mode_default() {
        let api = ApiConfig {
            bind_address: Some(SocketAddr::from(([10, 0, 0, 5], 9000))),
            ..ApiConfig::default()
        };
        assert_eq!(
            api.effective_bind(),
            SocketAddr::from(([10, 0, 0, 5], 9000))
        );
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let config = Config {
            workers: WorkerConfig {
                count: 0,
                ..WorkerConfig::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn api_validate_rejects_unprivate_mode_without_keys() {
        // Unprivate with an empty keylist cannot authenticate anyone
        let unkeyed = ApiConfig {
            mode: ApiMode::Unprivate,
            ..ApiConfig::default()
        };
        assert!(unkeyed.validate().is_err());

        let keyed = ApiConfig {
            mode: ApiMode::Unprivate,
            api_keys: vec!["s3cret".to_string()],
            ..ApiConfig::default()
        };
        assert!(keyed.validate().is_ok());

        let empty_key_only = ApiConfig {
            mode: ApiMode::Unprivate,
            api_keys: vec![String::new()],
            ..ApiConfig::default()
        };
        assert!(empty_key_only.validate().is_err());
    }

    #[test]
    fn api_validate_accepts_unauthenticated_modes_without_keys() {
        assert!(ApiConfig::default().validate().is_ok());

        let public = ApiConfig {
            mode: ApiMode::Public,
            ..ApiConfig::default()
        };
        assert!(public.validate().is_ok());
    }

    #[test]
    fn mode_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ApiMode::Unprivate).unwrap(),
            r#""unprivate""#
        );
        let parsed: ApiMode = serde_json::from_str(r#""public""#).unwrap();
        assert_eq!(parsed, ApiMode::Public);
    }
}
