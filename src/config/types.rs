// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub game: GameConfig,
    pub browser: BrowserConfig,
}

/// Listener configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Tokio worker threads, defaults to the number of CPU cores
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Verbose mode: access log plus patch/fallback diagnostics
    pub debug: bool,
    /// Access log format (combined, common, json, or custom pattern)
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

/// Per-connection settings
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Upper bound on a connection's lifetime, in seconds
    pub connection_timeout: u64,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    /// Largest accepted save payload
    pub max_body_size: u64,
}

/// Game folder layout
#[derive(Debug, Deserialize, Clone)]
pub struct GameConfig {
    /// Script that may be replaced by a patch
    pub target_file: String,
    /// Save blob file name, relative to the game root
    pub save_file: String,
    /// Patch directory; defaults to `patches/` next to the executable
    #[serde(default)]
    pub patches_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserConfig {
    /// Open the game in the default browser once listening
    pub open: bool,
}

/// Filesystem locations fixed at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamePaths {
    pub root: PathBuf,
    pub save_file: PathBuf,
    pub patches_dir: PathBuf,
}
