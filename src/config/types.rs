use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite file. Relative paths resolve against the config file's directory.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("tvshelf.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// Root directories walked by every scan.
    #[serde(default)]
    pub media_paths: Vec<PathBuf>,

    /// Extension allow-list; empty means the built-in list.
    #[serde(default)]
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScannerConfig {
    /// Files persisted per transaction.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Files handled between two cooperative yields.
    #[serde(default = "default_yield_interval")]
    pub yield_interval: usize,

    /// Concurrent ffprobe processes.
    #[serde(default = "default_probe_concurrency")]
    pub probe_concurrency: usize,

    /// Seconds one probe may run before its file is saved without details.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Skip metadata extraction (and the ffprobe availability check).
    #[serde(default)]
    pub skip_metadata: bool,

    #[serde(default)]
    pub matching: MatchPolicy,
}

fn default_batch_size() -> usize {
    100
}
fn default_yield_interval() -> usize {
    50
}
fn default_probe_concurrency() -> usize {
    4
}
fn default_probe_timeout_secs() -> u64 {
    60
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            yield_interval: default_yield_interval(),
            probe_concurrency: default_probe_concurrency(),
            probe_timeout_secs: default_probe_timeout_secs(),
            skip_metadata: false,
            matching: MatchPolicy::default(),
        }
    }
}

/// Tunable show-matching policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct MatchPolicy {
    /// Try the stored raw folder name before comparing titles.
    #[serde(default = "default_use_folder_name")]
    pub use_folder_name: bool,

    /// Allowed distance between a parsed year and a stored year when
    /// breaking ties between shows with the same title key.
    #[serde(default)]
    pub year_tolerance: u32,
}

fn default_use_folder_name() -> bool {
    true
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            use_folder_name: default_use_folder_name(),
            year_tolerance: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}
