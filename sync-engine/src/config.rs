//! Configuration for the sync engine.
//!
//! Configuration is loaded from a TOML file; every field has a default so a
//! partial (or empty) file is valid.

use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration for the sync engine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Quota budget configuration.
    #[serde(default)]
    pub quota: QuotaConfig,
    /// Response cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Retry policy configuration.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Token refresh configuration.
    #[serde(default)]
    pub token: TokenConfig,
    /// Remote gateway configuration.
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Scheduler configuration.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Quota budget configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaConfig {
    /// Daily call budget in quota units (default: 10000, the platform's
    /// standard daily allowance).
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u64,
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// TTL for playlist metadata responses in seconds (default: 3600).
    #[serde(default = "default_meta_ttl")]
    pub playlist_meta_ttl_secs: u64,
    /// TTL for playlist item pages in seconds (default: 1800).
    #[serde(default = "default_items_ttl")]
    pub items_page_ttl_secs: u64,
    /// TTL for video metadata batches in seconds (default: 3600).
    #[serde(default = "default_batch_ttl")]
    pub video_batch_ttl_secs: u64,
    /// Interval for the background expiry sweep in seconds (default: 600).
    #[serde(default = "default_purge_interval")]
    pub purge_interval_secs: u64,
}

/// Retry policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts per remote call, first try included (default: 5).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

/// Token refresh configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    /// Safety buffer before expiry at which a token is already considered
    /// stale, in seconds (default: 300).
    #[serde(default = "default_refresh_buffer")]
    pub refresh_buffer_secs: u64,
}

/// Remote gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Maximum ids per video metadata batch (default: 50, the platform's
    /// hard maximum).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Quota units charged per remote call (default: 1).
    #[serde(default = "default_call_cost")]
    pub call_cost: u64,
}

/// Scheduler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Tick cadence in seconds (default: 30).
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// Enable the scheduler task (default: true).
    #[serde(default = "default_scheduler_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_daily_limit() -> u64 {
    10_000
}

fn default_meta_ttl() -> u64 {
    3600
}

fn default_items_ttl() -> u64 {
    1800
}

fn default_batch_ttl() -> u64 {
    3600
}

fn default_purge_interval() -> u64 {
    600
}

fn default_max_attempts() -> u32 {
    5
}

fn default_refresh_buffer() -> u64 {
    300
}

fn default_batch_size() -> usize {
    50
}

fn default_call_cost() -> u64 {
    1
}

fn default_tick_secs() -> u64 {
    30
}

fn default_scheduler_enabled() -> bool {
    true
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            playlist_meta_ttl_secs: default_meta_ttl(),
            items_page_ttl_secs: default_items_ttl(),
            video_batch_ttl_secs: default_batch_ttl(),
            purge_interval_secs: default_purge_interval(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            refresh_buffer_secs: default_refresh_buffer(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            call_cost: default_call_cost(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            enabled: default_scheduler_enabled(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
