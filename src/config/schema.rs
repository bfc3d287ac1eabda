//! Configuration schema for regcache
//!
//! Configuration is stored at `~/.config/regcache/config.toml`

use crate::cache::{BackoffPolicy, CacheSettings, MAX_FETCH_INTERVAL};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest delta window accepted (7 days)
pub const MAX_DELTA_WINDOW_SECS: u64 = 7 * 24 * 60 * 60;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Delta fetch cadence
    pub fetch: FetchConfig,

    /// Bootstrap full-fetch retry policy
    pub bootstrap: BootstrapConfig,
}

impl Config {
    /// Runtime settings for the cache engine
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            fetch_interval: Duration::from_secs(self.fetch.interval_secs),
            delta_window: Duration::from_secs(self.fetch.delta_window_secs),
            bootstrap: BackoffPolicy {
                max_attempts: self.bootstrap.max_attempts,
                initial_backoff: Duration::from_millis(self.bootstrap.initial_backoff_ms),
                max_backoff: Duration::from_millis(self.bootstrap.max_backoff_ms),
            },
        }
    }

    /// Reason the config cannot drive a cache, if any
    pub fn validation_error(&self) -> Option<String> {
        if self.fetch.interval_secs == 0 {
            return Some("fetch.interval_secs must be greater than zero".to_string());
        }
        if self.fetch.interval_secs > MAX_FETCH_INTERVAL.as_secs() {
            return Some(format!(
                "fetch.interval_secs must be at most {}",
                MAX_FETCH_INTERVAL.as_secs()
            ));
        }
        if self.fetch.delta_window_secs == 0 {
            return Some("fetch.delta_window_secs must be greater than zero".to_string());
        }
        if self.fetch.delta_window_secs > MAX_DELTA_WINDOW_SECS {
            return Some(format!(
                "fetch.delta_window_secs must be at most {}",
                MAX_DELTA_WINDOW_SECS
            ));
        }
        if self.bootstrap.max_attempts == 0 {
            return Some("bootstrap.max_attempts must be at least 1".to_string());
        }
        if self.bootstrap.initial_backoff_ms > self.bootstrap.max_backoff_ms {
            return Some("bootstrap.initial_backoff_ms exceeds max_backoff_ms".to_string());
        }
        None
    }
}

/// General application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Delta fetch settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Seconds between delta cycles (default: 30)
    pub interval_secs: u64,

    /// How far back each delta reaches, in seconds (default: 3 minutes)
    pub delta_window_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            delta_window_secs: 180,
        }
    }
}

/// Bootstrap retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Full-fetch attempts before giving up
    pub max_attempts: u32,

    /// Delay before the second attempt, doubled each retry
    pub initial_backoff_ms: u64,

    /// Upper bound on the delay between attempts
    pub max_backoff_ms: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
        }
    }
}
