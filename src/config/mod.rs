//! Configuration management for regcache

pub mod schema;

pub use schema::Config;

use crate::error::{RegCacheError, RegCacheResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Loads and saves the TOML file backing [`Config`]
///
/// Every load is validated, so a `Config` obtained here can always be
/// turned into [`crate::cache::CacheSettings`] and scheduled.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Manager for `path`, or for the per-user default when `None`
    pub fn resolve(path: Option<PathBuf>) -> Self {
        Self::with_path(path.unwrap_or_else(Self::default_config_path))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// `~/.config/regcache/config.toml`, or `./regcache/config.toml` without a home
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("regcache")
            .join("config.toml")
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Load and validate configuration; defaults when the file is absent
    pub async fn load(&self) -> RegCacheResult<Config> {
        let path = &self.config_path;
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| RegCacheError::io(format!("reading config from {}", path.display()), e))?;

        let config: Config = toml::from_str(&content).map_err(|e| self.invalid(e.to_string()))?;
        match config.validation_error() {
            Some(reason) => Err(self.invalid(reason)),
            None => Ok(config),
        }
    }

    /// Write `config`, creating the parent directory if needed
    pub async fn save(&self, config: &Config) -> RegCacheResult<()> {
        let path = &self.config_path;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| RegCacheError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(path, content)
            .await
            .map_err(|e| RegCacheError::io(format!("writing config to {}", path.display()), e))?;

        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    fn invalid(&self, reason: String) -> RegCacheError {
        RegCacheError::ConfigInvalid {
            path: self.config_path.clone(),
            reason,
        }
    }
}
