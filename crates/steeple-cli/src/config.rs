//! Worker configuration for the command-line host.
//!
//! The config is stored at `~/.config/steeple/config.json` unless `--config`
//! points elsewhere. A missing file means defaults. `STEEPLE_VERSION` and
//! `STEEPLE_ORIGIN` (also read from `.env`) override the file, which is how a
//! deploy bumps the cache version without editing it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use steeple_core::OfflineConfig;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "steeple";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const VERSION_ENV: &str = "STEEPLE_VERSION";
const ORIGIN_ENV: &str = "STEEPLE_ORIGIN";

#[derive(Debug, Clone)]
pub struct Config {
    pub offline: OfflineConfig,
    path: PathBuf,
}

impl Config {
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };

        let mut offline = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            OfflineConfig::default()
        };

        if let Ok(version) = std::env::var(VERSION_ENV) {
            offline.version = version;
        }
        if let Ok(origin) = std::env::var(ORIGIN_ENV) {
            offline.origin = origin;
        }

        offline
            .validate()
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        Ok(Self { offline, path })
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.offline)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write config file: {}", self.path.display()))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Root of the on-disk cache namespaces.
    pub fn cache_dir(&self, override_dir: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(dir) = override_dir {
            return Ok(dir);
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
