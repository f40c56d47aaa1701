use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::{mlog_debug, Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub default_strategy: Option<String>,
    pub default_workers: Option<usize>,
    pub default_increments: Option<u64>,
}

impl Config {
    pub fn mill_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".mill"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::mill_dir()?.join("mill.toml"))
    }

    pub fn effective_strategy(&self) -> &str {
        self.default_strategy.as_deref().unwrap_or("threads")
    }

    pub fn effective_workers(&self) -> usize {
        self.default_workers
            .unwrap_or(crate::strategy::DEFAULT_WORKERS)
    }

    pub fn effective_increments(&self) -> u64 {
        self.default_increments.unwrap_or(1000)
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        mlog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            mlog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(&path)?)?;
        mlog_debug!(
            "Config loaded: strategy={:?}, workers={:?}, increments={:?}",
            config.default_strategy,
            config.default_workers,
            config.default_increments
        );
        Ok(config)
    }
}
