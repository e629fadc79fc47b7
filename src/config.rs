use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::transfer::Timeouts;

pub const CONFIG_VERSION: u32 = 1;
/// Overrides `staging_root` when set.
pub const STAGING_ENV: &str = "BASE_DOWNLOAD_PATH";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Where downloads are staged and archives written.
    pub staging_root: PathBuf,
    /// Also keep the fetched files next to the archive.
    pub stage_downloads: bool,
    pub connect_timeout_secs: u64,
    pub io_timeout_secs: u64,
    pub version: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        let staging_root = dirs::download_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(std::env::temp_dir)
            .join(env!("CARGO_PKG_NAME"));
        Self {
            staging_root,
            stage_downloads: true,
            connect_timeout_secs: 30,
            io_timeout_secs: 60,
            version: Some(CONFIG_VERSION),
        }
    }
}

/// `~/.filebridge`, holding `config.json` and `logs/`.
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("cannot find user's home dir")?;
    Ok(home.join(".".to_owned() + env!("CARGO_PKG_NAME")))
}

impl Config {
    /// Load `~/.filebridge/config.json`, writing defaults on first run, then
    /// apply environment overrides.
    pub fn init() -> Result<Self> {
        let path = config_dir()?.join("config.json");
        let mut config = if path.exists() {
            Self::read_from(&path)?
        } else {
            let config = Config::default();
            config.save_to(&path)?;
            config
        };
        config.apply_env(|k| std::env::var(k).ok());
        Ok(config)
    }

    /// Load an explicit config file (no defaults written), then apply env overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::read_from(path)?;
        config.apply_env(|k| std::env::var(k).ok());
        Ok(config)
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        serde_json::from_str(&s).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("cannot write {}", path.display()))
    }

    /// Apply overrides from `lookup` (the process environment in production).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(STAGING_ENV).filter(|v| !v.trim().is_empty()) {
            self.staging_root = PathBuf::from(root);
        }
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            connect: Duration::from_secs(self.connect_timeout_secs.max(1)),
            io: Duration::from_secs(self.io_timeout_secs.max(1)),
        }
    }
}
