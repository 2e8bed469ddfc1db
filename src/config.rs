use crate::domain::StatusScheme;
use crate::ticker::{DEFAULT_AUTOSAVE_SECS, DEFAULT_TICK_MS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Name of the optional configuration file inside the data directory
pub const CONFIG_FILE: &str = "config.json";

/// Tracker settings stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// File name of the canonical state file
    pub state_file: String,
    pub tick_millis: u64,
    pub autosave_secs: u64,
    pub status_scheme: StatusScheme,
    /// Hide done tickets and todos in listings
    pub hide_done: bool,
    /// Keep one backup copy of the state per calendar day
    pub backups: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_file: "time-tracker.json".to_string(),
            tick_millis: DEFAULT_TICK_MS,
            autosave_secs: DEFAULT_AUTOSAVE_SECS,
            status_scheme: StatusScheme::Classic,
            hide_done: true,
            backups: true,
        }
    }
}

impl Config {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_millis.max(1))
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_secs.max(1))
    }
}

/// Load config from the data directory, falling back to defaults when absent
pub fn load_config<P: AsRef<Path>>(dir: P) -> Result<Config> {
    let path = dir.as_ref().join(CONFIG_FILE);

    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let config: Config = serde_json::from_str(&content)
        .with_context(|| format!("Invalid config: {}", path.display()))?;
    Ok(config)
}

/// Save config into the data directory
pub fn save_config<P: AsRef<Path>>(dir: P, config: &Config) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    crate::persistence::atomic_write(dir.as_ref().join(CONFIG_FILE), &json)?;
    Ok(())
}
