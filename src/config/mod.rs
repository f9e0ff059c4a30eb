use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::tui::theme::ThemeOverrides;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// How often the dashboard re-fetches the hierarchy, in milliseconds.
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub theme: ThemeOverrides,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            refresh_interval_ms: default_refresh_interval_ms(),
            queue: QueueConfig::default(),
            theme: ThemeOverrides::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueueConfig {
    /// Task buffer depth. Sized far above any realistic burst; hitting the
    /// limit is fatal.
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,

    /// Worker threads draining the buffer. One worker gives strict FIFO
    /// ordering; raise only if mutation ordering does not matter to you.
    #[serde(default = "default_queue_workers")]
    pub workers: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            capacity: default_queue_capacity(),
            workers: default_queue_workers(),
        }
    }
}

fn default_refresh_interval_ms() -> u64 {
    1000
}

fn default_queue_capacity() -> usize {
    crate::queue::DEFAULT_CAPACITY
}

fn default_queue_workers() -> usize {
    crate::queue::DEFAULT_WORKERS
}

/// Returns the base muxman config directory: ~/.muxman/
pub fn base_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    Ok(home.join(".muxman"))
}

/// Returns the path to the log file the TUI writes to.
pub fn log_path() -> Result<PathBuf> {
    Ok(base_dir()?.join("muxman.log"))
}

/// Ensure all required directories exist
pub fn ensure_dirs() -> Result<()> {
    let base = base_dir()?;
    fs::create_dir_all(&base).context("failed to create ~/.muxman/")?;
    Ok(())
}

/// Load config from ~/.muxman/config.toml (or return defaults if it doesn't exist)
pub fn load() -> Result<Config> {
    load_from(&base_dir()?.join("config.toml"))
}

fn load_from(path: &std::path::Path) -> Result<Config> {
    if path.exists() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    } else {
        Ok(Config::default())
    }
}
