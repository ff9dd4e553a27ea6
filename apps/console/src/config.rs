//! Console configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use backdrop_core::{Catalog, Track};
use serde::Deserialize;

/// Console configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Directory for the persisted session. Without one, state lives in memory.
    /// Override: `BACKDROP_DATA_DIR`
    pub data_dir: Option<PathBuf>,

    /// Volume used until one is persisted.
    /// Override: `BACKDROP_VOLUME`
    pub default_volume: u8,

    /// Interval of the periodic observer refresh in milliseconds.
    /// Override: `BACKDROP_REFLECT_INTERVAL_MS`
    pub reflect_interval_ms: u64,

    /// How long the simulated player API takes to load, in milliseconds.
    pub api_load_delay_ms: u64,

    /// How long a simulated player takes to report ready, in milliseconds.
    pub player_ready_delay_ms: u64,

    /// Custom track list. The built-in catalog is used when absent.
    pub tracks: Option<Vec<Track>>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            default_volume: 50,
            reflect_interval_ms: 1000,
            api_load_delay_ms: 750,
            player_ready_delay_ms: 200,
            tracks: None,
        }
    }
}

impl ConsoleConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("BACKDROP_VOLUME") {
            if let Ok(volume) = val.parse::<i64>() {
                self.default_volume = backdrop_core::clamp_volume(volume);
            }
        }

        if let Ok(val) = std::env::var("BACKDROP_REFLECT_INTERVAL_MS") {
            if let Ok(interval) = val.parse() {
                self.reflect_interval_ms = interval;
            }
        }

        // Note: BACKDROP_DATA_DIR is handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Converts to backdrop-core's Config type.
    pub fn to_core_config(&self) -> backdrop_core::Config {
        backdrop_core::Config {
            default_volume: self.default_volume,
            reflect_interval_ms: self.reflect_interval_ms,
            ..Default::default()
        }
    }

    pub fn catalog(&self) -> Catalog {
        match &self.tracks {
            Some(tracks) if !tracks.is_empty() => Catalog::new(tracks.clone()),
            _ => Catalog::builtin(),
        }
    }
}
