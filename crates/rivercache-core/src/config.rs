//! Application configuration management.
//!
//! Holds the API base URL, request timeout, weather coordinates, the last
//! selected river and the per-resource refresh intervals.
//!
//! Configuration is stored at `~/.config/rivercache/config.json`. Missing
//! fields take their defaults, so an old or hand-edited file still loads.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::client::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::cache::Coordinates;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "rivercache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `api_base_url`.
pub const API_URL_ENV: &str = "RIVERCACHE_API_URL";

const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";

/// Background refresh period per resource, in minutes. Zero disables polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshIntervals {
    pub stations_mins: u64,
    pub readings_mins: u64,
    pub weather_mins: u64,
    pub alerts_mins: u64,
    pub fishing_mins: u64,
}

impl Default for RefreshIntervals {
    fn default() -> Self {
        Self {
            stations_mins: 30,
            readings_mins: 15,
            weather_mins: 60,
            alerts_mins: 30,
            fishing_mins: 24 * 60,
        }
    }
}

/// Longest refresh period honoured; larger values are clamped.
const MAX_REFRESH_MINS: u64 = 365 * 24 * 60;

fn minutes(mins: u64) -> Option<Duration> {
    (mins > 0).then(|| Duration::from_secs(mins.min(MAX_REFRESH_MINS).saturating_mul(60)))
}

impl RefreshIntervals {
    pub fn stations(&self) -> Option<Duration> {
        minutes(self.stations_mins)
    }

    pub fn readings(&self) -> Option<Duration> {
        minutes(self.readings_mins)
    }

    pub fn weather(&self) -> Option<Duration> {
        minutes(self.weather_mins)
    }

    pub fn alerts(&self) -> Option<Duration> {
        minutes(self.alerts_mins)
    }

    pub fn fishing(&self) -> Option<Duration> {
        minutes(self.fishing_mins)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub coordinates: Coordinates,
    /// River filter restored at startup; `None` shows every station.
    pub selected_river: Option<String>,
    pub refresh: RefreshIntervals,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            coordinates: Coordinates::default(),
            selected_river: None,
            refresh: RefreshIntervals::default(),
        }
    }
}

impl Config {
    /// Load from the config directory, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_api_url(std::env::var(API_URL_ENV).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Replace the base URL when `url` is set and non-empty.
    pub fn apply_api_url(&mut self, url: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for snapshots and logs.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
