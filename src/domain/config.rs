//! Config - Application Configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::{
    CONFIG_FILE_NAME, DEFAULT_API_URL, DEFAULT_PAGE_SIZE, REQUEST_TIMEOUT_SECS,
    SENTINEL_ROOT_MARGIN_PX, SENTINEL_THRESHOLD,
};
use crate::error::{Error, Result};
use crate::helpers::get_or_create_config_dir;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Prediction service connection
    pub api: ApiConfig,
    /// Pagination settings
    pub loader: LoaderConfig,
    /// Scroll sentinel tunables
    pub sentinel: SentinelConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// Prediction service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL (e.g., "http://localhost:5001")
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Pagination configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoaderConfig {
    /// Rows requested per page
    pub page_size: u32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Scroll sentinel configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SentinelConfig {
    /// Distance before the end of the list at which the sentinel counts as visible
    pub root_margin_px: f32,
    /// Visible fraction of the marker required to intersect (0.0 - 1.0)
    pub threshold: f32,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            root_margin_px: SENTINEL_ROOT_MARGIN_PX,
            threshold: SENTINEL_THRESHOLD,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; stderr only when unset
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Parse configuration from TOML text; blank text yields defaults
    pub fn from_toml(value: &str) -> Result<Self> {
        if value.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: AppConfig = toml::from_str(value)?;
        config.validated()
    }

    /// Load from an explicit path, or from the platform config directory
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_config_path()?,
        };
        if !path.exists() {
            info!(path = ?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        info!(path = ?path, "Loading config file");
        let value = std::fs::read_to_string(&path)?;
        Self::from_toml(&value)
    }

    /// Save to an explicit path, or to the platform config directory
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_config_path()?,
        };
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    fn validated(mut self) -> Result<Self> {
        if self.loader.page_size == 0 {
            return Err(Error::Invalid {
                message: "loader.page_size must be at least 1".to_string(),
            });
        }
        if self.api.base_url.trim().is_empty() {
            return Err(Error::Invalid {
                message: "api.base_url must not be empty".to_string(),
            });
        }
        self.sentinel.threshold = self.sentinel.threshold.clamp(0.0, 1.0);
        self.sentinel.root_margin_px = self.sentinel.root_margin_px.max(0.0);
        Ok(self)
    }
}

fn default_config_path() -> Result<PathBuf> {
    Ok(get_or_create_config_dir()?.join(CONFIG_FILE_NAME))
}
