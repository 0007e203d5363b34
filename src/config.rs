//! Configuration loading from TOML files and environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub surface: SurfaceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Activity tracker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Inactivity timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Report "user-active" transitions.
    #[serde(default = "default_true")]
    pub notify_active: bool,
    /// Report "user-inactive" transitions.
    #[serde(default = "default_true")]
    pub notify_inactive: bool,
    /// Publish the state to the shared marker.
    #[serde(default = "default_true")]
    pub update_marker: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            notify_active: true,
            notify_inactive: true,
            update_marker: true,
        }
    }
}

impl TrackerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Where the active/inactive marker is published.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurfaceConfig {
    /// File receiving the marker class name. Kept in memory when unset.
    #[serde(default)]
    pub marker_path: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

// Default value functions
fn default_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file")?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = config_path {
            Self::from_file(path)?
        } else {
            // Try default config locations
            let default_paths = [
                PathBuf::from("config/default.toml"),
                dirs::config_dir()
                    .map(|d| d.join("useractivity/config.toml"))
                    .unwrap_or_default(),
            ];

            let mut loaded = None;
            for path in &default_paths {
                if path.is_file() {
                    loaded = Some(Self::from_file(path)?);
                    break;
                }
            }
            loaded.unwrap_or_default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());

        if let Some(path) = config.surface.marker_path.take() {
            config.surface.marker_path = Some(expand_tilde(&path));
        }

        Ok(config)
    }

    /// Apply `USERACTIVITY_*` overrides looked up through `var`.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("USERACTIVITY_TIMEOUT_MS") {
            if let Ok(v) = val.parse() {
                self.tracker.timeout_ms = v;
            }
        }
        if let Some(val) = var("USERACTIVITY_UPDATE_MARKER") {
            if let Ok(v) = val.parse() {
                self.tracker.update_marker = v;
            }
        }
        if let Some(val) = var("USERACTIVITY_MARKER_PATH") {
            self.surface.marker_path = Some(PathBuf::from(val));
        }
        if let Some(val) = var("USERACTIVITY_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = var("USERACTIVITY_LOG_FORMAT") {
            match val.to_ascii_lowercase().as_str() {
                "json" => self.logging.format = LogFormat::Json,
                "pretty" => self.logging.format = LogFormat::Pretty,
                _ => {}
            }
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.tracker.timeout_ms == 0 {
            anyhow::bail!("Inactivity timeout must be greater than 0");
        }
        if let Some(path) = &self.surface.marker_path {
            if path.as_os_str().is_empty() {
                anyhow::bail!("Marker path cannot be empty");
            }
        }
        Ok(())
    }
}

/// Expand ~ to home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
