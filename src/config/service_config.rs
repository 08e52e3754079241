//! Service configuration loaded from a JSON file

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file exists but could not be parsed
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds an out-of-range value
    #[error("Validation failed for {0}: {1}")]
    ValidationFailed(String, String),
}

/// Log verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Path of the Unix socket the daemon listens on
    pub socket_path: PathBuf,

    /// Log verbosity
    pub log_level: LogLevel,

    /// Optional log file; stderr only when unset
    pub log_file: Option<PathBuf>,

    /// Path of the average power model file; built-in defaults when unset
    pub power_model_path: Option<PathBuf>,

    /// Number of recent event lines retained for `dump`
    pub dump_log_capacity: usize,

    /// Whether the device is assumed on battery at startup
    pub on_battery_at_boot: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/tmp/powerstats.sock"),
            log_level: LogLevel::Info,
            log_file: None,
            power_model_path: None,
            dump_log_capacity: 256,
            on_battery_at_boot: true,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a file, falling back to defaults when the
    /// file does not exist
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("Config file {} missing, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Validate field ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dump_log_capacity == 0 || self.dump_log_capacity > 65_536 {
            return Err(ConfigError::ValidationFailed(
                "dump_log_capacity".to_string(),
                format!("{} is outside 1..=65536", self.dump_log_capacity),
            ));
        }
        if self.socket_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "socket_path".to_string(),
                "must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Get the default configuration path
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .map(|config_dir| config_dir.join("powerstats").join("config.json"))
        .unwrap_or_else(|| PathBuf::from("config.json"))
}
