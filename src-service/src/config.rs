//! Service configuration.
//!
//! Stored as JSON in the platform config directory:
//! - Linux: `~/.config/castkit/config.json`
//! - macOS: `~/Library/Application Support/castkit/config.json`
//! - Windows: `%APPDATA%\castkit\config\config.json`

use crate::session::SessionConfig;
use castkit_common::logging::APP_NAME;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Output-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputConfig {
    /// Directory for captures that do not name one. If None, uses the
    /// service cache directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_directory: Option<String>,
}

/// Resource limit tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LimitsConfig {
    /// How often the max-file-size trigger checks the output file.
    #[serde(default = "default_file_size_poll_ms")]
    pub file_size_poll_ms: u64,
}

fn default_file_size_poll_ms() -> u64 {
    500
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            file_size_poll_ms: default_file_size_poll_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ServiceConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Directory used when a request names no output directory.
    pub fn cache_directory(&self) -> PathBuf {
        match &self.output.cache_directory {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => default_cache_dir(),
        }
    }

    /// Settings handed to the session manager.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            cache_directory: self.cache_directory(),
            file_size_poll: Duration::from_millis(self.limits.file_size_poll_ms.max(1)),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

/// Default capture directory: `<cache dir>/captures`, or the system temp
/// directory when no home directory can be determined.
pub fn default_cache_dir() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.cache_dir().join("captures"),
        None => std::env::temp_dir().join(APP_NAME).join("captures"),
    }
}

fn get_config_path() -> Result<PathBuf, String> {
    let proj_dirs = project_dirs().ok_or("Could not determine config directory")?;
    Ok(proj_dirs.config_dir().join("config.json"))
}

/// Load configuration from disk.
/// Returns the default config if the file doesn't exist or is invalid.
pub fn load_config() -> ServiceConfig {
    let config_path = match get_config_path() {
        Ok(path) => path,
        Err(e) => {
            warn!("Failed to get config path: {}", e);
            return ServiceConfig::default();
        }
    };

    if !config_path.exists() {
        info!("No config file found, using defaults");
        return ServiceConfig::default();
    }

    match fs::read_to_string(&config_path) {
        Ok(contents) => match serde_json::from_str::<ServiceConfig>(&contents) {
            Ok(config) => {
                info!("Loaded config from {:?}", config_path);
                config
            }
            Err(e) => {
                warn!("Failed to parse config file: {}. Using defaults.", e);
                ServiceConfig::default()
            }
        },
        Err(e) => {
            warn!("Failed to read config file: {}. Using defaults.", e);
            ServiceConfig::default()
        }
    }
}

/// Save configuration to disk, creating the config directory if needed.
pub fn save_config(config: &ServiceConfig) -> Result<(), String> {
    let config_path = get_config_path()?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    fs::write(&config_path, json).map_err(|e| format!("Failed to write config file: {}", e))?;

    info!("Saved config to {:?}", config_path);
    Ok(())
}
