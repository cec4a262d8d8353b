//! Configuration file loading and parsing.
//!
//! This module handles loading the configuration file from disk and parsing
//! it into validated, type-safe structures.
//!
//! # Configuration File Locations
//!
//! 1. Path given as the CLI positional argument (must exist)
//! 2. Default location, used only if present:
//!    - **Linux/macOS:** `~/.fetch-time-mcp/config.json`
//!    - **Windows:** `%USERPROFILE%\.fetch-time-mcp\config.json`
//!
//! Without either file the built-in defaults apply. Environment overrides
//! (`MCP_SERVER_PORT`, `MCP_SERVER_HOST`, `CACHE_ENABLED`, `LOG_LEVEL`) are
//! applied on top, then the result is validated.
//!
//! # Example Configuration
//!
//! See `config/example-config.json` for a complete example.

mod settings;

pub use settings::{Config, LoggingConfig, ServerConfig};

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ConfigError;

/// Returns the default configuration directory.
///
/// - **Linux/macOS:** `~/.fetch-time-mcp/`
/// - **Windows:** `%USERPROFILE%\.fetch-time-mcp\`
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".fetch-time-mcp"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads the configuration, applies environment overrides and validates it.
///
/// If `path` is `None`, uses the default location when that file exists and
/// the built-in defaults otherwise.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given file does not exist
/// - The file cannot be read
/// - The JSON is malformed or has unknown fields
/// - An environment override cannot be parsed
/// - A value fails validation
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = read_config(path)?;
    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Reads and parses the configuration file without overrides or validation.
///
/// # Errors
///
/// See [`load_config`].
pub fn read_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound {
                    path: p.to_path_buf(),
                });
            }
            p.to_path_buf()
        }
        None => match default_config_path().filter(|p| p.exists()) {
            Some(p) => p,
            None => {
                debug!("No configuration file found, using defaults");
                return Ok(Config::default());
            }
        },
    };

    let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;

    let config = serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: config_path.clone(),
        source: e,
    })?;

    debug!(path = %config_path.display(), "Loaded configuration file");
    Ok(config)
}
