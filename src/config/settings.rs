//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// HTTP/WebSocket server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let server = &self.server;
        let problem = if server.port == 0 {
            Some("server.port must be non-zero")
        } else if server.host.trim().is_empty() {
            Some("server.host cannot be empty")
        } else if server.max_connections == 0 {
            Some("server.max_connections must be greater than 0")
        } else if server.idle_timeout_ms == 0 {
            Some("server.idle_timeout_ms must be greater than 0")
        } else if server.max_message_size == 0 {
            Some("server.max_message_size must be greater than 0")
        } else {
            None
        };

        match problem {
            Some(message) => Err(ConfigError::ValidationError {
                message: message.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Applies `MCP_SERVER_PORT`, `MCP_SERVER_HOST`, `CACHE_ENABLED` and `LOG_LEVEL`.
    ///
    /// `lookup` resolves a variable name to its value, normally `std::env::var`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EnvOverride`] if a value cannot be parsed.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("MCP_SERVER_PORT") {
            self.server.port = value.trim().parse().map_err(|_| ConfigError::EnvOverride {
                variable: "MCP_SERVER_PORT",
                value,
            })?;
        }
        if let Some(value) = lookup("MCP_SERVER_HOST") {
            self.server.host = value;
        }
        if let Some(value) = lookup("CACHE_ENABLED") {
            self.server.enable_caching = value
                .trim()
                .to_ascii_lowercase()
                .parse()
                .map_err(|_| ConfigError::EnvOverride {
                    variable: "CACHE_ENABLED",
                    value,
                })?;
        }
        if let Some(value) = lookup("LOG_LEVEL") {
            self.logging.level = value;
        }
        Ok(())
    }
}

/// HTTP/WebSocket server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Interface to listen on.
    /// Default: "localhost"
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port.
    /// Default: 3000
    #[serde(default = "default_port")]
    pub port: u16,

    /// Serve `/mcp/ws`.
    #[serde(default = "default_true")]
    pub enable_websocket: bool,

    /// Advertised in `server/info`; responses are never cached by the server itself.
    #[serde(default = "default_true")]
    pub enable_caching: bool,

    /// Requests processed at once across all HTTP connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// WebSocket sessions with no inbound frame for this long are closed.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Largest accepted request body in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

impl ServerConfig {
    /// The idle timeout as a [`Duration`].
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_websocket: default_true(),
            enable_caching: default_true(),
            max_connections: default_max_connections(),
            idle_timeout_ms: default_idle_timeout_ms(),
            max_message_size: default_max_message_size(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_true() -> bool {
    true
}

const fn default_max_connections() -> usize {
    100
}

const fn default_idle_timeout_ms() -> u64 {
    30_000
}

const fn default_max_message_size() -> usize {
    64 * 1024
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
