//! Error types for fetch-time-mcp.
//!
//! Tool failures live next to the tool contract in [`crate::mcp::tool::ToolError`];
//! this module covers configuration, registration and server lifecycle.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// An environment variable override could not be applied.
    #[error("invalid value for environment variable {variable}: {value:?}")]
    EnvOverride {
        /// Name of the variable.
        variable: &'static str,
        /// The rejected value.
        value: String,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors that can occur while registering tools.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The tool reported an empty or whitespace-only name.
    #[error("tool name cannot be blank")]
    BlankName,
}

/// Errors that end a transport's serving loop.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listening socket could not be bound.
    #[error("failed to bind {addr}")]
    Bind {
        /// Address we tried to bind.
        addr: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configured host and port do not form a socket address.
    #[error("invalid listen address: {0}")]
    Address(String),

    /// Transport IO failed.
    #[error("transport IO error")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Associates a bind failure with its address.
    #[must_use]
    pub fn bind(addr: SocketAddr, source: std::io::Error) -> Self {
        Self::Bind {
            addr: addr.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/path/to/config.json"),
        };
        let msg = error.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("config.json"));
    }

    #[test]
    fn validation_error_display() {
        let error = ConfigError::ValidationError {
            message: "port must be non-zero".to_string(),
        };
        assert!(error.to_string().contains("port must be non-zero"));
    }

    #[test]
    fn env_override_display() {
        let error = ConfigError::EnvOverride {
            variable: "MCP_SERVER_PORT",
            value: "eighty".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("MCP_SERVER_PORT"));
        assert!(msg.contains("eighty"));
    }

    #[test]
    fn bind_error_display() {
        let addr: SocketAddr = "127.0.0.1:3000".parse().unwrap();
        let error = ServerError::bind(addr, std::io::Error::other("in use"));
        assert!(error.to_string().contains("127.0.0.1:3000"));
    }
}
