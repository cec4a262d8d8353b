//! fetch-time-mcp: MCP tool server for time, calendars and astronomy
//!
//! Serves the built-in tools over HTTP/WebSocket, or over stdio with `--stdio`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use fetch_time_mcp::config::{self, Config};
use fetch_time_mcp::mcp::{http, Dispatcher, ServerCapabilities, StdioServer, ToolRegistry};
use fetch_time_mcp::services::{Clock, SystemClock};
use fetch_time_mcp::tools;

/// MCP tool server for current time, timezone conversion, religious
/// calendars and astronomical information.
#[derive(Parser, Debug)]
#[command(name = "fetch-time-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,

    /// Serve JSON-RPC over stdin/stdout instead of HTTP
    #[arg(long)]
    stdio: bool,

    /// Override the configured listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the configured listen port
    #[arg(long)]
    port: Option<u16>,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber. Logs go to stderr so stdout stays protocol-only.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load(args: &Args) -> Result<Config, fetch_time_mcp::error::ConfigError> {
    let mut cfg = config::load_config(args.config.as_deref())?;
    if let Some(host) = &args.host {
        cfg.server.host.clone_from(host);
    }
    if let Some(port) = args.port {
        cfg.server.port = port;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn build_dispatcher(cfg: &Config) -> Result<Arc<Dispatcher>, fetch_time_mcp::error::RegistryError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let registry = Arc::new(ToolRegistry::new());
    tools::register_default_tools(&registry, &clock)?;

    let capabilities =
        ServerCapabilities::new(cfg.server.enable_websocket, cfg.server.enable_caching);
    Ok(Arc::new(Dispatcher::new(registry, capabilities).with_clock(clock)))
}

/// Entry point for the fetch-time-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    let cfg = match load(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if args.config.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nConfig is read from: {}", default_path.display());
                    eprintln!("Create one based on config/example-config.json");
                }
            }
            return ExitCode::FAILURE;
        }
    };

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    // Display GPL license notice (required by GPLv3 Section 5d)
    eprintln!(
        "fetch-time-mcp {}  Copyright (C) 2026  The Embedded Society",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("This program comes with ABSOLUTELY NO WARRANTY.");
    eprintln!("This is free software, licensed under GPL-3.0-or-later.");
    eprintln!("Source: {}", env!("CARGO_PKG_REPOSITORY"));
    eprintln!();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        stdio = args.stdio,
        "Starting fetch-time-mcp server"
    );

    let dispatcher = match build_dispatcher(&cfg) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            error!(error = %e, "Failed to register tools");
            return ExitCode::FAILURE;
        }
    };

    // stdio handles one client on one thread; HTTP gets the worker pool
    let runtime = if args.stdio {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
    } else {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
    };
    let runtime = match runtime {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = if args.stdio {
        let server = StdioServer::new(dispatcher);
        runtime.block_on(server.run())
    } else {
        runtime.block_on(http::serve(dispatcher, &cfg.server))
    };

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn log_level_precedence() {
        assert_eq!(get_log_level(0, true, "trace"), Level::ERROR);
        assert_eq!(get_log_level(2, false, "error"), Level::DEBUG);
        assert_eq!(get_log_level(0, false, "INFO"), Level::INFO);
        assert_eq!(get_log_level(0, false, "loud"), Level::WARN);
    }

    #[test]
    fn cli_overrides_listen_address() {
        let args = Args::parse_from(["fetch-time-mcp", "--host", "0.0.0.0", "--port", "8081"]);
        assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(args.port, Some(8081));
        assert!(!args.stdio);
    }
}
