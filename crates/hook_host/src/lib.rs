//! # Hook Host
//!
//! A simulated plugin host driving the `hook_events` interception layer.
//! It loads its configuration, brings the event layer up with the bundled
//! round logger plugin, plays scripted rounds, and reloads the layer on a
//! schedule to exercise disable/enable cycles.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! hook_host
//!
//! # Specify custom configuration
//! hook_host --config staging.toml
//!
//! # Play ten rounds with debug output
//! hook_host --rounds 10 --log-level debug
//!
//! # JSON logging
//! hook_host --json-logs
//! ```
//!
//! ## Configuration
//!
//! The host loads configuration from a TOML file (default: `hook_host.toml`).
//! If the file doesn't exist, a default configuration will be created.
//!
//! ## Signal Handling
//!
//! The host shuts down gracefully on SIGINT (Ctrl+C) and SIGTERM.

use tracing::error;

mod app;
mod cli;
mod config;
mod logging;
mod signals;
mod simulation;

pub use app::Application;
pub use cli::CliArgs;

/// Entry point called from `main`.
///
/// Parses arguments, sets up logging from the config file, then runs the
/// application until it finishes or a shutdown signal arrives. Exits the
/// process with status 1 on startup or runtime failure.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Logging settings come from the file, so it is read once before logging exists
    let config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();

    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

pub use config::{AppConfig, HostSettings, LoggingSettings};
pub use simulation::{RoundOutcome, SimulatedHost};
