//! Logging setup for the host process.
//!
//! Output goes through `tracing-subscriber`. The level comes from `RUST_LOG`
//! when set and from `[logging].level` otherwise. Event layer records carry
//! the `hook_events` target, so `RUST_LOG=hook_events=debug` narrows the
//! output to the patch lifecycle and dispatch failures.

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output encoding for log records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Coloured single-line records for terminals
    Pretty,
    /// One JSON object per record, fields flattened to the top level
    Json,
}

impl LogOutput {
    /// Picks the encoding. The `--json-logs` flag wins over the config file.
    pub fn select(settings: &LoggingSettings, force_json: bool) -> Self {
        if force_json || settings.json_format {
            LogOutput::Json
        } else {
            LogOutput::Pretty
        }
    }
}

/// Where the active filter came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSource {
    Environment,
    Config(String),
}

/// Builds the level filter, preferring `RUST_LOG` over the configured level.
///
/// # Arguments
///
/// * `level` - Fallback directive from `[logging].level`
///
/// # Returns
///
/// The filter and where it came from, so startup can say which one applies.
pub fn build_filter(level: &str) -> (EnvFilter, FilterSource) {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, FilterSource::Environment),
        Err(_) => (EnvFilter::new(level), FilterSource::Config(level.to_string())),
    }
}

/// Installs the global subscriber.
///
/// # Arguments
///
/// * `settings` - The `[logging]` table of the config file
/// * `json_format` - CLI override forcing JSON output
///
/// # Returns
///
/// `Ok(())` once the subscriber is installed, or an error when another
/// global subscriber was installed first.
pub fn setup_logging(
    settings: &LoggingSettings,
    json_format: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (filter, source) = build_filter(&settings.level);
    let output = LogOutput::select(settings, json_format);
    let registry = tracing_subscriber::registry().with(filter);

    match output {
        LogOutput::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_thread_names(true),
            )
            .try_init()?,
        LogOutput::Pretty => registry
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()?,
    }

    match source {
        FilterSource::Environment => info!("🔧 Logging initialized from RUST_LOG ({:?} output)", output),
        FilterSource::Config(level) => info!("🔧 Logging initialized with level: {} ({:?} output)", level, output),
    }
    Ok(())
}

/// Prints the startup banner with the crate version.
pub fn display_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("🪝 ───────────────────────────────────────────");
    info!("🪝  HOOK HOST v{}", version);
    info!("🪝  Simulated plugin host for hook_events");
    info!("🪝  typed channels · auto-subscription · reload-safe patches");
    info!("🪝 ───────────────────────────────────────────");
}
