//! Configuration management for the simulated host.
//!
//! One TOML file carries the host's own settings plus the `[events]` table
//! for the hook layer and the `[round_logger]` table for the bundled plugin.

use hook_events::EventsConfig;
use plugin_round_logger::RoundLoggerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

fn default_tick_interval() -> u64 {
    250
}

fn default_rounds() -> u32 {
    6
}

fn default_reload_every_rounds() -> u32 {
    2
}

fn default_server_name() -> String {
    "Hook Host {round}".to_string()
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Simulation settings
    #[serde(default)]
    pub host: HostSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Event hook layer settings
    #[serde(default)]
    pub events: EventsConfig,
    /// Settings of the bundled round logger plugin
    #[serde(default)]
    pub round_logger: RoundLoggerConfig,
}

/// Settings of the simulated host loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSettings {
    /// Delay between simulated rounds in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Rounds to simulate before shutting down (0 runs until a signal arrives)
    #[serde(default = "default_rounds")]
    pub rounds: u32,
    /// Disable and re-enable the event layer every N rounds (0 never reloads)
    #[serde(default = "default_reload_every_rounds")]
    pub reload_every_rounds: u32,
    /// Server list name; `{round}` is replaced with the current round number
    #[serde(default = "default_server_name")]
    pub server_name: String,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            rounds: default_rounds(),
            reload_every_rounds: default_reload_every_rounds(),
            server_name: default_server_name(),
        }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration there and
    /// returns it.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Validates the configuration for consistency and correctness.
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        if self.host.tick_interval_ms == 0 {
            return Err("host.tick_interval_ms must be greater than 0".to_string());
        }

        if self.host.server_name.trim().is_empty() {
            return Err("host.server_name cannot be empty".to_string());
        }

        self.events.validate().map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hook_events::PatchTarget;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.host.rounds, 6);
        assert_eq!(config.host.reload_every_rounds, 2);
        assert!(config.events.is_enabled);
        assert!(config.round_logger.block_friendly_fire);
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [host]
            rounds = 1

            [[events.disabled_patches]]
            target = "HostRoundManager"
            member = "EndRound"
            "#,
        )
        .unwrap();

        assert_eq!(config.host.rounds, 1);
        assert_eq!(config.host.tick_interval_ms, 250);
        assert_eq!(config.logging.level, "info");
        assert!(config
            .events
            .exclusion_list()
            .contains(&PatchTarget::new("HostRoundManager", "EndRound")));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.host.tick_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.events.disabled_patches.push(PatchTarget::new("", "EndRound"));
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hook_host.toml");

        let created = AppConfig::load_from_file(&path).await.unwrap();
        assert!(path.exists());

        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.host.rounds, created.host.rounds);
        assert_eq!(reloaded.events, created.events);
    }
}
