//! Configuration of the event hook layer.
//!
//! Loaded once before patches are installed. The host embeds it as the
//! `[events]` table of its own config file; it can also be read on its own.

use crate::error::ConfigError;
use crate::patch::{ExclusionList, PatchTarget};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_is_enabled() -> bool {
    true
}

fn default_command_log_path() -> PathBuf {
    PathBuf::from("RemoteAdminLog.txt")
}

/// Settings for the event hook layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Whether the layer installs anything at all
    #[serde(default = "default_is_enabled")]
    pub is_enabled: bool,
    /// Log patch lifecycle steps at info level
    #[serde(default)]
    pub debug: bool,
    /// Interception points that must not be installed
    #[serde(default)]
    pub disabled_patches: Vec<PatchTarget>,
    /// File the remote-admin command audit log is appended to
    #[serde(default = "default_command_log_path")]
    pub command_log_path: PathBuf,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            is_enabled: default_is_enabled(),
            debug: false,
            disabled_patches: Vec::new(),
            command_log_path: default_command_log_path(),
        }
    }
}

impl EventsConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EventsConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a standalone events config file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks the values for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for patch in &self.disabled_patches {
            if patch.target.trim().is_empty() || patch.member.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "disabled patch entry '{}' needs both a target and a member",
                    patch
                )));
            }
        }

        if self.command_log_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("command_log_path cannot be empty".to_string()));
        }

        Ok(())
    }

    /// The exclusion list consulted when installing patches
    pub fn exclusion_list(&self) -> ExclusionList {
        self.disabled_patches.iter().cloned().collect()
    }
}
