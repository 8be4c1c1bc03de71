//! # Host Configuration
//!
//! Manages the loading and parsing of the host's configuration file
//! (`data/config.yaml`). This configures the host process itself (console,
//! shutdown grace, admin users). The bot's own behavior comes from the
//! loaded module, and the module's location from the CLI argument or
//! `config.properties` (see `infrastructure::paths`).

use serde::Deserialize;
use std::path::Path;

/// Main host configuration structure. Every field has a default so the file
/// is optional.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct HostConfig {
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub system: SystemConfig,
}

/// Console shell settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ConsoleConfig {
    /// Prefix that routes a console line to the administrative group.
    #[serde(default = "default_admin_prefix")]
    pub admin_prefix: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            admin_prefix: default_admin_prefix(),
        }
    }
}

/// System-level settings for the host.
#[derive(Debug, Deserialize, Clone)]
pub struct SystemConfig {
    /// Directory for logs and the settings store.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Seconds to wait for in-flight work to drain on shutdown before
    /// forcing termination.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
    /// User ids granted every role by the offline gateway.
    #[serde(default)]
    pub admin: Vec<String>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            shutdown_grace_secs: default_shutdown_grace(),
            admin: Vec::new(),
        }
    }
}

fn default_admin_prefix() -> String {
    "\\".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_shutdown_grace() -> u64 {
    1
}

impl HostConfig {
    /// Load from a YAML file, falling back to defaults when the file does
    /// not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }
}
