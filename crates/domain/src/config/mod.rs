mod planning;
mod server;
mod stores;
mod tools;

pub use planning::*;
pub use server::*;
pub use stores::*;
pub use tools::*;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub planning: PlanningConfig,
    #[serde(default)]
    pub stores: StoresConfig,
}

impl Config {
    /// Parse a TOML config document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load a config file, then apply environment overrides for the two
    /// tool endpoints (`PACELINE_DATA_TOOL_ENDPOINT`,
    /// `PACELINE_PROMPT_TOOL_ENDPOINT`).
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&raw)?;

        if let Ok(url) = std::env::var("PACELINE_DATA_TOOL_ENDPOINT") {
            config.tools.data_tool_endpoint = url;
        }
        if let Ok(url) = std::env::var("PACELINE_PROMPT_TOOL_ENDPOINT") {
            config.tools.prompt_tool_endpoint = url;
        }

        Ok(config)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Unconfigured tool endpoints are Error severity: the controller is
    /// fail-closed and must not boot without both (P8).
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.tools.data_tool_endpoint.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "tools.data_tool_endpoint".into(),
                message: "data tool endpoint is required (fail-closed boundary)".into(),
            });
        }
        if self.tools.prompt_tool_endpoint.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "tools.prompt_tool_endpoint".into(),
                message: "prompt tool endpoint is required (fail-closed boundary)".into(),
            });
        }
        if self.tools.tool_call_timeout_seconds == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "tools.tool_call_timeout_seconds".into(),
                message: "timeout must be greater than 0".into(),
            });
        }
        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }
        if self.planning.turn_deadline_seconds < self.tools.tool_call_timeout_seconds {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "planning.turn_deadline_seconds".into(),
                message: "turn deadline is shorter than a single tool call timeout".into(),
            });
        }

        errors
    }
}
