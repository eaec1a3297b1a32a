//! Command-line interface for the `paceline` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use pl_domain::config::{Config, ConfigSeverity};

#[derive(Parser)]
#[command(name = "paceline", about = "Paceline coaching gateway")]
pub struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "paceline.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the gateway (default).
    Serve,
    /// Validate the config file and exit non-zero on errors.
    ConfigValidate,
    /// Print the effective config as TOML.
    ConfigShow,
}

/// Load the config file, falling back to defaults when it is absent
/// (endpoints then come from the environment or fail validation).
pub fn load_config(path: &std::path::Path) -> pl_domain::error::Result<Config> {
    if path.exists() {
        Config::load(path)
    } else {
        tracing::warn!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}

/// Print validation results; returns whether the config is usable.
pub fn validate(config: &Config) -> bool {
    let issues = config.validate();
    if issues.is_empty() {
        println!("config OK");
        return true;
    }
    for issue in &issues {
        println!("{issue}");
    }
    !issues
        .iter()
        .any(|i| i.severity == ConfigSeverity::Error)
}
