//! Gateway HTTP listener configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_port")]
    pub port: u16,
    /// `tracing` env-filter directive, e.g. `"info,pl_controller=debug"`.
    #[serde(default = "d_log_filter")]
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: d_host(),
            port: d_port(),
            log_filter: d_log_filter(),
        }
    }
}

fn d_host() -> String {
    "127.0.0.1".into()
}

fn d_port() -> u16 {
    8700
}

fn d_log_filter() -> String {
    "info".into()
}
