//! Tool-boundary configuration: the two upstream endpoints and the
//! per-call timeout.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// URL of the data tool server. Required.
    #[serde(default)]
    pub data_tool_endpoint: String,

    /// URL of the prompt tool server. Required.
    #[serde(default)]
    pub prompt_tool_endpoint: String,

    /// Bounded timeout applied to every tool call.
    #[serde(default = "d_tool_call_timeout")]
    pub tool_call_timeout_seconds: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            data_tool_endpoint: String::new(),
            prompt_tool_endpoint: String::new(),
            tool_call_timeout_seconds: d_tool_call_timeout(),
        }
    }
}

fn d_tool_call_timeout() -> u64 {
    30
}
