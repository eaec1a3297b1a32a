//! The tool client itself — one HTTP POST per call, strictly categorized
//! failures, no retries.

use std::time::{Duration, Instant};

use serde_json::Value;

use pl_domain::config::ToolsConfig;
use pl_domain::tool::{ToolCallRequest, ToolCallResponse, ToolError};
use pl_domain::trace::TraceEvent;

use crate::routing::{route, ToolEndpoint};

/// Errors surfaced by the tool boundary, by category.
#[derive(Debug, thiserror::Error)]
pub enum ToolClientError {
    /// Connection failures and timeouts.
    #[error("tool transport error: {0}")]
    Transport(String),

    /// The upstream answered, but not with a well-formed envelope.
    #[error("tool protocol error: {0}")]
    Protocol(String),

    /// The tool itself returned `{code, message}`.
    #[error("tool error {0}")]
    Remote(ToolError),

    /// The tool name is not in the routing table.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

impl From<ToolClientError> for pl_domain::error::Error {
    fn from(e: ToolClientError) -> Self {
        match e {
            ToolClientError::Transport(m) => pl_domain::error::Error::Boundary(m),
            other => pl_domain::error::Error::Boundary(other.to_string()),
        }
    }
}

/// In-process client for the two tool servers.
///
/// Construction is fail-closed: both endpoints must be configured.
#[derive(Debug, Clone)]
pub struct ToolClient {
    http: reqwest::Client,
    data_url: String,
    prompt_url: String,
    timeout: Duration,
}

impl ToolClient {
    /// Build a client from config.
    ///
    /// Refuses to initialize when either endpoint is missing — callers
    /// must not fall back to in-process data access.
    pub fn new(cfg: &ToolsConfig) -> pl_domain::error::Result<Self> {
        if cfg.data_tool_endpoint.is_empty() {
            return Err(pl_domain::error::Error::Config(
                "data_tool_endpoint is not configured; refusing to start (fail-closed)".into(),
            ));
        }
        if cfg.prompt_tool_endpoint.is_empty() {
            return Err(pl_domain::error::Error::Config(
                "prompt_tool_endpoint is not configured; refusing to start (fail-closed)".into(),
            ));
        }

        let timeout = Duration::from_secs(cfg.tool_call_timeout_seconds);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| pl_domain::error::Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            data_url: cfg.data_tool_endpoint.trim_end_matches('/').to_owned(),
            prompt_url: cfg.prompt_tool_endpoint.trim_end_matches('/').to_owned(),
            timeout,
        })
    }

    /// The configured per-call timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Dispatch one tool call. Exactly one request is issued; failures
    /// are never retried here.
    pub async fn call(&self, tool: &str, arguments: Value) -> Result<Value, ToolClientError> {
        let endpoint = route(tool).ok_or_else(|| ToolClientError::UnknownTool(tool.to_owned()))?;
        let base = match endpoint {
            ToolEndpoint::Data => &self.data_url,
            ToolEndpoint::Prompt => &self.prompt_url,
        };
        let url = format!("{base}/mcp/tools/call");

        let body = ToolCallRequest {
            tool: tool.to_owned(),
            arguments,
        };

        let start = Instant::now();
        let result = self.http.post(&url).json(&body).send().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                TraceEvent::ToolCall {
                    tool: tool.to_owned(),
                    endpoint: url,
                    status: 0,
                    duration_ms,
                }
                .emit();
                return Err(ToolClientError::Transport(e.to_string()));
            }
        };

        let status = resp.status().as_u16();
        TraceEvent::ToolCall {
            tool: tool.to_owned(),
            endpoint: url,
            status,
            duration_ms,
        }
        .emit();

        let raw = resp
            .text()
            .await
            .map_err(|e| ToolClientError::Transport(e.to_string()))?;

        let envelope: ToolCallResponse = serde_json::from_str(&raw)
            .map_err(|e| ToolClientError::Protocol(format!("malformed tool response: {e}")))?;

        envelope.into_result().map_err(ToolClientError::Remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pl_domain::tool::ToolErrorCode;

    fn config(data: &str, prompt: &str) -> ToolsConfig {
        ToolsConfig {
            data_tool_endpoint: data.into(),
            prompt_tool_endpoint: prompt.into(),
            tool_call_timeout_seconds: 2,
        }
    }

    #[test]
    fn refuses_to_build_without_data_endpoint() {
        let err = ToolClient::new(&config("", "http://localhost:1")).unwrap_err();
        assert!(err.to_string().contains("fail-closed"));
    }

    #[test]
    fn refuses_to_build_without_prompt_endpoint() {
        assert!(ToolClient::new(&config("http://localhost:1", "")).is_err());
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected_before_any_request() {
        let client = ToolClient::new(&config("http://127.0.0.1:1", "http://127.0.0.1:1")).unwrap();
        let err = client
            .call("not_a_tool", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolClientError::UnknownTool(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        // Nothing listens on this port.
        let client = ToolClient::new(&config("http://127.0.0.1:9", "http://127.0.0.1:9")).unwrap();
        let err = client
            .call("load_context", serde_json::json!({"conversation_id": "c", "limit": 5}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolClientError::Transport(_)));
    }

    #[tokio::test]
    async fn remote_error_envelope_is_surfaced_as_remote() {
        use axum::routing::post;

        let app = axum::Router::new().route(
            "/mcp/tools/call",
            post(|| async {
                axum::Json(ToolCallResponse::err(
                    ToolErrorCode::AthleteNotFound,
                    "no such athlete",
                ))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base = format!("http://{addr}");
        let client = ToolClient::new(&config(&base, &base)).unwrap();
        let err = client
            .call("get_athlete", serde_json::json!({"user_id": "u1"}))
            .await
            .unwrap_err();
        match err {
            ToolClientError::Remote(tool_err) => {
                assert_eq!(tool_err.code, ToolErrorCode::AthleteNotFound);
            }
            other => panic!("expected Remote, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_a_protocol_error() {
        use axum::routing::post;

        let app = axum::Router::new()
            .route("/mcp/tools/call", post(|| async { "not json at all" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base = format!("http://{addr}");
        let client = ToolClient::new(&config(&base, &base)).unwrap();
        let err = client
            .call("load_progress", serde_json::json!({"conversation_id": "c"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolClientError::Protocol(_)));
    }
}
