//! Axum routers for the two tool servers.

use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use pl_domain::tool::{ToolCallRequest, ToolCallResponse};

use crate::db::Database;
use crate::dispatch;
use crate::prompts::PromptStore;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Data server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Build the data server router over an opened database.
pub fn data_router(db: Arc<Database>) -> Router {
    Router::new()
        .route("/mcp/tools/call", post(data_call))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(db)
}

async fn data_call(
    State(db): State<Arc<Database>>,
    Json(req): Json<ToolCallRequest>,
) -> Json<ToolCallResponse> {
    let tool = req.tool.clone();
    let result = dispatch::dispatch_data(&db, req);
    Json(into_envelope(&tool, result))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Prompt server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Build the prompt server router over a prompt directory.
pub fn prompt_router(prompts_dir: &Path) -> Router {
    let store = Arc::new(PromptStore::new(prompts_dir));
    Router::new()
        .route("/mcp/tools/call", post(prompt_call))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

async fn prompt_call(
    State(store): State<Arc<PromptStore>>,
    Json(req): Json<ToolCallRequest>,
) -> Json<ToolCallResponse> {
    let tool = req.tool.clone();
    let result = dispatch::dispatch_prompt(&store, req);
    Json(into_envelope(&tool, result))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Shared
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn into_envelope(
    tool: &str,
    result: Result<serde_json::Value, pl_domain::tool::ToolError>,
) -> ToolCallResponse {
    match result {
        Ok(value) => ToolCallResponse::ok(value),
        Err(err) => {
            tracing::warn!(tool, code = err.code.as_str(), message = %err.message, "tool call failed");
            ToolCallResponse {
                result: None,
                error: Some(err),
            }
        }
    }
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

/// Bind and serve a router until the process exits.
pub async fn serve(router: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "tool server listening");
    axum::serve(listener, router).await?;
    Ok(())
}
