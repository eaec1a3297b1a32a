//! `POST /v1/chat` — feed one user message through the controller.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use pl_controller::{TurnInput, TurnKind};
use pl_domain::error::Error;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    /// Omitted on the first message; a new conversation is minted.
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub user_id: String,
    pub message: String,
}

pub async fn chat_turn(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> impl IntoResponse {
    let conversation_id = body
        .conversation_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let input = TurnInput {
        conversation_id: conversation_id.clone(),
        user_id: body.user_id,
        message: body.message,
        today: chrono::Utc::now().date_naive(),
    };

    match state.runner.run(input).await {
        Ok(outcome) => Json(json!({
            "conversation_id": conversation_id,
            "text": outcome.text,
            "kind": match outcome.kind {
                TurnKind::AskedQuestion(_) => "asked_question",
                TurnKind::Executed(_) => "executed_tool",
                TurnKind::Chat => "chat",
            },
            "should_execute": outcome.should_execute,
        }))
        .into_response(),
        // Failed turns surface terse, structured errors only.
        Err(Error::Timeout(_)) => (
            StatusCode::GATEWAY_TIMEOUT,
            Json(json!({ "error": "turn deadline exceeded, nothing was saved" })),
        )
            .into_response(),
        Err(Error::Boundary(_)) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": "tool boundary unavailable" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "turn failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "turn failed" })),
            )
                .into_response()
        }
    }
}
