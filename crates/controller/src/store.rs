//! Conversation-store client — every read and write goes through the
//! tool boundary.
//!
//! Read failures degrade: empty history, default progress, anonymous
//! athlete, no activities. Write failures propagate and fail the turn.
//! There is no in-process database access on any path.

use serde_json::json;

use pl_domain::athlete::AthleteProfile;
use pl_domain::conversation::{ConversationContext, Progress, ProgressEnvelope};
use pl_domain::error::{Error, Result};
use pl_domain::plan::ActivitySummary;
use pl_domain::trace::TraceEvent;
use pl_toolclient::{routing::data, routing::prompt, ToolClient};

/// Default prompt used when the prompt server read degrades.
const FALLBACK_PROMPT: &str =
    "Collect the required slots one question at a time, then execute the planning tool.";

pub struct ConversationStore {
    tools: std::sync::Arc<ToolClient>,
}

impl ConversationStore {
    pub fn new(tools: std::sync::Arc<ToolClient>) -> Self {
        Self { tools }
    }

    // ── degraded reads ───────────────────────────────────────────────

    /// Load recent history; failure degrades to empty, never to direct
    /// DB access.
    pub async fn load_context(&self, conversation_id: &str, limit: u64) -> ConversationContext {
        let result = self
            .tools
            .call(
                data::LOAD_CONTEXT,
                json!({ "conversation_id": conversation_id, "limit": limit }),
            )
            .await;

        match result.map(serde_json::from_value::<ConversationContext>) {
            Ok(Ok(context)) => context,
            Ok(Err(e)) => {
                self.degrade(conversation_id, &format!("context decode: {e}"));
                ConversationContext::default()
            }
            Err(e) => {
                self.degrade(conversation_id, &e.to_string());
                ConversationContext::default()
            }
        }
    }

    /// Load slot progress; failure degrades to default progress at
    /// version 0.
    pub async fn load_progress(&self, conversation_id: &str) -> ProgressEnvelope {
        let result = self
            .tools
            .call(data::LOAD_PROGRESS, json!({ "conversation_id": conversation_id }))
            .await;

        match result.map(serde_json::from_value::<ProgressEnvelope>) {
            Ok(Ok(envelope)) => envelope,
            Ok(Err(e)) => {
                self.degrade(conversation_id, &format!("progress decode: {e}"));
                ProgressEnvelope {
                    progress: Progress::default(),
                    version: 0,
                }
            }
            Err(e) => {
                self.degrade(conversation_id, &e.to_string());
                ProgressEnvelope {
                    progress: Progress::default(),
                    version: 0,
                }
            }
        }
    }

    pub async fn get_athlete(&self, user_id: &str) -> AthleteProfile {
        let result = self
            .tools
            .call(data::GET_ATHLETE, json!({ "user_id": user_id }))
            .await;
        match result.map(serde_json::from_value::<AthleteProfile>) {
            Ok(Ok(athlete)) => athlete,
            _ => AthleteProfile::anonymous(user_id),
        }
    }

    pub async fn recent_activities(&self, user_id: &str, days: u64) -> Vec<ActivitySummary> {
        let result = self
            .tools
            .call(
                data::GET_RECENT_ACTIVITIES,
                json!({ "user_id": user_id, "days": days }),
            )
            .await;
        result
            .ok()
            .and_then(|v| serde_json::from_value::<Vec<ActivitySummary>>(v["activities"].clone()).ok())
            .unwrap_or_default()
    }

    /// Weekly-plan gating: degraded reads answer `false`, which safely
    /// rewrites toward the stricter race-build path.
    pub async fn has_race_plan(&self, user_id: &str) -> bool {
        self.tools
            .call(data::HAS_RACE_PLAN, json!({ "user_id": user_id }))
            .await
            .ok()
            .and_then(|v| v["has_race_plan"].as_bool())
            .unwrap_or(false)
    }

    /// Load a named prompt; degrades to a terse built-in instruction.
    pub async fn load_prompt(&self, filename: &str) -> String {
        let result = self
            .tools
            .call(prompt::LOAD_PROMPT, json!({ "filename": filename }))
            .await;
        result
            .ok()
            .and_then(|v| v["content"].as_str().map(str::to_owned))
            .unwrap_or_else(|| FALLBACK_PROMPT.to_owned())
    }

    pub async fn load_orchestrator_prompt(&self) -> String {
        let result = self
            .tools
            .call(prompt::LOAD_ORCHESTRATOR_PROMPT, json!({}))
            .await;
        result
            .ok()
            .and_then(|v| v["content"].as_str().map(str::to_owned))
            .unwrap_or_else(|| FALLBACK_PROMPT.to_owned())
    }

    // ── authoritative writes ─────────────────────────────────────────

    /// Save progress with the optimistic version.
    ///
    /// A stale version surfaces as [`Error::VersionConflict`] and the
    /// write is NOT replayed here: the caller must re-read and redo its
    /// merge against the fresh state, or a concurrent writer's slots
    /// would be silently overwritten.
    pub async fn save_progress(
        &self,
        conversation_id: &str,
        progress: &Progress,
        version: u64,
    ) -> Result<u64> {
        let result = self
            .tools
            .call(
                data::SAVE_PROGRESS,
                json!({
                    "conversation_id": conversation_id,
                    "progress": progress,
                    "version": version,
                }),
            )
            .await;

        match result {
            Ok(value) => {
                let new_version = value["version"].as_u64().unwrap_or(version + 1);
                TraceEvent::ProgressSaved {
                    conversation_id: conversation_id.to_owned(),
                    version: new_version,
                }
                .emit();
                Ok(new_version)
            }
            Err(pl_toolclient::ToolClientError::Remote(err)) if err.message.contains("stale") => {
                Err(Error::VersionConflict(conversation_id.to_owned()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Append the turn's message pair. Authoritative write.
    pub async fn save_context(
        &self,
        conversation_id: &str,
        user_id: &str,
        user_message: &str,
        assistant_message: &str,
    ) -> Result<()> {
        self.tools
            .call(
                data::SAVE_CONTEXT,
                json!({
                    "conversation_id": conversation_id,
                    "user_id": user_id,
                    "model_name": "paceline-controller",
                    "user_message": user_message,
                    "assistant_message": assistant_message,
                }),
            )
            .await?;
        Ok(())
    }

    /// Persist a recomputed rolling summary. The summary is a derived
    /// cache, so failure is logged, not fatal.
    pub async fn save_summary(&self, conversation_id: &str, summary: &str) {
        let result = self
            .tools
            .call(
                data::SAVE_SUMMARY,
                json!({ "conversation_id": conversation_id, "summary": summary }),
            )
            .await;
        match result {
            Ok(_) => {
                TraceEvent::SummaryRecomputed {
                    conversation_id: conversation_id.to_owned(),
                    summary_chars: summary.len(),
                }
                .emit();
            }
            Err(e) => {
                tracing::warn!(conversation_id, error = %e, "summary save failed");
            }
        }
    }

    /// Raw tool access for execution paths (plan registration, day and
    /// week modification).
    pub fn tools(&self) -> &ToolClient {
        &self.tools
    }

    fn degrade(&self, conversation_id: &str, reason: &str) {
        TraceEvent::ContextDegraded {
            conversation_id: conversation_id.to_owned(),
            reason: reason.to_owned(),
        }
        .emit();
    }
}
