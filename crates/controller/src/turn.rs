//! The per-turn orchestrator.
//!
//! INIT → LOAD_PROGRESS → CLASSIFY_TARGET → EXTRACT → MERGE → DECIDE →
//! {ASK_ONE | EXECUTE_TOOL | CHAT} → PERSIST_PROGRESS → EMIT_RESPONSE.
//!
//! The whole turn runs under one deadline; on expiry nothing is
//! persisted and a failed-turn error surfaces. Progress is written once,
//! at the end, with the optimistic version loaded at the start.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::json;

use pl_completion::{complete_validated, CompletionProvider, FieldType, Schema, StructuredRequest};
use pl_domain::config::PlanningConfig;
use pl_domain::conversation::TargetAction;
use pl_domain::error::{Error, Result};
use pl_domain::slots::SlotName;
use pl_domain::trace::TraceEvent;
use pl_extractor::extractor::ExtractionInput;
use pl_extractor::AttributeExtractor;
use pl_pipeline::PlanningPipeline;

use crate::classify::{requirements_for, TargetClassifier};
use crate::execute::{clarifying_question, ExecutionRequest, Executor};
use crate::locks::ConversationLockMap;
use crate::machine::{merge_and_decide, Decision};
use crate::store::ConversationStore;
use crate::validate::{fallback_question, validate_response};

/// Messages of history loaded per turn.
const CONTEXT_LIMIT: u64 = 20;
/// Prompt file consumed by the extraction agent.
const EXTRACT_PROMPT: &str = "extract_slots.md";

/// One user turn.
#[derive(Debug, Clone)]
pub struct TurnInput {
    pub conversation_id: String,
    pub user_id: String,
    pub message: String,
    /// The conversation's "today".
    pub today: NaiveDate,
}

/// How the turn resolved — exactly one of the three outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnKind {
    /// One question was asked (the slot, when the question came from
    /// the slot machinery rather than an execution re-ask).
    AskedQuestion(Option<SlotName>),
    Executed(TargetAction),
    Chat,
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub text: String,
    pub kind: TurnKind,
    pub should_execute: bool,
    pub progress_version: u64,
}

pub struct TurnRunner {
    store: Arc<ConversationStore>,
    provider: Arc<dyn CompletionProvider>,
    executor: Executor,
    config: PlanningConfig,
    locks: ConversationLockMap,
}

impl TurnRunner {
    pub fn new(
        store: Arc<ConversationStore>,
        provider: Arc<dyn CompletionProvider>,
        pipeline: Arc<PlanningPipeline>,
        config: PlanningConfig,
    ) -> Self {
        let executor = Executor::new(store.clone(), pipeline);
        Self {
            store,
            provider,
            executor,
            config,
            locks: ConversationLockMap::new(),
        }
    }

    /// Run one turn under the turn deadline. Turns for the same
    /// conversation are strictly serialized.
    pub async fn run(&self, input: TurnInput) -> Result<TurnOutcome> {
        let _permit = self.locks.acquire(&input.conversation_id).await;

        TraceEvent::TurnStarted {
            conversation_id: input.conversation_id.clone(),
            user_id: input.user_id.clone(),
        }
        .emit();

        let deadline = Duration::from_secs(self.config.turn_deadline_seconds);
        match tokio::time::timeout(deadline, self.run_inner(&input)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "turn exceeded {}s deadline, progress not updated",
                deadline.as_secs()
            ))),
        }
    }

    async fn run_inner(&self, input: &TurnInput) -> Result<TurnOutcome> {
        // ── LOAD_PROGRESS (reads degrade, never fail) ────────────────
        let envelope = self.store.load_progress(&input.conversation_id).await;
        let context = self
            .store
            .load_context(&input.conversation_id, CONTEXT_LIMIT)
            .await;

        // ── CLASSIFY_TARGET ──────────────────────────────────────────
        let orchestrator_prompt = self.store.load_orchestrator_prompt().await;
        let classifier = TargetClassifier::new(self.provider.clone(), orchestrator_prompt);
        let mut classification = classifier
            .classify(
                &input.message,
                context.summary.as_deref(),
                envelope.progress.target_action,
            )
            .await;

        // Dependency gating: a weekly plan without a race plan becomes a
        // race build.
        if classification.target == Some(TargetAction::WeeklyPlan)
            && !self.store.has_race_plan(&input.user_id).await
        {
            TraceEvent::TargetRewritten {
                conversation_id: input.conversation_id.clone(),
                from: "weekly_plan".into(),
                to: "plan_race_build".into(),
                reason: "no existing race plan".into(),
            }
            .emit();
            classification.target = Some(TargetAction::PlanRaceBuild);
            let (_, optional) = requirements_for(TargetAction::PlanRaceBuild);
            // A rewritten weekly request asks for the race date first.
            classification.required = vec![SlotName::RaceDate, SlotName::RaceDistance];
            classification.optional = optional;
        }

        // ── EXTRACT ──────────────────────────────────────────────────
        let extract_prompt = self.store.load_prompt(EXTRACT_PROMPT).await;
        let extractor = AttributeExtractor::new(self.provider.clone(), extract_prompt);
        let mut requested = classification.required.clone();
        for slot in &classification.optional {
            if !requested.contains(slot) {
                requested.push(*slot);
            }
        }
        let extraction = extractor
            .extract(ExtractionInput {
                user_message: &input.message,
                attributes_requested: &requested,
                known_slots: &envelope.progress.filled_slots,
                conversation_summary: context.summary.as_deref(),
                today: input.today,
                prompted_slot: envelope.progress.awaiting_slots.first().copied(),
            })
            .await;

        // ── MERGE + DECIDE ───────────────────────────────────────────
        let turn = merge_and_decide(
            envelope.progress,
            classification.target,
            &classification.required,
            &classification.optional,
            &extraction,
        );

        // ── render the single permitted outcome ──────────────────────
        let (mut text, mut kind) = match &turn.decision {
            Decision::AskOne(slot) => (self.render_ask(input, *slot).await, TurnKind::AskedQuestion(Some(*slot))),
            Decision::Chat => (self.render_chat(input).await, TurnKind::Chat),
            Decision::Execute(target) => {
                let request = ExecutionRequest {
                    user_id: &input.user_id,
                    user_message: &input.message,
                    today: input.today,
                    slots: &turn.progress.filled_slots,
                    arguments: &classification.arguments,
                };
                match self.executor.execute(*target, &request).await {
                    Ok(outcome) => (outcome.text, TurnKind::Executed(*target)),
                    // Input problems become a single clarifying re-ask.
                    Err(Error::Validation(reason)) => {
                        tracing::debug!(%reason, "execution re-ask");
                        (clarifying_question(*target), TurnKind::AskedQuestion(None))
                    }
                    Err(Error::PipelineInvariant { stage, guard, .. }) => (
                        format!("Plan generation failed at {stage} ({guard}). Nothing was saved."),
                        TurnKind::Chat,
                    ),
                    // Boundary and deadline failures fail the turn.
                    Err(e) => return Err(e),
                }
            }
        };

        // ── validators ───────────────────────────────────────────────
        if let Err(violation) = validate_response(&self.config, &turn.decision, &turn.missing, &text)
        {
            TraceEvent::ValidatorRejected {
                conversation_id: input.conversation_id.clone(),
                rule: violation.rule.into(),
                detail: violation.detail.clone(),
            }
            .emit();
            let slot = turn
                .missing
                .first()
                .copied()
                .or_else(|| turn.progress.required_attributes.first().copied())
                .unwrap_or(SlotName::RaceDate);
            text = fallback_question(slot);
            kind = TurnKind::AskedQuestion(Some(slot));
        }

        // ── PERSIST_PROGRESS + message pair (authoritative writes) ───
        let progress_version = match self
            .store
            .save_progress(&input.conversation_id, &turn.progress, envelope.version)
            .await
        {
            Ok(version) => version,
            // An out-of-band writer got there first: re-read, redo the
            // merge over the fresh state so its slots survive, and save
            // once more. A second conflict fails the turn.
            Err(Error::VersionConflict(_)) => {
                let fresh = self.store.load_progress(&input.conversation_id).await;
                let remerged = merge_and_decide(
                    fresh.progress,
                    classification.target,
                    &classification.required,
                    &classification.optional,
                    &extraction,
                );
                self.store
                    .save_progress(&input.conversation_id, &remerged.progress, fresh.version)
                    .await?
            }
            Err(e) => return Err(e),
        };
        self.store
            .save_context(&input.conversation_id, &input.user_id, &input.message, &text)
            .await?;

        self.maybe_refresh_summary(input, context.messages.len()).await;

        let should_execute = matches!(kind, TurnKind::Executed(_));
        TraceEvent::TurnDecision {
            conversation_id: input.conversation_id.clone(),
            decision: match &kind {
                TurnKind::AskedQuestion(_) => "ask_one".into(),
                TurnKind::Executed(_) => "execute_tool".into(),
                TurnKind::Chat => "chat".into(),
            },
            target_action: turn.progress.target_action.map(|t| t.as_str().to_owned()),
            missing_slots: turn.missing.iter().map(|s| s.to_string()).collect(),
        }
        .emit();

        Ok(TurnOutcome {
            text,
            kind,
            should_execute,
            progress_version,
        })
    }

    /// Render the single slot question; the deterministic question is
    /// the fallback when no generated text is available.
    async fn render_ask(&self, input: &TurnInput, slot: SlotName) -> String {
        let schema = Schema::object().required("text", FieldType::String);
        let request = StructuredRequest {
            purpose: "ask_slot",
            system_prompt: format!("Ask exactly one question to obtain {slot}."),
            user_input: input.message.clone(),
            context: json!({ "slot": slot.to_string() }),
        };
        match complete_validated(self.provider.as_ref(), request, &schema).await {
            Ok(value) => value["text"]
                .as_str()
                .map(str::to_owned)
                .unwrap_or_else(|| slot.question().to_owned()),
            Err(_) => slot.question().to_owned(),
        }
    }

    async fn render_chat(&self, input: &TurnInput) -> String {
        let schema = Schema::object().required("text", FieldType::String);
        let request = StructuredRequest {
            purpose: "chat_reply",
            system_prompt: "Reply briefly and helpfully about training.".into(),
            user_input: input.message.clone(),
            context: json!({}),
        };
        match complete_validated(self.provider.as_ref(), request, &schema).await {
            Ok(value) => value["text"]
                .as_str()
                .map(str::to_owned)
                .unwrap_or_else(default_chat_reply),
            Err(_) => default_chat_reply(),
        }
    }

    /// Recompute the rolling summary once history crosses the
    /// configured threshold. Best-effort: the summary is derived state.
    async fn maybe_refresh_summary(&self, input: &TurnInput, loaded_messages: usize) {
        if loaded_messages + 2 < self.config.summary_threshold_messages {
            return;
        }
        let schema = Schema::object().required("summary", FieldType::String);
        let request = StructuredRequest {
            purpose: "summarize",
            system_prompt: self.store.load_prompt("summarize.md").await,
            user_input: input.message.clone(),
            context: json!({ "conversation_id": input.conversation_id }),
        };
        if let Ok(value) = complete_validated(self.provider.as_ref(), request, &schema).await {
            if let Some(summary) = value["summary"].as_str() {
                self.store.save_summary(&input.conversation_id, summary).await;
            }
        }
    }
}

fn default_chat_reply() -> String {
    "Happy to help with your training. Tell me about your next race when you're ready.".to_owned()
}
