use serde::Serialize;

/// Structured trace events emitted across all Paceline crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    ToolCall {
        tool: String,
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    TurnStarted {
        conversation_id: String,
        user_id: String,
    },
    TurnDecision {
        conversation_id: String,
        decision: String,
        target_action: Option<String>,
        missing_slots: Vec<String>,
    },
    TargetRewritten {
        conversation_id: String,
        from: String,
        to: String,
        reason: String,
    },
    ValidatorRejected {
        conversation_id: String,
        rule: String,
        detail: String,
    },
    ContextDegraded {
        conversation_id: String,
        reason: String,
    },
    ProgressSaved {
        conversation_id: String,
        version: u64,
    },
    SummaryRecomputed {
        conversation_id: String,
        summary_chars: usize,
    },
    PhilosophySelected {
        plan_id: String,
        philosophy_id: String,
        priority: i64,
        similarity: f64,
        candidates: usize,
    },
    StageCompleted {
        plan_id: String,
        stage: String,
        duration_ms: u64,
    },
    PipelineAborted {
        plan_id: String,
        stage: String,
        guard: String,
    },
    PlanPersisted {
        plan_id: String,
        inserted: usize,
        updated: usize,
        conflicts: usize,
    },
    CompletionCall {
        purpose: String,
        duration_ms: u64,
        fallback_used: bool,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "pl_event");
    }
}
