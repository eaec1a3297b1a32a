//! Controller and pipeline runtime limits, plus validator tuning.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningConfig {
    /// Total deadline for one conversation turn.
    #[serde(default = "d_turn_deadline")]
    pub turn_deadline_seconds: u64,

    /// Per-invocation deadline for the planning pipeline.
    #[serde(default = "d_plan_deadline")]
    pub plan_deadline_seconds: u64,

    /// Reserved for the external activity-sync collaborator.
    #[serde(default = "d_sync_window")]
    pub sync_recent_user_window_hours: u64,

    /// Advice/explanation markers the no-advice validator rejects when a
    /// slot question is pending.
    #[serde(default = "d_advice_markers")]
    pub advice_markers: Vec<String>,

    /// Maximum characters allowed in a slot-oriented response before the
    /// no-chatty validator rejects it as paragraph-length.
    #[serde(default = "d_max_slot_response_chars")]
    pub max_slot_response_chars: usize,

    /// Recompute the rolling summary once history exceeds this many
    /// messages.
    #[serde(default = "d_summary_threshold")]
    pub summary_threshold_messages: usize,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            turn_deadline_seconds: d_turn_deadline(),
            plan_deadline_seconds: d_plan_deadline(),
            sync_recent_user_window_hours: d_sync_window(),
            advice_markers: d_advice_markers(),
            max_slot_response_chars: d_max_slot_response_chars(),
            summary_threshold_messages: d_summary_threshold(),
        }
    }
}

fn d_turn_deadline() -> u64 {
    60
}

fn d_plan_deadline() -> u64 {
    120
}

fn d_sync_window() -> u64 {
    2
}

fn d_advice_markers() -> Vec<String> {
    ["recommend", "should", "because", "typically"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

fn d_max_slot_response_chars() -> usize {
    240
}

fn d_summary_threshold() -> usize {
    20
}
