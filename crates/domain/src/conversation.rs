//! Conversation model — messages, slot progress, and the rolling summary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::slots::{SlotName, SlotValue};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation + messages
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Lifecycle status of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Archived,
}

/// A conversation owned by one athlete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub status: ConversationStatus,
    /// Rolling plain-text summary, recomputed on demand.
    #[serde(default)]
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
    System,
}

/// One message in a conversation's linearly-ordered history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender: Sender,
    pub content: String,
    /// Optional structured payload (tool results, plan references).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Progress
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The planning tool the controller has decided on for the current intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetAction {
    PlanRaceBuild,
    PlanSeason,
    AddWorkout,
    WeeklyPlan,
    ModifyDay,
    ModifyWeek,
}

impl TargetAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetAction::PlanRaceBuild => "plan_race_build",
            TargetAction::PlanSeason => "plan_season",
            TargetAction::AddWorkout => "add_workout",
            TargetAction::WeeklyPlan => "weekly_plan",
            TargetAction::ModifyDay => "modify_day",
            TargetAction::ModifyWeek => "modify_week",
        }
    }
}

/// Per-conversation slot-filling progress, rewritten each turn.
///
/// Invariants (enforced by [`Progress::check`]):
/// - `awaiting_slots ⊆ required_attributes`
/// - `filled_slots ∩ awaiting_slots = ∅`
///
/// Maps are `BTreeMap` so the JSON form is deterministic: load → save →
/// load yields byte-equivalent progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub required_attributes: Vec<SlotName>,
    #[serde(default)]
    pub optional_attributes: Vec<SlotName>,
    #[serde(default)]
    pub filled_slots: BTreeMap<SlotName, SlotValue>,
    #[serde(default)]
    pub awaiting_slots: Vec<SlotName>,
    #[serde(default)]
    pub target_action: Option<TargetAction>,
}

impl Progress {
    /// Slots still required and not yet filled, in declaration order.
    pub fn missing_slots(&self) -> Vec<SlotName> {
        self.required_attributes
            .iter()
            .copied()
            .filter(|s| !self.filled_slots.contains_key(s))
            .collect()
    }

    /// Check structural invariants. Returns the first violation, if any.
    pub fn check(&self) -> Option<String> {
        for slot in &self.awaiting_slots {
            if !self.required_attributes.contains(slot) {
                return Some(format!("awaiting slot {slot} is not required"));
            }
            if self.filled_slots.contains_key(slot) {
                return Some(format!("slot {slot} is both filled and awaiting"));
            }
        }
        None
    }
}

/// Progress plus the optimistic-concurrency version of its stored row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEnvelope {
    pub progress: Progress,
    /// Incremented by the store on every write; writes carrying a stale
    /// version fail and the caller re-reads.
    pub version: u64,
}

/// Context loaded at the start of a turn: recent history plus summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationContext {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::RaceDistance;

    fn progress_with(required: &[SlotName]) -> Progress {
        Progress {
            required_attributes: required.to_vec(),
            ..Progress::default()
        }
    }

    #[test]
    fn missing_slots_respects_declaration_order() {
        let mut p = progress_with(&[SlotName::RaceDistance, SlotName::RaceDate]);
        p.filled_slots
            .insert(SlotName::RaceDistance, SlotValue::Distance(RaceDistance::Marathon));
        assert_eq!(p.missing_slots(), vec![SlotName::RaceDate]);
    }

    #[test]
    fn check_rejects_awaiting_not_required() {
        let mut p = progress_with(&[SlotName::RaceDate]);
        p.awaiting_slots.push(SlotName::TargetTime);
        assert!(p.check().is_some());
    }

    #[test]
    fn check_rejects_filled_and_awaiting_overlap() {
        let mut p = progress_with(&[SlotName::RaceDate]);
        p.filled_slots.insert(
            SlotName::RaceDate,
            SlotValue::Date(chrono::NaiveDate::from_ymd_opt(2026, 4, 25).unwrap()),
        );
        p.awaiting_slots.push(SlotName::RaceDate);
        assert!(p.check().is_some());
    }

    #[test]
    fn progress_json_roundtrip_is_byte_equivalent() {
        let mut p = progress_with(&[SlotName::RaceDistance, SlotName::RaceDate]);
        p.filled_slots
            .insert(SlotName::RaceDistance, SlotValue::Distance(RaceDistance::Half));
        p.target_action = Some(TargetAction::PlanRaceBuild);

        let first = serde_json::to_string(&p).unwrap();
        let back: Progress = serde_json::from_str(&first).unwrap();
        let second = serde_json::to_string(&back).unwrap();
        assert_eq!(first, second);
    }
}
