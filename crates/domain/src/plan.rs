//! Planning context and macro-plan types consumed by the pipeline.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::athlete::AthleteProfile;
use crate::slots::{SlotName, SlotValue};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Phases
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Training phase of a macro-plan week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Base,
    Build,
    Peak,
    Taper,
}

impl Phase {
    /// Valid forward transitions: base→build→peak→taper, same-phase runs,
    /// and phase skips in the forward direction only.
    pub fn can_transition_to(&self, next: Phase) -> bool {
        next >= *self
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Base => "base",
            Phase::Build => "build",
            Phase::Peak => "peak",
            Phase::Taper => "taper",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Macro plan
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One week of the macro plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroWeek {
    /// Zero-based, strictly increasing.
    pub index: u32,
    pub phase: Phase,
    /// Short free-text focus line ("aerobic base", "race-specific work").
    pub focus: String,
    pub target_weekly_miles: f64,
    /// Monday of this training week.
    pub start_date: NaiveDate,
    /// Days from this week's start to race day.
    pub days_to_race: i64,
    /// Marks a deliberate down week (volume cut 20-30%).
    #[serde(default)]
    pub recovery: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Planning context
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Summary of one completed activity from the athlete's recent history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub activity_id: String,
    pub sport: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub distance_meters: Option<f64>,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
}

/// Everything a plan-generation invocation needs, assembled once and
/// immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningContext {
    pub plan_id: String,
    pub athlete: AthleteProfile,
    pub slots: BTreeMap<SlotName, SlotValue>,
    #[serde(default)]
    pub recent_activity: Vec<ActivitySummary>,
    /// The conversation's "today" — all relative date math anchors here.
    pub today: NaiveDate,
    /// Optional fatigue feedback from the caller; scales weekly volume by
    /// a factor clamped to `[0.7, 1.0]` before allocation.
    #[serde(default)]
    pub fatigue_factor: Option<f64>,
}

impl PlanningContext {
    pub fn slot(&self, name: SlotName) -> Option<&SlotValue> {
        self.slots.get(&name)
    }
}
