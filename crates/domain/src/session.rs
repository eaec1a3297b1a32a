//! Planned-session model — materialized sessions, workout steps, and
//! session↔activity links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Intent
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Session-level purpose. Immutable during modifications unless the
/// athlete explicitly requests the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Rest,
    Easy,
    Long,
    Quality,
}

impl Intent {
    /// Whether a day with this intent counts as hard for spacing rules.
    pub fn is_hard(&self) -> bool {
        matches!(self, Intent::Quality)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Rest => "rest",
            Intent::Easy => "easy",
            Intent::Long => "long",
            Intent::Quality => "quality",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Workout steps
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One ordered step of a workout (warm-up, interval, cooldown, ...).
///
/// `step_index` is canonical. Legacy payloads carrying `step_order` are
/// accepted on input via the serde alias and re-emitted as `step_index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutStep {
    #[serde(alias = "step_order")]
    pub step_index: u32,
    pub step_type: String,
    /// Structured targets (pace, distance, repeats) as free-form JSON.
    #[serde(default)]
    pub targets: serde_json::Value,
    pub instructions: String,
    #[serde(default)]
    pub purpose: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Materialized sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The single primary metric of a session: distance XOR duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimaryMetric {
    Distance(f64),
    Duration(u32),
}

/// A concrete planned session for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializedSession {
    pub starts_at: DateTime<Utc>,
    pub sport: String,
    pub session_type: String,
    pub intent: Intent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
    pub description_text: String,
    #[serde(default)]
    pub workout_steps: Vec<WorkoutStep>,
}

impl MaterializedSession {
    /// The session's primary metric, when the XOR invariant holds.
    pub fn primary_metric(&self) -> Option<PrimaryMetric> {
        match (self.distance_meters, self.duration_seconds) {
            (Some(d), None) => Some(PrimaryMetric::Distance(d)),
            (None, Some(s)) => Some(PrimaryMetric::Duration(s)),
            _ => None,
        }
    }

    /// Check the exactly-one-primary-metric invariant.
    pub fn has_one_primary_metric(&self) -> bool {
        self.primary_metric().is_some()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session links
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Review status of a planned-session ↔ activity pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Proposed,
    Confirmed,
    Rejected,
}

/// Unique pairing between one planned session and one completed activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLink {
    pub planned_session_id: String,
    pub activity_id: String,
    pub status: LinkStatus,
    /// How the pairing was made (`"auto"`, `"manual"`).
    pub method: String,
    pub confidence: f64,
}

/// Modification request for a single planned session.
///
/// `intent` is copied from the existing session unless
/// `explicit_intent_change` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionModification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    #[serde(default)]
    pub explicit_intent_change: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(distance: Option<f64>, duration: Option<u32>) -> MaterializedSession {
        MaterializedSession {
            starts_at: Utc::now(),
            sport: "run".into(),
            session_type: "easy_run".into(),
            intent: Intent::Easy,
            duration_seconds: duration,
            distance_meters: distance,
            description_text: "Easy run".into(),
            workout_steps: vec![],
        }
    }

    #[test]
    fn primary_metric_is_exclusive() {
        assert!(session(Some(8_000.0), None).has_one_primary_metric());
        assert!(session(None, Some(3_600)).has_one_primary_metric());
        assert!(!session(Some(8_000.0), Some(3_600)).has_one_primary_metric());
        assert!(!session(None, None).has_one_primary_metric());
    }

    #[test]
    fn step_order_alias_accepted_never_emitted() {
        let legacy = r#"{"step_order": 2, "step_type": "interval", "instructions": "4x800m"}"#;
        let step: WorkoutStep = serde_json::from_str(legacy).unwrap();
        assert_eq!(step.step_index, 2);

        let out = serde_json::to_string(&step).unwrap();
        assert!(out.contains("step_index"));
        assert!(!out.contains("step_order"));
    }

    #[test]
    fn quality_is_the_only_hard_intent() {
        assert!(Intent::Quality.is_hard());
        assert!(!Intent::Long.is_hard());
        assert!(!Intent::Easy.is_hard());
        assert!(!Intent::Rest.is_hard());
    }
}
