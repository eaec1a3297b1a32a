//! Inter-stage guards.
//!
//! Every guard returns the domain's `PipelineInvariant` error naming the
//! stage boundary and the violated guard. The first violation aborts
//! the pipeline; nothing downstream runs and nothing is persisted.

use std::collections::BTreeSet;

use pl_corpus::WeekStructure;
use pl_domain::error::{Error, Result};
use pl_domain::plan::MacroWeek;
use pl_domain::session::{Intent, MaterializedSession};

use crate::volume::DayAllocation;

/// Allowed relative deviation of a week's allocated sum (P5).
const VOLUME_TOLERANCE: f64 = 0.01;

fn violation(stage: &'static str, guard: &'static str, message: String) -> Error {
    Error::PipelineInvariant {
        stage,
        guard,
        message,
    }
}

// ── macro plan → structure ───────────────────────────────────────────

/// Weeks must be contiguous with monotonic indices and forward-only
/// phase transitions.
pub fn guard_macro_plan(weeks: &[MacroWeek]) -> Result<()> {
    if weeks.is_empty() {
        return Err(violation("macro_plan", "weeks_nonempty", "macro plan has no weeks".into()));
    }

    for pair in weeks.windows(2) {
        if pair[1].index != pair[0].index + 1 {
            return Err(violation(
                "macro_plan",
                "weeks_monotonic",
                format!("week {} follows week {}", pair[1].index, pair[0].index),
            ));
        }
        if pair[1].start_date != pair[0].start_date + chrono::Duration::weeks(1) {
            return Err(violation(
                "macro_plan",
                "weeks_contiguous",
                format!("gap between week {} and week {}", pair[0].index, pair[1].index),
            ));
        }
        if !pair[0].phase.can_transition_to(pair[1].phase) {
            return Err(violation(
                "macro_plan",
                "phase_transition",
                format!(
                    "week {} moves {} → {}",
                    pair[1].index,
                    pair[0].phase.as_str(),
                    pair[1].phase.as_str()
                ),
            ));
        }
    }
    Ok(())
}

// ── volume → template ────────────────────────────────────────────────

/// Allocated distances must sum to the (possibly fatigue-scaled) target
/// within 1%, long-run count must obey the structure, hard days must be
/// capped and never adjacent.
pub fn guard_week_allocation(
    week: &MacroWeek,
    structure: &WeekStructure,
    expected_total: f64,
    days: &[DayAllocation],
) -> Result<()> {
    let sum: f64 = days.iter().map(|d| d.miles).sum();
    let tolerance = (expected_total * VOLUME_TOLERANCE).max(0.05);
    if (sum - expected_total).abs() > tolerance {
        return Err(violation(
            "volume",
            "volume_sum",
            format!(
                "week {} allocates {sum:.1} mi against target {expected_total:.1}",
                week.index
            ),
        ));
    }

    let long_count = days.iter().filter(|d| d.intent == Intent::Long).count();
    let required = structure.rules.long_run.required_count as usize;
    if long_count != required {
        return Err(violation(
            "volume",
            "long_run_count",
            format!("week {} has {long_count} long runs, requires {required}", week.index),
        ));
    }

    let hard_count = days.iter().filter(|d| d.intent.is_hard()).count();
    if hard_count > structure.rules.hard_days_max as usize {
        return Err(violation(
            "volume",
            "hard_days_max",
            format!(
                "week {} has {hard_count} hard days, cap is {}",
                week.index, structure.rules.hard_days_max
            ),
        ));
    }

    if structure.rules.no_consecutive_hard_days {
        for pair in days.windows(2) {
            if pair[0].intent.is_hard() && pair[1].intent.is_hard() {
                return Err(violation(
                    "volume",
                    "no_consecutive_hard_days",
                    format!("week {} has adjacent hard days", week.index),
                ));
            }
        }
    }

    Ok(())
}

// ── template → session text ──────────────────────────────────────────

/// Every materialized session carries exactly one primary metric.
pub fn guard_primary_metric(sessions: &[MaterializedSession]) -> Result<()> {
    for session in sessions {
        if !session.has_one_primary_metric() {
            return Err(violation(
                "template",
                "one_primary_metric",
                format!("session at {} has distance XOR duration violated", session.starts_at),
            ));
        }
    }
    Ok(())
}

// ── persistence ──────────────────────────────────────────────────────

/// No two sessions may share a start second.
pub fn guard_unique_starts(sessions: &[MaterializedSession]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for session in sessions {
        if !seen.insert(session.starts_at.timestamp()) {
            return Err(violation(
                "persist",
                "unique_starts_at",
                format!("duplicate session start {}", session.starts_at),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pl_domain::plan::Phase;

    fn week(index: u32, phase: Phase, start: &str) -> MacroWeek {
        MacroWeek {
            index,
            phase,
            focus: String::new(),
            target_weekly_miles: 40.0,
            start_date: start.parse().unwrap(),
            days_to_race: 50,
            recovery: false,
        }
    }

    #[test]
    fn backward_phase_transition_is_caught() {
        let weeks = vec![
            week(0, Phase::Peak, "2026-02-02"),
            week(1, Phase::Build, "2026-02-09"),
        ];
        let err = guard_macro_plan(&weeks).unwrap_err();
        assert!(matches!(
            err,
            Error::PipelineInvariant { guard: "phase_transition", .. }
        ));
    }

    #[test]
    fn week_gap_is_caught() {
        let weeks = vec![
            week(0, Phase::Base, "2026-02-02"),
            week(1, Phase::Base, "2026-02-16"),
        ];
        let err = guard_macro_plan(&weeks).unwrap_err();
        assert!(matches!(
            err,
            Error::PipelineInvariant { guard: "weeks_contiguous", .. }
        ));
    }

    #[test]
    fn duplicate_start_seconds_are_caught() {
        let at = Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap();
        let session = MaterializedSession {
            starts_at: at,
            sport: "run".into(),
            session_type: "easy_run".into(),
            intent: Intent::Easy,
            duration_seconds: None,
            distance_meters: Some(8000.0),
            description_text: String::new(),
            workout_steps: vec![],
        };
        let err = guard_unique_starts(&[session.clone(), session]).unwrap_err();
        assert!(matches!(
            err,
            Error::PipelineInvariant { guard: "unique_starts_at", .. }
        ));
    }
}
