//! Volume allocation — distributing weekly miles across days.
//!
//! A deterministic solver: the long run gets 25–35% of weekly volume,
//! easy days have a 2-mile floor, rest days stay at zero, and hard days
//! receive the residual. Final rounding uses the largest-remainder
//! method in tenths of a mile, so the weekly sum matches the target
//! exactly at 0.1-mile precision.

use chrono::NaiveDate;

use pl_corpus::WeekStructure;
use pl_domain::error::{Error, Result};
use pl_domain::plan::MacroWeek;
use pl_domain::session::Intent;

/// Floor for any running (non-rest) day.
const EASY_FLOOR_MILES: f64 = 2.0;

/// One allocated day of a training week.
#[derive(Debug, Clone, PartialEq)]
pub struct DayAllocation {
    /// 0 = Monday.
    pub weekday: usize,
    pub date: NaiveDate,
    pub session_type: String,
    pub intent: Intent,
    pub miles: f64,
}

/// Allocate a macro week's volume across the structure's pattern.
///
/// `fatigue_factor`, when supplied, scales the target volume and is
/// clamped to `[0.7, 1.0]` first.
pub fn allocate_week(
    week: &MacroWeek,
    structure: &WeekStructure,
    fatigue_factor: Option<f64>,
) -> Result<Vec<DayAllocation>> {
    let scale = fatigue_factor.map_or(1.0, |f| f.clamp(0.7, 1.0));
    let target = round_tenth(week.target_weekly_miles * scale);

    let intents: Vec<Intent> = structure
        .pattern
        .iter()
        .map(|t| structure.intent_for(t))
        .collect();

    let long_days = intents.iter().filter(|i| **i == Intent::Long).count();
    let required_long = structure.rules.long_run.required_count as usize;
    if long_days != required_long {
        return Err(Error::PipelineInvariant {
            stage: "volume",
            guard: "long_run_count",
            message: format!(
                "structure {} has {long_days} long days, requires {required_long}",
                structure.id
            ),
        });
    }

    let easy_days = intents.iter().filter(|i| **i == Intent::Easy).count();
    let hard_days = intents.iter().filter(|i| **i == Intent::Quality).count();

    // Long run: 25–35% of the week, centered at 30%.
    let long_miles = if required_long == 1 {
        (target * 0.30).clamp(target * 0.25, target * 0.35)
    } else {
        0.0
    };

    let remaining = (target - long_miles).max(0.0);
    let running_days = easy_days + hard_days;

    // Even split first, then easy floor, hard days absorb the residual.
    let (easy_each, hard_each) = if running_days == 0 {
        (0.0, 0.0)
    } else {
        let even = remaining / running_days as f64;
        if even < EASY_FLOOR_MILES {
            // Thin week: floors are infeasible, split evenly instead.
            (even, even)
        } else {
            let easy = even.max(EASY_FLOOR_MILES);
            let residual = remaining - easy * easy_days as f64;
            if hard_days > 0 {
                (easy, residual / hard_days as f64)
            } else {
                (remaining / easy_days as f64, 0.0)
            }
        }
    };

    let ideal: Vec<f64> = intents
        .iter()
        .map(|intent| match intent {
            Intent::Rest => 0.0,
            Intent::Long => long_miles,
            Intent::Easy => easy_each,
            Intent::Quality => hard_each,
        })
        .collect();

    let rounded = round_to_target(&ideal, target, &intents);

    Ok(intents
        .into_iter()
        .enumerate()
        .map(|(weekday, intent)| DayAllocation {
            weekday,
            date: week.start_date + chrono::Duration::days(weekday as i64),
            session_type: structure.pattern[weekday].clone(),
            intent,
            miles: rounded[weekday],
        })
        .collect())
}

/// Largest-remainder rounding in tenths: the rounded values sum to the
/// target exactly. Rest days never receive correction tenths.
fn round_to_target(ideal: &[f64], target: f64, intents: &[Intent]) -> Vec<f64> {
    let target_tenths = (target * 10.0).round() as i64;

    let mut floors: Vec<i64> = ideal.iter().map(|v| (v * 10.0).floor() as i64).collect();
    let mut shortfall = target_tenths - floors.iter().sum::<i64>();

    // Days ranked by fractional part, largest first; index breaks ties.
    let mut order: Vec<usize> = (0..ideal.len())
        .filter(|i| intents[*i] != Intent::Rest)
        .collect();
    order.sort_by(|a, b| {
        let fa = ideal[*a] * 10.0 - (ideal[*a] * 10.0).floor();
        let fb = ideal[*b] * 10.0 - (ideal[*b] * 10.0).floor();
        fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal).then(a.cmp(b))
    });

    let mut cursor = 0;
    while shortfall > 0 && !order.is_empty() {
        let idx = order[cursor % order.len()];
        floors[idx] += 1;
        shortfall -= 1;
        cursor += 1;
    }

    floors.into_iter().map(|t| t as f64 / 10.0).collect()
}

pub(crate) fn round_tenth(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pl_corpus::document::parse_document;
    use pl_domain::plan::Phase;

    fn structure() -> WeekStructure {
        let doc = parse_document(
            r#"---
id: s1
domain: structure
race_types: [marathon]
audience: [intermediate]
phase: build
structure_spec:
  philosophy_id: p1
  days_to_race_range: [0, 365]
  week_pattern:
    mon: rest
    tue: intervals
    wed: easy_run
    thu: tempo
    fri: easy_run
    sat: long_run
    sun: easy_run
  rules:
    hard_days_max: 2
    no_consecutive_hard_days: true
    long_run:
      required_count: 1
  session_groups:
    hard: [intervals, tempo]
    easy: [easy_run]
    long: [long_run]
---
w
"#,
        )
        .unwrap();
        WeekStructure::from_document(&doc).unwrap()
    }

    fn week(miles: f64) -> MacroWeek {
        MacroWeek {
            index: 0,
            phase: Phase::Build,
            focus: String::new(),
            target_weekly_miles: miles,
            start_date: "2026-02-02".parse().unwrap(),
            days_to_race: 60,
            recovery: false,
        }
    }

    #[test]
    fn sum_matches_target_exactly() {
        for target in [20.0, 33.3, 40.0, 55.0, 71.7] {
            let days = allocate_week(&week(target), &structure(), None).unwrap();
            let sum: f64 = days.iter().map(|d| d.miles).sum();
            assert!(
                (sum - target).abs() < 0.05,
                "target {target} summed to {sum}"
            );
        }
    }

    #[test]
    fn long_run_is_quarter_to_third_of_week() {
        let days = allocate_week(&week(50.0), &structure(), None).unwrap();
        let long: Vec<_> = days.iter().filter(|d| d.intent == Intent::Long).collect();
        assert_eq!(long.len(), 1);
        assert!(long[0].miles >= 50.0 * 0.25 - 0.1);
        assert!(long[0].miles <= 50.0 * 0.35 + 0.1);
    }

    #[test]
    fn rest_days_stay_at_zero() {
        let days = allocate_week(&week(50.0), &structure(), None).unwrap();
        for day in days.iter().filter(|d| d.intent == Intent::Rest) {
            assert_eq!(day.miles, 0.0);
        }
    }

    #[test]
    fn easy_days_respect_the_floor() {
        let days = allocate_week(&week(30.0), &structure(), None).unwrap();
        for day in days.iter().filter(|d| d.intent == Intent::Easy) {
            assert!(day.miles >= EASY_FLOOR_MILES - 0.1, "{day:?}");
        }
    }

    #[test]
    fn fatigue_scales_volume_within_bounds() {
        let full = allocate_week(&week(50.0), &structure(), None).unwrap();
        let tired = allocate_week(&week(50.0), &structure(), Some(0.5)).unwrap();
        let full_sum: f64 = full.iter().map(|d| d.miles).sum();
        let tired_sum: f64 = tired.iter().map(|d| d.miles).sum();
        // 0.5 clamps to 0.7.
        assert!((tired_sum - full_sum * 0.7).abs() < 0.2);
    }

    #[test]
    fn allocation_is_deterministic() {
        let a = allocate_week(&week(47.3), &structure(), None).unwrap();
        let b = allocate_week(&week(47.3), &structure(), None).unwrap();
        assert_eq!(a, b);
    }
}
