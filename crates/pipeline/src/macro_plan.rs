//! Macro planning — the week-by-week skeleton of the plan.
//!
//! Produces one record per week from plan start to race day, honoring:
//! - week-over-week increase capped at 10% (recovery weeks excepted),
//! - a recovery week (volume cut 25%) every 4th base/build week,
//! - monotonically decreasing taper volume.

use chrono::{Datelike, NaiveDate};

use pl_domain::error::{Error, Result};
use pl_domain::plan::{MacroWeek, Phase, PlanningContext};
use pl_domain::slots::{RaceDistance, SlotName, SlotValue};

/// Weekly mileage floor a plan can start from.
const MIN_START_MILES: f64 = 15.0;
/// Default starting volume when neither slots nor activity history say.
const DEFAULT_START_MILES: f64 = 25.0;

/// Build the macro plan for the context's race.
pub fn build_macro_plan(ctx: &PlanningContext) -> Result<Vec<MacroWeek>> {
    let race_date = ctx
        .slot(SlotName::RaceDate)
        .and_then(SlotValue::as_date)
        .ok_or_else(|| Error::Validation("macro plan needs a race date".into()))?;
    let distance = ctx
        .slot(SlotName::RaceDistance)
        .and_then(SlotValue::as_distance)
        .ok_or_else(|| Error::Validation("macro plan needs a race distance".into()))?;

    let plan_start = next_monday(ctx.today);
    let total_days = (race_date - plan_start).num_days();
    if total_days < 7 {
        return Err(Error::Validation(format!(
            "race on {race_date} is too close to build a plan"
        )));
    }
    let total_weeks = (total_days / 7).max(1) as u32;

    let start_miles = starting_mileage(ctx);
    let taper_weeks = taper_weeks_for(distance).min(total_weeks.saturating_sub(1)).max(1);
    let peak_weeks: u32 = if total_weeks >= 12 { 2 } else { 1 };
    let ramp_weeks = total_weeks.saturating_sub(taper_weeks + peak_weeks);
    let base_weeks = (ramp_weeks * 2) / 5;

    let peak_miles = peak_target(distance, start_miles, ramp_weeks);

    let mut weeks = Vec::with_capacity(total_weeks as usize);
    let mut baseline = start_miles;

    for index in 0..total_weeks {
        let start_date = plan_start + chrono::Duration::weeks(i64::from(index));
        let days_to_race = (race_date - start_date).num_days();

        let (phase, recovery, miles) = if index >= total_weeks - taper_weeks {
            // Taper: monotonic decrease from the peak actually reached.
            let taper_pos = index - (total_weeks - taper_weeks);
            let factor = match taper_weeks - taper_pos {
                1 => 0.40,
                2 => 0.60,
                _ => 0.75,
            };
            (Phase::Taper, false, baseline * factor)
        } else if index >= total_weeks - taper_weeks - peak_weeks {
            // Peak continues the capped ramp rather than jumping.
            let miles = (baseline * 1.10).min(peak_miles);
            baseline = miles;
            (Phase::Peak, false, miles)
        } else {
            let phase = if index < base_weeks { Phase::Base } else { Phase::Build };
            // Every 4th ramp week is a deliberate down week.
            if index % 4 == 3 {
                (phase, true, baseline * 0.75)
            } else {
                let next = (baseline * 1.10).min(peak_miles);
                let miles = if index == 0 { baseline } else { next };
                baseline = miles;
                (phase, false, miles)
            }
        };

        weeks.push(MacroWeek {
            index,
            phase,
            focus: focus_for(phase, recovery),
            target_weekly_miles: round_tenth(miles),
            start_date,
            days_to_race,
            recovery,
        });
    }

    Ok(weeks)
}

/// Start volume: the weekly-mileage slot when present, else estimated
/// from the last 28 days of activity, else a conservative default.
fn starting_mileage(ctx: &PlanningContext) -> f64 {
    if let Some(miles) = ctx.slot(SlotName::WeeklyMileage).and_then(SlotValue::as_mileage) {
        return miles.max(MIN_START_MILES);
    }

    let cutoff = ctx.today - chrono::Duration::days(28);
    let recent_meters: f64 = ctx
        .recent_activity
        .iter()
        .filter(|a| a.sport == "run" && a.started_at.date_naive() >= cutoff)
        .filter_map(|a| a.distance_meters)
        .sum();
    if recent_meters > 0.0 {
        return (recent_meters / 1609.34 / 4.0).max(MIN_START_MILES);
    }

    DEFAULT_START_MILES
}

fn taper_weeks_for(distance: RaceDistance) -> u32 {
    match distance {
        RaceDistance::Marathon | RaceDistance::Ultra => 3,
        RaceDistance::Half => 2,
        RaceDistance::FiveK | RaceDistance::TenK => 1,
    }
}

/// Peak volume: a distance-appropriate stretch over the start, bounded
/// by what a ≤10%-per-week ramp can actually reach.
fn peak_target(distance: RaceDistance, start: f64, ramp_weeks: u32) -> f64 {
    let floor = match distance {
        RaceDistance::FiveK => 25.0,
        RaceDistance::TenK => 30.0,
        RaceDistance::Half => 35.0,
        RaceDistance::Marathon => 40.0,
        RaceDistance::Ultra => 50.0,
    };
    let wanted = (start * 1.30).max(floor);
    let reachable = start * 1.10_f64.powi(ramp_weeks as i32);
    wanted.min(reachable).max(start)
}

fn focus_for(phase: Phase, recovery: bool) -> String {
    if recovery {
        return "absorb training, cut volume".into();
    }
    match phase {
        Phase::Base => "aerobic base",
        Phase::Build => "race-specific work",
        Phase::Peak => "peak volume and sharpening",
        Phase::Taper => "freshen up for race day",
    }
    .into()
}

fn next_monday(today: NaiveDate) -> NaiveDate {
    let days_ahead = (7 - today.weekday().num_days_from_monday()) % 7;
    let days_ahead = if days_ahead == 0 { 7 } else { days_ahead };
    today + chrono::Duration::days(i64::from(days_ahead))
}

pub(crate) fn round_tenth(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pl_domain::athlete::AthleteProfile;
    use std::collections::BTreeMap;

    fn context(today: &str, race: &str, mileage: Option<f64>) -> PlanningContext {
        let mut slots = BTreeMap::new();
        slots.insert(
            SlotName::RaceDistance,
            SlotValue::Distance(RaceDistance::Marathon),
        );
        slots.insert(SlotName::RaceDate, SlotValue::Date(race.parse().unwrap()));
        if let Some(m) = mileage {
            slots.insert(SlotName::WeeklyMileage, SlotValue::Mileage(m));
        }
        PlanningContext {
            plan_id: "p1".into(),
            athlete: AthleteProfile::anonymous("u1"),
            slots,
            recent_activity: vec![],
            today: today.parse().unwrap(),
            fatigue_factor: None,
        }
    }

    #[test]
    fn weeks_are_contiguous_and_cover_the_span() {
        let weeks = build_macro_plan(&context("2026-01-10", "2026-04-25", Some(55.0))).unwrap();
        assert!(!weeks.is_empty());
        for pair in weeks.windows(2) {
            assert_eq!(pair[1].index, pair[0].index + 1);
            assert_eq!(pair[1].start_date, pair[0].start_date + chrono::Duration::weeks(1));
        }
        assert!(weeks.last().unwrap().days_to_race >= 0);
    }

    #[test]
    fn progression_respects_ten_percent_cap() {
        let weeks = build_macro_plan(&context("2026-01-10", "2026-06-20", Some(30.0))).unwrap();
        let mut prev_baseline = weeks[0].target_weekly_miles;
        for week in weeks.iter().skip(1) {
            if week.phase == Phase::Taper {
                break;
            }
            if week.recovery {
                assert!(week.target_weekly_miles < prev_baseline);
                continue;
            }
            assert!(
                week.target_weekly_miles <= prev_baseline * 1.10 + 0.11,
                "week {} jumped from {prev_baseline} to {}",
                week.index,
                week.target_weekly_miles
            );
            prev_baseline = week.target_weekly_miles;
        }
    }

    #[test]
    fn taper_decreases_monotonically() {
        let weeks = build_macro_plan(&context("2026-01-10", "2026-04-25", Some(55.0))).unwrap();
        let taper: Vec<f64> = weeks
            .iter()
            .filter(|w| w.phase == Phase::Taper)
            .map(|w| w.target_weekly_miles)
            .collect();
        assert!(taper.len() >= 2);
        for pair in taper.windows(2) {
            assert!(pair[1] < pair[0]);
        }
    }

    #[test]
    fn phases_only_move_forward() {
        let weeks = build_macro_plan(&context("2026-01-10", "2026-05-30", Some(40.0))).unwrap();
        for pair in weeks.windows(2) {
            assert!(pair[0].phase.can_transition_to(pair[1].phase));
        }
    }

    #[test]
    fn race_too_close_is_an_error() {
        assert!(build_macro_plan(&context("2026-01-10", "2026-01-14", Some(30.0))).is_err());
    }

    #[test]
    fn start_mileage_estimated_from_activity_history() {
        let mut ctx = context("2026-01-10", "2026-04-25", None);
        for i in 0..8 {
            ctx.recent_activity.push(pl_domain::plan::ActivitySummary {
                activity_id: format!("a{i}"),
                sport: "run".into(),
                started_at: chrono::Utc::now() - chrono::Duration::days(i * 3),
                distance_meters: Some(10_000.0),
                duration_seconds: Some(3000),
            });
        }
        let weeks = build_macro_plan(&ctx).unwrap();
        // Eight 10k runs in four weeks ≈ 12.4 mi/week → clamped to floor.
        assert!(weeks[0].target_weekly_miles >= MIN_START_MILES);
    }
}
