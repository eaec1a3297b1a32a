//! EXECUTE_TOOL — run the decided target action.
//!
//! Every execution path registers or mutates state exclusively through
//! the tool boundary, then reports a terse confirmation line. Execution
//! input failures (a modify without a usable day, a race date the data
//! server rejects) surface as a single clarifying question per the
//! error-handling policy.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde_json::{json, Value};

use pl_domain::athlete::AthleteProfile;
use pl_domain::conversation::TargetAction;
use pl_domain::error::{Error, Result};
use pl_domain::plan::PlanningContext;
use pl_domain::session::{Intent, MaterializedSession, WorkoutStep};
use pl_domain::slots::{RaceDistance, SlotName, SlotValue};
use pl_domain::tool::ToolErrorCode;
use pl_pipeline::persist::persist_sessions;
use pl_pipeline::pipeline::PlanScope;
use pl_pipeline::PlanningPipeline;
use pl_toolclient::routing::data;

use crate::store::ConversationStore;

/// Days of activity history pulled into the planning context.
const ACTIVITY_WINDOW_DAYS: u64 = 28;
/// Season length when planning without a race on the calendar.
const SEASON_WEEKS: i64 = 16;

/// Result of a successful execution.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub text: String,
    /// Structured payload stored with the assistant message.
    pub payload: Value,
}

/// Inputs shared by every execution path.
pub struct ExecutionRequest<'a> {
    pub user_id: &'a str,
    pub user_message: &'a str,
    pub today: NaiveDate,
    pub slots: &'a BTreeMap<SlotName, SlotValue>,
    /// Inline arguments from target classification (modify targets).
    pub arguments: &'a Value,
}

pub struct Executor {
    store: Arc<ConversationStore>,
    pipeline: Arc<PlanningPipeline>,
}

impl Executor {
    pub fn new(store: Arc<ConversationStore>, pipeline: Arc<PlanningPipeline>) -> Self {
        Self { store, pipeline }
    }

    pub async fn execute(
        &self,
        target: TargetAction,
        req: &ExecutionRequest<'_>,
    ) -> Result<ExecutionOutcome> {
        match target {
            TargetAction::PlanRaceBuild => self.plan_race_build(req).await,
            TargetAction::WeeklyPlan => self.weekly_plan(req).await,
            TargetAction::PlanSeason => self.plan_season(req).await,
            TargetAction::AddWorkout => self.add_workout(req).await,
            TargetAction::ModifyDay => self.modify_day(req).await,
            TargetAction::ModifyWeek => self.modify_week(req).await,
        }
    }

    // ── plan_race_build ──────────────────────────────────────────────

    async fn plan_race_build(&self, req: &ExecutionRequest<'_>) -> Result<ExecutionOutcome> {
        let distance = req
            .slots
            .get(&SlotName::RaceDistance)
            .and_then(SlotValue::as_distance)
            .ok_or_else(|| Error::Validation("race distance slot is unfilled".into()))?;
        let race_date = req
            .slots
            .get(&SlotName::RaceDate)
            .and_then(SlotValue::as_date)
            .ok_or_else(|| Error::Validation("race date slot is unfilled".into()))?;

        let registered = self
            .call_data(
                data::PLAN_RACE_BUILD,
                json!({
                    "user_id": req.user_id,
                    "race_distance": distance.race_type(),
                    "race_date": race_date.to_string(),
                    "today": req.today.to_string(),
                }),
            )
            .await?;
        let plan_id = registered["plan_id"]
            .as_str()
            .ok_or_else(|| Error::Boundary("plan registration returned no plan_id".into()))?
            .to_owned();

        let ctx = self.planning_context(req, plan_id).await;
        let outcome = self.pipeline.run(&ctx, PlanScope::Full).await?;

        let peak = outcome
            .weeks
            .iter()
            .map(|w| w.target_weekly_miles)
            .fold(0.0_f64, f64::max);
        Ok(ExecutionOutcome {
            text: format!(
                "Done: {}-week {} build created with {} sessions, peaking at {peak:.0} mi/week.",
                outcome.weeks.len(),
                distance.race_type(),
                outcome.sessions.len(),
            ),
            payload: json!({
                "plan_id": outcome.plan_id,
                "philosophy_id": outcome.philosophy_id,
                "weeks": outcome.weeks.len(),
                "sessions": outcome.sessions.len(),
                "persist": outcome.persist,
            }),
        })
    }

    // ── weekly_plan ──────────────────────────────────────────────────

    async fn weekly_plan(&self, req: &ExecutionRequest<'_>) -> Result<ExecutionOutcome> {
        // Deterministic plan id per user+week keeps re-planning idempotent.
        let week_start = next_monday(req.today);
        let plan_id = format!("weekly-{}-{week_start}", req.user_id);

        let ctx = self.planning_context(req, plan_id).await;
        let outcome = self.pipeline.run(&ctx, PlanScope::NextWeek).await?;

        let miles: f64 = outcome
            .sessions
            .iter()
            .filter_map(|s| s.distance_meters)
            .sum::<f64>()
            / 1609.34;
        Ok(ExecutionOutcome {
            text: format!(
                "Done: week of {week_start} planned with {} sessions totaling {miles:.0} mi.",
                outcome.sessions.len(),
            ),
            payload: json!({
                "plan_id": outcome.plan_id,
                "sessions": outcome.sessions.len(),
                "persist": outcome.persist,
            }),
        })
    }

    // ── plan_season ──────────────────────────────────────────────────

    async fn plan_season(&self, req: &ExecutionRequest<'_>) -> Result<ExecutionOutcome> {
        let season_end = req.today + chrono::Duration::weeks(SEASON_WEEKS);
        let registered = self
            .call_data(
                data::PLAN_SEASON,
                json!({
                    "user_id": req.user_id,
                    "season_start": req.today.to_string(),
                    "season_end": season_end.to_string(),
                }),
            )
            .await?;
        let plan_id = registered["plan_id"]
            .as_str()
            .ok_or_else(|| Error::Boundary("season registration returned no plan_id".into()))?
            .to_owned();

        let mut ctx = self.planning_context(req, plan_id).await;
        // A season has no race on the calendar: anchor the build to the
        // season end, defaulting the distance when none was given.
        ctx.slots
            .entry(SlotName::RaceDate)
            .or_insert(SlotValue::Date(season_end));
        ctx.slots
            .entry(SlotName::RaceDistance)
            .or_insert(SlotValue::Distance(RaceDistance::Half));

        let outcome = self.pipeline.run(&ctx, PlanScope::Full).await?;
        Ok(ExecutionOutcome {
            text: format!(
                "Done: {SEASON_WEEKS}-week season planned with {} sessions.",
                outcome.sessions.len()
            ),
            payload: json!({
                "plan_id": outcome.plan_id,
                "sessions": outcome.sessions.len(),
            }),
        })
    }

    // ── add_workout ──────────────────────────────────────────────────

    async fn add_workout(&self, req: &ExecutionRequest<'_>) -> Result<ExecutionOutcome> {
        let registered = self
            .call_data(
                data::ADD_WORKOUT,
                json!({ "user_id": req.user_id, "description": req.user_message }),
            )
            .await?;
        let plan_id = registered["plan_id"]
            .as_str()
            .ok_or_else(|| Error::Boundary("workout registration returned no plan_id".into()))?
            .to_owned();

        let day = next_weekday(req.today, chrono::Weekday::Sat);
        let session = one_off_workout(req, day);
        let ctx = self.planning_context(req, plan_id).await;
        let persist = persist_sessions(self.store.tools(), &ctx, "workout", &[session]).await?;

        Ok(ExecutionOutcome {
            text: format!("Done: workout added for {day}."),
            payload: json!({ "plan_id": ctx.plan_id, "persist": persist }),
        })
    }

    // ── modify_day / modify_week ─────────────────────────────────────

    async fn modify_day(&self, req: &ExecutionRequest<'_>) -> Result<ExecutionOutcome> {
        let day = req.arguments["date"]
            .as_str()
            .and_then(|raw| raw.parse::<NaiveDate>().ok())
            .ok_or_else(|| Error::Validation("modify_day needs a concrete day".into()))?;

        let mut arguments = json!({ "user_id": req.user_id, "day": day.to_string() });
        if let Some(miles) = req.arguments["distance_miles"].as_f64() {
            arguments["distance_meters"] = json!(miles * 1609.34);
        }
        if let Some(text) = req.arguments["description"].as_str() {
            arguments["description_text"] = json!(text);
        }
        if req.arguments["explicit_intent_change"].as_bool() == Some(true) {
            arguments["explicit_intent_change"] = json!(true);
            arguments["intent"] = req.arguments["intent"].clone();
        }

        self.call_data(data::MODIFY_DAY, arguments).await?;
        Ok(ExecutionOutcome {
            text: format!("Done: updated the session on {day}."),
            payload: json!({ "day": day.to_string() }),
        })
    }

    async fn modify_week(&self, req: &ExecutionRequest<'_>) -> Result<ExecutionOutcome> {
        let week_start = req.arguments["week_start"]
            .as_str()
            .and_then(|raw| raw.parse::<NaiveDate>().ok())
            .unwrap_or_else(|| next_monday(req.today));
        let scale = req.arguments["scale"].as_f64().unwrap_or(0.8);

        self.call_data(
                data::MODIFY_WEEK,
                json!({
                    "user_id": req.user_id,
                    "week_start": week_start.to_string(),
                    "scale": scale,
                }),
            )
            .await?;
        Ok(ExecutionOutcome {
            text: format!("Done: scaled the week of {week_start} to {:.0}% volume.", scale * 100.0),
            payload: json!({ "week_start": week_start.to_string(), "scale": scale }),
        })
    }

    // ── shared ───────────────────────────────────────────────────────

    /// Call a data tool, surfacing tool-rejected input as a validation
    /// error so the turn re-asks instead of failing outright.
    async fn call_data(&self, tool: &str, args: serde_json::Value) -> Result<serde_json::Value> {
        match self.store.tools().call(tool, args).await {
            Ok(value) => Ok(value),
            Err(pl_toolclient::ToolClientError::Remote(err)) if is_input_error(err.code) => {
                Err(Error::Validation(err.message))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Assemble the immutable planning context for one invocation.
    async fn planning_context(&self, req: &ExecutionRequest<'_>, plan_id: String) -> PlanningContext {
        let athlete: AthleteProfile = self.store.get_athlete(req.user_id).await;
        let recent_activity = self
            .store
            .recent_activities(req.user_id, ACTIVITY_WINDOW_DAYS)
            .await;
        PlanningContext {
            plan_id,
            athlete,
            slots: req.slots.clone(),
            recent_activity,
            today: req.today,
            fatigue_factor: None,
        }
    }
}

/// A deterministic one-off quality session carrying the athlete's own
/// words as its description.
fn one_off_workout(req: &ExecutionRequest<'_>, day: NaiveDate) -> MaterializedSession {
    let miles = req
        .slots
        .get(&SlotName::WeeklyMileage)
        .and_then(SlotValue::as_mileage)
        .map_or(6.0, |weekly| (weekly / 7.0).clamp(4.0, 10.0));

    MaterializedSession {
        starts_at: day.and_hms_opt(9, 0, 0).expect("fixed session hour").and_utc(),
        sport: "run".into(),
        session_type: "workout".into(),
        intent: Intent::Quality,
        duration_seconds: None,
        distance_meters: Some(miles * 1609.34),
        description_text: req.user_message.trim().to_owned(),
        workout_steps: vec![
            WorkoutStep {
                step_index: 0,
                step_type: "warmup".into(),
                targets: json!({ "duration_minutes": 15 }),
                instructions: "15 min easy jogging".into(),
                purpose: "prepare for hard running".into(),
            },
            WorkoutStep {
                step_index: 1,
                step_type: "main".into(),
                targets: json!({ "distance_miles": miles }),
                instructions: req.user_message.trim().to_owned(),
                purpose: "requested workout".into(),
            },
            WorkoutStep {
                step_index: 2,
                step_type: "cooldown".into(),
                targets: json!({ "duration_minutes": 10 }),
                instructions: "10 min easy jogging".into(),
                purpose: "flush and recover".into(),
            },
        ],
    }
}

fn next_monday(today: NaiveDate) -> NaiveDate {
    next_weekday(today, chrono::Weekday::Mon)
}

fn next_weekday(today: NaiveDate, weekday: chrono::Weekday) -> NaiveDate {
    let ahead = (7 + weekday.num_days_from_monday() - today.weekday().num_days_from_monday()) % 7;
    let ahead = if ahead == 0 { 7 } else { ahead };
    today + chrono::Duration::days(i64::from(ahead))
}

/// Codes that mean the input, not the boundary, was the problem.
fn is_input_error(code: ToolErrorCode) -> bool {
    matches!(
        code,
        ToolErrorCode::InvalidInput
            | ToolErrorCode::InvalidDateFormat
            | ToolErrorCode::InvalidRaceDate
            | ToolErrorCode::MissingRaceInfo
            | ToolErrorCode::MissingSeasonInfo
            | ToolErrorCode::InvalidSeasonDates
            | ToolErrorCode::InvalidWorkoutDescription
            | ToolErrorCode::InvalidSessionData
    )
}

/// The clarifying question shown when an execution fails on input.
pub fn clarifying_question(target: TargetAction) -> String {
    match target {
        TargetAction::PlanRaceBuild | TargetAction::PlanSeason => {
            "What date is your race?".to_owned()
        }
        TargetAction::WeeklyPlan => "What race are you training for?".to_owned(),
        TargetAction::AddWorkout => "What workout would you like to add?".to_owned(),
        TargetAction::ModifyDay => "Which day needs the change?".to_owned(),
        TargetAction::ModifyWeek => "Which week needs the change?".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_weekday_rolls_forward() {
        // 2026-01-10 is a Saturday.
        let today: NaiveDate = "2026-01-10".parse().unwrap();
        assert_eq!(next_monday(today), "2026-01-12".parse::<NaiveDate>().unwrap());
        assert_eq!(
            next_weekday(today, chrono::Weekday::Sat),
            "2026-01-17".parse::<NaiveDate>().unwrap()
        );
    }

    #[test]
    fn clarifying_questions_are_single_questions() {
        for target in [
            TargetAction::PlanRaceBuild,
            TargetAction::PlanSeason,
            TargetAction::WeeklyPlan,
            TargetAction::AddWorkout,
            TargetAction::ModifyDay,
            TargetAction::ModifyWeek,
        ] {
            assert_eq!(clarifying_question(target).matches('?').count(), 1);
        }
    }
}
