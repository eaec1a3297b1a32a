//! Plan registration tools.
//!
//! Plan generation itself runs in the controller process; these tools
//! validate the race/season inputs, mint the plan record, and answer the
//! weekly-plan gating question (`has_race_plan`).

use chrono::{NaiveDate, Utc};
use rusqlite::params;
use serde::Deserialize;
use serde_json::{json, Value};

use pl_domain::tool::{ToolError, ToolErrorCode};

use crate::db::{db_error, Database};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// plan_race_build
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct PlanRaceBuildArgs {
    pub user_id: String,
    pub race_distance: Option<String>,
    pub race_date: Option<String>,
    /// The conversation's "today"; race_date must lie after it.
    pub today: String,
}

/// Validate race info and register a race-build plan. Returns the new
/// `plan_id`.
pub fn plan_race_build(db: &Database, args: PlanRaceBuildArgs) -> Result<Value, ToolError> {
    let (Some(distance), Some(date_raw)) = (&args.race_distance, &args.race_date) else {
        return Err(ToolError {
            code: ToolErrorCode::MissingRaceInfo,
            message: "race_distance and race_date are required".into(),
        });
    };

    let race_date = parse_date(date_raw)?;
    let today = parse_date(&args.today)?;
    if race_date <= today {
        return Err(ToolError {
            code: ToolErrorCode::InvalidRaceDate,
            message: format!("race date {race_date} is not in the future"),
        });
    }

    let plan_id = uuid::Uuid::new_v4().to_string();
    let conn = db.conn.lock();
    conn.execute(
        "INSERT INTO plans (id, user_id, plan_type, race_date, created_at)
         VALUES (?1, ?2, 'race_build', ?3, ?4)",
        params![plan_id, args.user_id, race_date.to_string(), Utc::now().to_rfc3339()],
    )
    .map_err(db_error)?;

    Ok(json!({
        "plan_id": plan_id,
        "plan_type": "race_build",
        "race_distance": distance,
        "race_date": race_date.to_string(),
    }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// plan_season
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct PlanSeasonArgs {
    pub user_id: String,
    pub season_start: Option<String>,
    pub season_end: Option<String>,
}

pub fn plan_season(db: &Database, args: PlanSeasonArgs) -> Result<Value, ToolError> {
    let (Some(start_raw), Some(end_raw)) = (&args.season_start, &args.season_end) else {
        return Err(ToolError {
            code: ToolErrorCode::MissingSeasonInfo,
            message: "season_start and season_end are required".into(),
        });
    };

    let start = parse_date(start_raw)?;
    let end = parse_date(end_raw)?;
    if end <= start {
        return Err(ToolError {
            code: ToolErrorCode::InvalidSeasonDates,
            message: format!("season end {end} is not after start {start}"),
        });
    }

    let plan_id = uuid::Uuid::new_v4().to_string();
    let conn = db.conn.lock();
    conn.execute(
        "INSERT INTO plans (id, user_id, plan_type, season_start, season_end, created_at)
         VALUES (?1, ?2, 'season', ?3, ?4, ?5)",
        params![
            plan_id,
            args.user_id,
            start.to_string(),
            end.to_string(),
            Utc::now().to_rfc3339()
        ],
    )
    .map_err(db_error)?;

    Ok(json!({ "plan_id": plan_id, "plan_type": "season" }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// add_workout
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct AddWorkoutArgs {
    pub user_id: String,
    pub description: String,
}

/// Register a one-off workout request as its own single-session plan.
pub fn add_workout(db: &Database, args: AddWorkoutArgs) -> Result<Value, ToolError> {
    if args.description.trim().is_empty() {
        return Err(ToolError {
            code: ToolErrorCode::InvalidWorkoutDescription,
            message: "workout description must not be empty".into(),
        });
    }

    let plan_id = uuid::Uuid::new_v4().to_string();
    let conn = db.conn.lock();
    conn.execute(
        "INSERT INTO plans (id, user_id, plan_type, created_at)
         VALUES (?1, ?2, 'workout', ?3)",
        params![plan_id, args.user_id, Utc::now().to_rfc3339()],
    )
    .map_err(db_error)?;

    Ok(json!({ "plan_id": plan_id, "plan_type": "workout" }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// has_race_plan
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct HasRacePlanArgs {
    pub user_id: String,
}

pub fn has_race_plan(db: &Database, args: HasRacePlanArgs) -> Result<Value, ToolError> {
    let conn = db.conn.lock();
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM plans WHERE user_id = ?1 AND plan_type = 'race_build'",
            [&args.user_id],
            |row| row.get(0),
        )
        .map_err(db_error)?;
    Ok(json!({ "has_race_plan": count > 0 }))
}

fn parse_date(raw: &str) -> Result<NaiveDate, ToolError> {
    raw.parse::<NaiveDate>().map_err(|_| ToolError {
        code: ToolErrorCode::InvalidDateFormat,
        message: format!("expected ISO date, got {raw:?}"),
    })
}
