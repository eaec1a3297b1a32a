//! Athlete profile and activity tools.
//!
//! Activities arrive from the external activity source (out of scope);
//! `save_activities` is the seeding surface that source writes through.

use chrono::{Duration, Utc};
use rusqlite::{params, OptionalExtension};
use serde::Deserialize;
use serde_json::{json, Value};

use pl_domain::tool::{ToolError, ToolErrorCode};

use crate::db::{db_error, Database};

const MAX_ACTIVITY_DAYS: u64 = 365;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// get_athlete
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct GetAthleteArgs {
    pub user_id: String,
}

pub fn get_athlete(db: &Database, args: GetAthleteArgs) -> Result<Value, ToolError> {
    let conn = db.conn.lock();
    let row = conn
        .query_row(
            "SELECT display_name, units, timezone, goal_pace_secs_per_mile, tags
             FROM athletes WHERE user_id = ?1",
            [&args.user_id],
            |row| {
                let tags: String = row.get(4)?;
                Ok(json!({
                    "user_id": args.user_id.clone(),
                    "display_name": row.get::<_, String>(0)?,
                    "units": row.get::<_, String>(1)?,
                    "timezone": row.get::<_, String>(2)?,
                    "goal_pace_secs_per_mile": row.get::<_, Option<u32>>(3)?,
                    "tags": serde_json::from_str::<Value>(&tags)
                        .unwrap_or_else(|_| json!([])),
                }))
            },
        )
        .optional()
        .map_err(db_error)?;

    row.ok_or_else(|| ToolError {
        code: ToolErrorCode::AthleteNotFound,
        message: format!("no athlete with user_id {}", args.user_id),
    })
}

#[derive(Debug, Deserialize)]
pub struct SaveAthleteArgs {
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default = "d_units")]
    pub units: String,
    #[serde(default = "d_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub goal_pace_secs_per_mile: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn d_units() -> String {
    "miles".into()
}

fn d_timezone() -> String {
    "UTC".into()
}

pub fn save_athlete(db: &Database, args: SaveAthleteArgs) -> Result<Value, ToolError> {
    let tags = serde_json::to_string(&args.tags).unwrap_or_else(|_| "[]".into());
    let conn = db.conn.lock();
    conn.execute(
        "INSERT INTO athletes
           (user_id, display_name, units, timezone, goal_pace_secs_per_mile, tags)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(user_id) DO UPDATE SET
           display_name = ?2, units = ?3, timezone = ?4,
           goal_pace_secs_per_mile = ?5, tags = ?6",
        params![
            args.user_id,
            args.display_name,
            args.units,
            args.timezone,
            args.goal_pace_secs_per_mile,
            tags
        ],
    )
    .map_err(db_error)?;
    Ok(json!({ "saved": true }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// get_recent_activities / save_activities
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct GetRecentActivitiesArgs {
    pub user_id: String,
    pub days: u64,
}

pub fn get_recent_activities(
    db: &Database,
    args: GetRecentActivitiesArgs,
) -> Result<Value, ToolError> {
    if args.days == 0 || args.days > MAX_ACTIVITY_DAYS {
        return Err(ToolError {
            code: ToolErrorCode::InvalidDays,
            message: format!("days must be in 1..={MAX_ACTIVITY_DAYS}"),
        });
    }

    let cutoff = (Utc::now() - Duration::days(args.days as i64)).to_rfc3339();
    let conn = db.conn.lock();
    let mut stmt = conn
        .prepare(
            "SELECT id, sport, started_at, distance_meters, duration_seconds
             FROM activities
             WHERE user_id = ?1 AND started_at >= ?2
             ORDER BY started_at DESC",
        )
        .map_err(db_error)?;

    let activities: Vec<Value> = stmt
        .query_map(params![args.user_id, cutoff], |row| {
            Ok(json!({
                "activity_id": row.get::<_, String>(0)?,
                "sport": row.get::<_, String>(1)?,
                "started_at": row.get::<_, String>(2)?,
                "distance_meters": row.get::<_, Option<f64>>(3)?,
                "duration_seconds": row.get::<_, Option<u32>>(4)?,
            }))
        })
        .map_err(db_error)?
        .collect::<Result<_, _>>()
        .map_err(db_error)?;

    Ok(json!({ "activities": activities }))
}

#[derive(Debug, Deserialize)]
pub struct SaveActivitiesArgs {
    pub user_id: String,
    pub activities: Vec<ActivityRecord>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityRecord {
    pub activity_id: String,
    pub sport: String,
    pub started_at: String,
    #[serde(default)]
    pub distance_meters: Option<f64>,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
}

pub fn save_activities(db: &Database, args: SaveActivitiesArgs) -> Result<Value, ToolError> {
    let mut conn = db.conn.lock();
    let tx = conn.transaction().map_err(db_error)?;

    for activity in &args.activities {
        if chrono::DateTime::parse_from_rfc3339(&activity.started_at).is_err() {
            return Err(ToolError {
                code: ToolErrorCode::InvalidDateFormat,
                message: format!(
                    "activity {} has non-RFC3339 started_at",
                    activity.activity_id
                ),
            });
        }
        tx.execute(
            "INSERT INTO activities
               (id, user_id, sport, started_at, distance_meters, duration_seconds)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
               sport = ?3, started_at = ?4, distance_meters = ?5, duration_seconds = ?6",
            params![
                activity.activity_id,
                args.user_id,
                activity.sport,
                activity.started_at,
                activity.distance_meters,
                activity.duration_seconds
            ],
        )
        .map_err(db_error)?;
    }

    tx.commit().map_err(db_error)?;
    Ok(json!({ "saved": args.activities.len() }))
}
