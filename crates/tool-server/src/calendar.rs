//! Calendar persistence tools — idempotent plan writes, intent-preserving
//! day modification, and session-link bookkeeping.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Transaction};
use serde::Deserialize;
use serde_json::{json, Value};

use pl_domain::session::{Intent, MaterializedSession};
use pl_domain::tool::{ToolError, ToolErrorCode};

use crate::db::{db_error, Database};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// save_planned_sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct SavePlannedSessionsArgs {
    pub user_id: String,
    pub plan_id: String,
    #[serde(default)]
    pub plan_type: String,
    pub sessions: Vec<MaterializedSession>,
}

/// Persist a plan's sessions in one transaction (all-or-nothing per
/// plan_id).
///
/// Idempotency key: `(user_id, plan_id, starts_at, session_type)` — a
/// matching row is UPDATEd, anything else INSERTed. A pre-existing
/// *completed* session on the same day is never overwritten: a conflict
/// record is written and the incoming session skipped.
pub fn save_planned_sessions(
    db: &Database,
    args: SavePlannedSessionsArgs,
) -> Result<Value, ToolError> {
    for session in &args.sessions {
        if !session.has_one_primary_metric() {
            return Err(ToolError {
                code: ToolErrorCode::InvalidSessionData,
                message: format!(
                    "session at {} must carry exactly one primary metric",
                    session.starts_at
                ),
            });
        }
    }

    let mut conn = db.conn.lock();
    let tx = conn.transaction().map_err(db_error)?;

    let mut inserted = 0usize;
    let mut updated = 0usize;
    let mut conflicts = 0usize;

    for session in &args.sessions {
        let starts_at = session.starts_at.to_rfc3339();
        let day = session.starts_at.date_naive().to_string();

        if completed_session_on_day(&tx, &args.user_id, &day)? {
            tx.execute(
                "INSERT INTO conflict_records (user_id, plan_id, starts_at, reason, created_at)
                 VALUES (?1, ?2, ?3, 'completed session already on this day', ?4)",
                params![args.user_id, args.plan_id, starts_at, Utc::now().to_rfc3339()],
            )
            .map_err(db_error)?;
            conflicts += 1;
            continue;
        }

        let steps = serde_json::to_string(&session.workout_steps).map_err(|e| ToolError {
            code: ToolErrorCode::InvalidSessionData,
            message: format!("unserializable workout steps: {e}"),
        })?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT id FROM planned_sessions
                 WHERE user_id = ?1 AND plan_id = ?2 AND starts_at = ?3 AND session_type = ?4",
                params![args.user_id, args.plan_id, starts_at, session.session_type],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error)?;

        match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE planned_sessions SET
                       sport = ?2, intent = ?3, duration_seconds = ?4,
                       distance_meters = ?5, description_text = ?6, workout_steps = ?7
                     WHERE id = ?1",
                    params![
                        id,
                        session.sport,
                        session.intent.as_str(),
                        session.duration_seconds,
                        session.distance_meters,
                        session.description_text,
                        steps
                    ],
                )
                .map_err(db_error)?;
                updated += 1;
            }
            None => {
                tx.execute(
                    "INSERT INTO planned_sessions
                       (id, user_id, plan_id, starts_at, sport, session_type, intent,
                        duration_seconds, distance_meters, description_text, workout_steps)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    params![
                        uuid::Uuid::new_v4().to_string(),
                        args.user_id,
                        args.plan_id,
                        starts_at,
                        session.sport,
                        session.session_type,
                        session.intent.as_str(),
                        session.duration_seconds,
                        session.distance_meters,
                        session.description_text,
                        steps
                    ],
                )
                .map_err(db_error)?;
                inserted += 1;
            }
        }
    }

    tx.commit().map_err(db_error)?;
    Ok(json!({ "inserted": inserted, "updated": updated, "conflicts": conflicts }))
}

fn completed_session_on_day(
    tx: &Transaction<'_>,
    user_id: &str,
    day: &str,
) -> Result<bool, ToolError> {
    let count: i64 = tx
        .query_row(
            "SELECT COUNT(*) FROM planned_sessions
             WHERE user_id = ?1 AND status = 'completed' AND substr(starts_at, 1, 10) = ?2",
            params![user_id, day],
            |row| row.get(0),
        )
        .map_err(db_error)?;
    Ok(count > 0)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// modify_planned_session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct ModifyPlannedSessionArgs {
    pub session_id: String,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub distance_meters: Option<f64>,
    #[serde(default)]
    pub description_text: Option<String>,
    #[serde(default)]
    pub intent: Option<Intent>,
    #[serde(default)]
    pub explicit_intent_change: bool,
}

/// Modify one planned session. The MODIFY rule: `intent` is copied from
/// the stored row verbatim unless `explicit_intent_change` is set.
pub fn modify_planned_session(
    db: &Database,
    args: ModifyPlannedSessionArgs,
) -> Result<Value, ToolError> {
    let conn = db.conn.lock();

    let existing: Option<(String, Option<u32>, Option<f64>, String)> = conn
        .query_row(
            "SELECT intent, duration_seconds, distance_meters, description_text
             FROM planned_sessions WHERE id = ?1",
            [&args.session_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()
        .map_err(db_error)?;

    let Some((stored_intent, stored_duration, stored_distance, stored_text)) = existing else {
        return Err(ToolError {
            code: ToolErrorCode::InvalidInput,
            message: format!("unknown planned session {}", args.session_id),
        });
    };

    let intent = if args.explicit_intent_change {
        args.intent.map(|i| i.as_str().to_owned()).ok_or_else(|| ToolError {
            code: ToolErrorCode::InvalidInput,
            message: "explicit_intent_change requires an intent".into(),
        })?
    } else {
        stored_intent
    };

    // A metric in the request replaces the stored pair; otherwise the
    // stored metrics stand.
    let (duration, distance) = match (args.duration_seconds, args.distance_meters) {
        (Some(_), Some(_)) => {
            return Err(ToolError {
                code: ToolErrorCode::InvalidSessionData,
                message: "a session carries exactly one primary metric".into(),
            });
        }
        (Some(d), None) => (Some(d), None),
        (None, Some(m)) => (None, Some(m)),
        (None, None) => (stored_duration, stored_distance),
    };

    let text = args.description_text.unwrap_or(stored_text);

    conn.execute(
        "UPDATE planned_sessions SET
           intent = ?2, duration_seconds = ?3, distance_meters = ?4, description_text = ?5
         WHERE id = ?1",
        params![args.session_id, intent, duration, distance, text],
    )
    .map_err(db_error)?;

    Ok(json!({ "modified": true, "intent": intent }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// modify_day / modify_week
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct ModifyDayArgs {
    pub user_id: String,
    /// ISO calendar day the modification targets.
    pub day: String,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub distance_meters: Option<f64>,
    #[serde(default)]
    pub description_text: Option<String>,
    #[serde(default)]
    pub intent: Option<Intent>,
    #[serde(default)]
    pub explicit_intent_change: bool,
}

/// Apply a modification to the planned (non-completed) sessions of one
/// calendar day, routed through [`modify_planned_session`] so the
/// intent-preservation rule holds in one place.
pub fn modify_day(db: &Database, args: ModifyDayArgs) -> Result<Value, ToolError> {
    if args.day.parse::<chrono::NaiveDate>().is_err() {
        return Err(ToolError {
            code: ToolErrorCode::InvalidDateFormat,
            message: format!("expected ISO day, got {:?}", args.day),
        });
    }

    let ids: Vec<String> = {
        let conn = db.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id FROM planned_sessions
                 WHERE user_id = ?1 AND status != 'completed'
                   AND substr(starts_at, 1, 10) = ?2
                 ORDER BY starts_at",
            )
            .map_err(db_error)?;
        let rows = stmt
            .query_map(params![args.user_id, args.day], |r| r.get(0))
            .map_err(db_error)?;
        rows.collect::<Result<_, _>>().map_err(db_error)?
    };

    if ids.is_empty() {
        return Err(ToolError {
            code: ToolErrorCode::InvalidInput,
            message: format!("no planned session on {}", args.day),
        });
    }

    let mut modified = 0usize;
    for id in ids {
        modify_planned_session(
            db,
            ModifyPlannedSessionArgs {
                session_id: id,
                duration_seconds: args.duration_seconds,
                distance_meters: args.distance_meters,
                description_text: args.description_text.clone(),
                intent: args.intent,
                explicit_intent_change: args.explicit_intent_change,
            },
        )?;
        modified += 1;
    }

    Ok(json!({ "modified": modified }))
}

#[derive(Debug, Deserialize)]
pub struct ModifyWeekArgs {
    pub user_id: String,
    /// Monday of the week to modify (ISO day).
    pub week_start: String,
    /// Distance scale factor applied to every running session.
    pub scale: f64,
}

/// Scale a week's planned distances (e.g. cut a week after illness).
/// Intent is untouched by construction.
pub fn modify_week(db: &Database, args: ModifyWeekArgs) -> Result<Value, ToolError> {
    let Ok(start) = args.week_start.parse::<chrono::NaiveDate>() else {
        return Err(ToolError {
            code: ToolErrorCode::InvalidDateFormat,
            message: format!("expected ISO day, got {:?}", args.week_start),
        });
    };
    if !(0.1..=2.0).contains(&args.scale) {
        return Err(ToolError {
            code: ToolErrorCode::InvalidInput,
            message: "scale must be in [0.1, 2.0]".into(),
        });
    }
    let end = start + chrono::Duration::days(7);

    let conn = db.conn.lock();
    let modified = conn
        .execute(
            "UPDATE planned_sessions
             SET distance_meters = distance_meters * ?3
             WHERE user_id = ?1 AND status != 'completed'
               AND distance_meters IS NOT NULL
               AND substr(starts_at, 1, 10) >= ?2
               AND substr(starts_at, 1, 10) < ?4",
            params![args.user_id, start.to_string(), args.scale, end.to_string()],
        )
        .map_err(db_error)?;

    Ok(json!({ "modified": modified }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// link_session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct LinkSessionArgs {
    pub planned_session_id: String,
    pub activity_id: String,
    pub method: String,
    pub confidence: f64,
}

/// Create a proposed session↔activity link. Unique constraints on both
/// columns keep links 1:1 in each direction.
pub fn link_session(db: &Database, args: LinkSessionArgs) -> Result<Value, ToolError> {
    if !(0.0..=1.0).contains(&args.confidence) {
        return Err(ToolError {
            code: ToolErrorCode::InvalidInput,
            message: "confidence must be in [0, 1]".into(),
        });
    }

    let conn = db.conn.lock();
    let result = conn.execute(
        "INSERT INTO session_links
           (planned_session_id, activity_id, status, method, confidence)
         VALUES (?1, ?2, 'proposed', ?3, ?4)",
        params![args.planned_session_id, args.activity_id, args.method, args.confidence],
    );

    match result {
        Ok(_) => Ok(json!({ "linked": true })),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(ToolError {
                code: ToolErrorCode::InvalidInput,
                message: "planned session or activity is already linked".into(),
            })
        }
        Err(e) => Err(db_error(e)),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// record_conflict
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct RecordConflictArgs {
    pub user_id: String,
    pub plan_id: String,
    pub starts_at: String,
    pub reason: String,
}

pub fn record_conflict(db: &Database, args: RecordConflictArgs) -> Result<Value, ToolError> {
    let conn = db.conn.lock();
    conn.execute(
        "INSERT INTO conflict_records (user_id, plan_id, starts_at, reason, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            args.user_id,
            args.plan_id,
            args.starts_at,
            args.reason,
            Utc::now().to_rfc3339()
        ],
    )
    .map_err(db_error)?;
    Ok(json!({ "recorded": true }))
}
