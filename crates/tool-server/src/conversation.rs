//! Conversation tools: history, slot progress, summary.

use chrono::{Duration, Utc};
use rusqlite::{params, OptionalExtension};
use serde::Deserialize;
use serde_json::{json, Value};

use pl_domain::conversation::Progress;
use pl_domain::tool::{ToolError, ToolErrorCode};

use crate::db::{db_error, Database};

const MAX_CONTEXT_LIMIT: u64 = 500;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// load_context
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct LoadContextArgs {
    pub conversation_id: String,
    pub limit: u64,
}

/// Return the most recent `limit` messages (ascending) plus the rolling
/// summary. An unknown conversation yields empty history, not an error.
pub fn load_context(db: &Database, args: LoadContextArgs) -> Result<Value, ToolError> {
    if args.limit == 0 || args.limit > MAX_CONTEXT_LIMIT {
        return Err(ToolError {
            code: ToolErrorCode::InvalidLimit,
            message: format!("limit must be in 1..={MAX_CONTEXT_LIMIT}"),
        });
    }

    let conn = db.conn.lock();

    let summary: Option<String> = conn
        .query_row(
            "SELECT summary FROM conversations WHERE id = ?1",
            [&args.conversation_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_error)?
        .flatten();

    let mut stmt = conn
        .prepare(
            "SELECT id, sender, content, metadata, created_at
             FROM (SELECT * FROM messages
                   WHERE conversation_id = ?1
                   ORDER BY created_at DESC LIMIT ?2)
             ORDER BY created_at ASC",
        )
        .map_err(db_error)?;

    let messages: Vec<Value> = stmt
        .query_map(params![args.conversation_id, args.limit as i64], |row| {
            let metadata: Option<String> = row.get(3)?;
            Ok(json!({
                "id": row.get::<_, String>(0)?,
                "conversation_id": args.conversation_id.clone(),
                "sender": row.get::<_, String>(1)?,
                "content": row.get::<_, String>(2)?,
                "metadata": metadata
                    .and_then(|m| serde_json::from_str::<Value>(&m).ok()),
                "created_at": row.get::<_, String>(4)?,
            }))
        })
        .map_err(db_error)?
        .collect::<Result<_, _>>()
        .map_err(db_error)?;

    Ok(json!({ "messages": messages, "summary": summary }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// save_context
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct SaveContextArgs {
    pub conversation_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub model_name: String,
    pub user_message: String,
    pub assistant_message: String,
}

/// Append a user/assistant message pair. Creates the conversation row on
/// first write. The assistant timestamp is nudged after the user's so
/// `created_at` stays strictly increasing.
pub fn save_context(db: &Database, args: SaveContextArgs) -> Result<Value, ToolError> {
    if args.assistant_message.trim().is_empty() {
        return Err(ToolError {
            code: ToolErrorCode::InvalidMessage,
            message: "assistant message must not be empty".into(),
        });
    }

    let mut conn = db.conn.lock();
    let tx = conn.transaction().map_err(db_error)?;

    let now = Utc::now();
    let now_s = now.to_rfc3339();

    tx.execute(
        "INSERT INTO conversations (id, user_id, title, status, created_at, updated_at)
         VALUES (?1, ?2, '', 'active', ?3, ?3)
         ON CONFLICT(id) DO UPDATE SET updated_at = ?3",
        params![args.conversation_id, args.user_id, now_s],
    )
    .map_err(db_error)?;

    let mut insert = |sender: &str, content: &str, at: &str| {
        tx.execute(
            "INSERT INTO messages (id, conversation_id, sender, content, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, NULL, ?5)",
            params![
                uuid::Uuid::new_v4().to_string(),
                args.conversation_id,
                sender,
                content,
                at
            ],
        )
    };

    insert("user", &args.user_message, &now_s).map_err(db_error)?;
    let assistant_at = (now + Duration::milliseconds(1)).to_rfc3339();
    insert("assistant", &args.assistant_message, &assistant_at).map_err(db_error)?;

    tx.commit().map_err(db_error)?;
    Ok(json!({ "saved": 2 }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// load_progress / save_progress
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct LoadProgressArgs {
    pub conversation_id: String,
}

/// Load progress; a conversation with no progress row yields default
/// progress at version 0.
pub fn load_progress(db: &Database, args: LoadProgressArgs) -> Result<Value, ToolError> {
    let conn = db.conn.lock();
    let row: Option<(String, i64)> = conn
        .query_row(
            "SELECT progress, version FROM conversation_progress WHERE conversation_id = ?1",
            [&args.conversation_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(db_error)?;

    match row {
        Some((raw, version)) => {
            let progress: Value = serde_json::from_str(&raw).map_err(|e| ToolError {
                code: ToolErrorCode::DbError,
                message: format!("stored progress is corrupt: {e}"),
            })?;
            Ok(json!({ "progress": progress, "version": version }))
        }
        None => Ok(json!({
            "progress": serde_json::to_value(Progress::default()).unwrap_or(Value::Null),
            "version": 0,
        })),
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveProgressArgs {
    pub conversation_id: String,
    pub progress: Progress,
    /// The version the caller loaded; the write fails when it is stale.
    pub version: u64,
}

/// Single-writer progress save guarded by the optimistic version field.
pub fn save_progress(db: &Database, args: SaveProgressArgs) -> Result<Value, ToolError> {
    if let Some(violation) = args.progress.check() {
        return Err(ToolError {
            code: ToolErrorCode::InvalidInput,
            message: format!("progress invariant violated: {violation}"),
        });
    }

    let raw = serde_json::to_string(&args.progress).map_err(|e| ToolError {
        code: ToolErrorCode::InvalidInput,
        message: format!("unserializable progress: {e}"),
    })?;

    let conn = db.conn.lock();
    let stored: Option<i64> = conn
        .query_row(
            "SELECT version FROM conversation_progress WHERE conversation_id = ?1",
            [&args.conversation_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_error)?;

    let current = stored.unwrap_or(0) as u64;
    if current != args.version {
        return Err(ToolError {
            code: ToolErrorCode::InvalidInput,
            message: format!(
                "stale progress version: stored {current}, caller had {}",
                args.version
            ),
        });
    }

    let next = current + 1;
    conn.execute(
        "INSERT INTO conversation_progress (conversation_id, progress, version, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(conversation_id) DO UPDATE
           SET progress = ?2, version = ?3, updated_at = ?4",
        params![args.conversation_id, raw, next as i64, Utc::now().to_rfc3339()],
    )
    .map_err(db_error)?;

    Ok(json!({ "version": next }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// save_summary
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct SaveSummaryArgs {
    pub conversation_id: String,
    pub summary: String,
}

pub fn save_summary(db: &Database, args: SaveSummaryArgs) -> Result<Value, ToolError> {
    let conn = db.conn.lock();
    let updated = conn
        .execute(
            "UPDATE conversations SET summary = ?2, updated_at = ?3 WHERE id = ?1",
            params![args.conversation_id, args.summary, Utc::now().to_rfc3339()],
        )
        .map_err(db_error)?;

    if updated == 0 {
        return Err(ToolError {
            code: ToolErrorCode::InvalidInput,
            message: format!("unknown conversation {}", args.conversation_id),
        });
    }
    Ok(json!({ "saved": true }))
}
