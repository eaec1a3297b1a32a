//! SQLite store owned by the data tool server.
//!
//! WAL mode, foreign keys on, and explicit unique indexes. Relations are
//! arena tables traversed by query — no object graph is ever held in
//! memory. The unique index on `(user_id, plan_id, starts_at,
//! session_type)` is what makes plan persistence idempotent: concurrent
//! inserts for the same key collapse to one row.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::Connection;

use pl_domain::tool::{ToolError, ToolErrorCode};

/// Shared handle to the data server's connection.
///
/// Handlers take the lock for the duration of one operation; every
/// multi-row write runs inside a single transaction.
pub struct Database {
    pub conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database and apply the schema.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// In-memory database for tests.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS athletes (
            user_id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL DEFAULT '',
            units TEXT NOT NULL DEFAULT 'miles',
            timezone TEXT NOT NULL DEFAULT 'UTC',
            goal_pace_secs_per_mile INTEGER,
            tags TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS conversations (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'active',
            summary TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL REFERENCES conversations(id),
            sender TEXT NOT NULL,
            content TEXT NOT NULL,
            metadata TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_id, created_at);

        CREATE TABLE IF NOT EXISTS conversation_progress (
            conversation_id TEXT PRIMARY KEY,
            progress TEXT NOT NULL,
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS activities (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            sport TEXT NOT NULL,
            started_at TEXT NOT NULL,
            distance_meters REAL,
            duration_seconds INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_activities_user
            ON activities(user_id, started_at);

        CREATE TABLE IF NOT EXISTS plans (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            plan_type TEXT NOT NULL,
            race_date TEXT,
            season_start TEXT,
            season_end TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_plans_user ON plans(user_id, plan_type);

        CREATE TABLE IF NOT EXISTS planned_sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            plan_id TEXT NOT NULL,
            starts_at TEXT NOT NULL,
            ends_at TEXT,
            sport TEXT NOT NULL,
            session_type TEXT NOT NULL,
            intent TEXT NOT NULL,
            duration_seconds INTEGER,
            distance_meters REAL,
            description_text TEXT NOT NULL DEFAULT '',
            workout_steps TEXT NOT NULL DEFAULT '[]',
            workout_id TEXT,
            status TEXT NOT NULL DEFAULT 'planned',
            tags TEXT NOT NULL DEFAULT '[]'
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_planned_sessions_key
            ON planned_sessions(user_id, plan_id, starts_at, session_type);
        CREATE INDEX IF NOT EXISTS idx_planned_sessions_day
            ON planned_sessions(user_id, starts_at);

        CREATE TABLE IF NOT EXISTS session_links (
            planned_session_id TEXT NOT NULL UNIQUE
                REFERENCES planned_sessions(id),
            activity_id TEXT NOT NULL UNIQUE
                REFERENCES activities(id),
            status TEXT NOT NULL DEFAULT 'proposed',
            method TEXT NOT NULL,
            confidence REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS conflict_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            plan_id TEXT NOT NULL,
            starts_at TEXT NOT NULL,
            reason TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
}

/// Map a SQLite failure to the boundary's `DB_ERROR`.
pub fn db_error(e: rusqlite::Error) -> ToolError {
    ToolError {
        code: ToolErrorCode::DbError,
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_applies_cleanly_twice() {
        let db = Database::open_in_memory().unwrap();
        // Re-applying must be a no-op (IF NOT EXISTS everywhere).
        init_schema(&db.conn.lock()).unwrap();
    }

    #[test]
    fn planned_sessions_unique_key_collapses_duplicates() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.conn.lock();
        let insert = |id: &str| {
            conn.execute(
                "INSERT INTO planned_sessions
                   (id, user_id, plan_id, starts_at, sport, session_type, intent)
                 VALUES (?1, 'u1', 'p1', '2026-04-01T09:00:00Z', 'run', 'easy_run', 'easy')",
                [id],
            )
        };
        insert("s1").unwrap();
        assert!(insert("s2").is_err());
    }
}
