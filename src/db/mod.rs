//! SQLite store shared by every storage module.
//!
//! The connection lives behind a mutex; each storage call locks it for the
//! duration of one statement or transaction. Transient busy/locked errors
//! are retried with exponential backoff at this boundary only.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    #[error("Constraint violation: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Retry attempts for busy/locked statements.
const RETRY_ATTEMPTS: u32 = 3;

/// Initial backoff delay, doubled on each retry.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(25);

/// Shared handle to the SQLite database.
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    /// Open (or create) the database at the given path and apply the schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Lock the connection. A poisoned lock is reported as the store
    /// being unavailable rather than panicking the request.
    pub fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Unavailable("connection lock poisoned".into()))
    }

    /// Run an operation against the connection, retrying transient
    /// busy/locked failures with exponential backoff.
    pub fn with_retry<T, F>(&self, op: &str, mut f: F) -> Result<T>
    where
        F: FnMut(&Connection) -> rusqlite::Result<T>,
    {
        let mut delay = RETRY_BASE_DELAY;

        for attempt in 0..=RETRY_ATTEMPTS {
            let conn = self.lock()?;
            match f(&conn) {
                Ok(value) => return Ok(value),
                Err(err) if is_busy(&err) && attempt == RETRY_ATTEMPTS => {
                    return Err(StorageError::Unavailable(format!(
                        "{op} still busy after {RETRY_ATTEMPTS} retries: {err}"
                    )));
                }
                Err(err) if is_busy(&err) => {
                    drop(conn);
                    log::warn!(
                        "{} hit a busy database (attempt {}/{}), retrying in {:?}",
                        op,
                        attempt + 1,
                        RETRY_ATTEMPTS,
                        delay
                    );
                    std::thread::sleep(delay);
                    delay *= 2;
                }
                Err(err) => return Err(map_sqlite_error(err)),
            }
        }

        unreachable!("retry loop always returns")
    }
}

/// Map a rusqlite error to the storage error kinds the API distinguishes.
pub fn map_sqlite_error(err: rusqlite::Error) -> StorageError {
    match &err {
        rusqlite::Error::SqliteFailure(e, msg)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StorageError::Conflict(msg.clone().unwrap_or_else(|| e.to_string()))
        }
        _ => StorageError::Sqlite(err),
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::DatabaseBusy
                || e.code == rusqlite::ErrorCode::DatabaseLocked
    )
}

/// Parse an optional RFC 3339 column value inside a row-mapping closure.
pub fn timestamp_from_sql(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
        })
        .transpose()
}

/// Parse a JSON array column (stored as TEXT) into a string vector.
pub fn string_list_from_sql(idx: usize, value: Option<String>) -> rusqlite::Result<Vec<String>> {
    match value {
        None => Ok(Vec::new()),
        Some(s) => serde_json::from_str(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
    }
}

/// Serialize a string vector for a JSON TEXT column.
pub fn string_list_to_sql(values: &[String]) -> Result<String> {
    Ok(serde_json::to_string(values)?)
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS categories (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    icon TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS courses (
    course_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    category_id TEXT NOT NULL REFERENCES categories(id),
    subcategory TEXT NOT NULL DEFAULT '',
    level TEXT NOT NULL DEFAULT '',
    difficulty_score INTEGER NOT NULL DEFAULT 0,
    total_lessons INTEGER NOT NULL DEFAULT 0,
    total_practice_tasks INTEGER NOT NULL DEFAULT 0,
    tags TEXT,
    author TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'active',
    language TEXT NOT NULL DEFAULT 'en',
    short_description TEXT NOT NULL DEFAULT '',
    full_description TEXT NOT NULL DEFAULT '',
    cover_image_url TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS lessons (
    id TEXT PRIMARY KEY,
    course_id TEXT NOT NULL REFERENCES courses(course_id),
    position INTEGER NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS blocks (
    id TEXT PRIMARY KEY,
    lesson_id TEXT NOT NULL REFERENCES lessons(id),
    kind TEXT NOT NULL CHECK (kind IN ('theory', 'practice')),
    subtype TEXT,
    position INTEGER NOT NULL,
    title TEXT NOT NULL,
    content TEXT,
    question TEXT,
    options TEXT,
    hints TEXT,
    correct_answer TEXT,
    explanation TEXT,
    sample_answer TEXT,
    answer TEXT,
    visualization_hint TEXT
);

CREATE INDEX IF NOT EXISTS idx_lessons_course ON lessons(course_id, position);
CREATE INDEX IF NOT EXISTS idx_blocks_lesson ON blocks(lesson_id, position);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    name TEXT NOT NULL,
    level INTEGER NOT NULL DEFAULT 1,
    xp INTEGER NOT NULL DEFAULT 0,
    streak INTEGER NOT NULL DEFAULT 0,
    daily_goal INTEGER NOT NULL DEFAULT 5,
    completed_today INTEGER NOT NULL DEFAULT 0,
    selected_categories TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS refresh_tokens (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    token TEXT NOT NULL UNIQUE,
    expires_at TEXT NOT NULL,
    revoked INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS user_courses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    course_id TEXT NOT NULL REFERENCES courses(course_id),
    enrolled_at TEXT NOT NULL,
    UNIQUE(user_id, course_id)
);

CREATE TABLE IF NOT EXISTS user_progress (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    block_id TEXT NOT NULL REFERENCES blocks(id),
    lesson_id TEXT NOT NULL,
    course_id TEXT NOT NULL,
    completed_at TEXT NOT NULL,
    UNIQUE(user_id, block_id)
);

-- One repetition record per (learner, item). The UNIQUE constraint backs
-- the transactional upsert used by the review scheduler.
CREATE TABLE IF NOT EXISTS repetition_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    block_id TEXT NOT NULL REFERENCES blocks(id),
    lesson_id TEXT NOT NULL,
    course_id TEXT NOT NULL,
    last_reviewed_at TEXT,
    next_review_at TEXT,
    interval_days INTEGER NOT NULL DEFAULT 1,
    ease_factor REAL NOT NULL DEFAULT 2.5,
    needs_review INTEGER NOT NULL DEFAULT 0,
    mistake_count INTEGER NOT NULL DEFAULT 0,
    UNIQUE(user_id, block_id)
);

CREATE INDEX IF NOT EXISTS idx_repetition_user ON repetition_records(user_id);

CREATE TABLE IF NOT EXISTS achievements (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    icon TEXT NOT NULL,
    max_progress INTEGER
);

CREATE TABLE IF NOT EXISTS user_achievements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    achievement_id TEXT NOT NULL REFERENCES achievements(id),
    unlocked_at TEXT,
    progress INTEGER NOT NULL DEFAULT 0,
    UNIQUE(user_id, achievement_id)
);

CREATE TABLE IF NOT EXISTS user_statistics (
    user_id INTEGER PRIMARY KEY REFERENCES users(id),
    total_lessons INTEGER NOT NULL DEFAULT 0,
    average_accuracy REAL NOT NULL DEFAULT 0.0,
    days_learning INTEGER NOT NULL DEFAULT 0,
    total_cards_reviewed INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT
);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_applies_cleanly() {
        let db = Db::open_in_memory().unwrap();
        let conn = db.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(count >= 10);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("learnify.db");
        let db = Db::open(&path).unwrap();
        drop(db);
        assert!(path.exists());
    }

    #[test]
    fn test_constraint_violation_maps_to_conflict() {
        let db = Db::open_in_memory().unwrap();
        db.with_retry("insert category", |conn| {
            conn.execute(
                "INSERT INTO categories (id, name, icon) VALUES ('health', 'Health', 'heart')",
                [],
            )
        })
        .unwrap();

        let err = db
            .with_retry("insert category", |conn| {
                conn.execute(
                    "INSERT INTO categories (id, name, icon) VALUES ('health', 'Health', 'heart')",
                    [],
                )
            })
            .unwrap_err();

        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[test]
    fn test_timestamp_round_trip() {
        let now = Utc::now();
        let parsed = timestamp_from_sql(0, Some(now.to_rfc3339())).unwrap();
        assert_eq!(parsed, Some(now));
        assert_eq!(timestamp_from_sql(0, None).unwrap(), None);
    }
}
