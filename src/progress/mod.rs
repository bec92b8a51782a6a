//! Completion log: which blocks a learner has finished.
//!
//! Separate from repetition state on purpose. A repetition record says
//! when to show a block again; a progress entry says it was completed
//! once. The achievement evaluator reads both.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::{timestamp_from_sql, Db, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub block_id: String,
    pub lesson_id: String,
    pub course_id: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ProgressStorage {
    db: Db,
}

impl ProgressStorage {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn list(&self, user_id: i64) -> Result<Vec<ProgressEntry>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(
            "SELECT block_id, lesson_id, course_id, completed_at
             FROM user_progress WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id], row_to_entry)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Record a completed block. Idempotent: a block already marked for
    /// this learner is left untouched and reported as `false`.
    pub fn mark_block(
        &self,
        user_id: i64,
        block_id: &str,
        lesson_id: &str,
        course_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let completed_at = now.to_rfc3339();
        let inserted = self.db.with_retry("mark block completed", |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO user_progress
                     (user_id, block_id, lesson_id, course_id, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![user_id, block_id, lesson_id, course_id, completed_at],
            )
        })?;
        Ok(inserted > 0)
    }

    /// Mark every block of a lesson completed in one transaction.
    pub fn mark_lesson(
        &self,
        user_id: i64,
        lesson_id: &str,
        course_id: &str,
        block_ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let completed_at = now.to_rfc3339();
        self.db.with_retry("mark lesson completed", |conn| {
            let tx = conn.unchecked_transaction()?;
            let mut inserted = 0;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO user_progress
                         (user_id, block_id, lesson_id, course_id, completed_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for block_id in block_ids {
                    inserted +=
                        stmt.execute(params![user_id, block_id, lesson_id, course_id, completed_at])?;
                }
            }
            tx.commit()?;
            Ok(inserted)
        })
    }

    pub fn count_blocks(&self, user_id: i64) -> Result<i64> {
        let conn = self.db.lock()?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM user_progress WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?)
    }

    pub fn count_distinct_lessons(&self, user_id: i64) -> Result<i64> {
        let conn = self.db.lock()?;
        Ok(conn.query_row(
            "SELECT COUNT(DISTINCT lesson_id) FROM user_progress WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?)
    }

    pub fn count_distinct_courses(&self, user_id: i64) -> Result<i64> {
        let conn = self.db.lock()?;
        Ok(conn.query_row(
            "SELECT COUNT(DISTINCT course_id) FROM user_progress WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?)
    }

    /// Courses any learner has touched. The all-courses achievement
    /// compares against this rather than the catalog, matching the
    /// original evaluator.
    pub fn count_courses_touched(&self) -> Result<i64> {
        let conn = self.db.lock()?;
        Ok(conn.query_row(
            "SELECT COUNT(DISTINCT course_id) FROM user_progress",
            [],
            |row| row.get(0),
        )?)
    }
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<ProgressEntry> {
    let completed_at = timestamp_from_sql(3, row.get(3)?)?.ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            "missing completed_at".into(),
        )
    })?;
    Ok(ProgressEntry {
        block_id: row.get(0)?,
        lesson_id: row.get(1)?,
        course_id: row.get(2)?,
        completed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::storage::tests::seed_catalog;
    use crate::users::storage::tests::seed_user;

    #[test]
    fn test_mark_block_is_idempotent() {
        let db = Db::open_in_memory().unwrap();
        let _catalog = seed_catalog(&db, 2);
        let user = seed_user(&db);
        let progress = ProgressStorage::new(db);
        let now = Utc::now();

        assert!(progress.mark_block(user, "block-0", "lesson-1", "course-1", now).unwrap());
        assert!(!progress.mark_block(user, "block-0", "lesson-1", "course-1", now).unwrap());
        assert_eq!(progress.count_blocks(user).unwrap(), 1);
    }

    #[test]
    fn test_mark_lesson_skips_already_completed() {
        let db = Db::open_in_memory().unwrap();
        let _catalog = seed_catalog(&db, 3);
        let user = seed_user(&db);
        let progress = ProgressStorage::new(db);
        let now = Utc::now();

        progress.mark_block(user, "block-1", "lesson-1", "course-1", now).unwrap();

        let blocks: Vec<String> = (0..3).map(|i| format!("block-{i}")).collect();
        let inserted = progress
            .mark_lesson(user, "lesson-1", "course-1", &blocks, now)
            .unwrap();

        assert_eq!(inserted, 2);
        assert_eq!(progress.count_blocks(user).unwrap(), 3);
        assert_eq!(progress.count_distinct_lessons(user).unwrap(), 1);
        assert_eq!(progress.count_distinct_courses(user).unwrap(), 1);

        let entries = progress.list(user).unwrap();
        assert_eq!(entries.len(), 3);
    }
}
