//! Storage operations for repetition records.
//!
//! The repetition store collaborator of the training core. Uniqueness of
//! (user, block) is enforced by the schema; writes go through a single
//! `INSERT .. ON CONFLICT DO UPDATE` so a concurrent first answer for
//! the same pair cannot produce duplicate rows or lost updates.

use rusqlite::{params, Row};

use crate::db::{timestamp_from_sql, Db, Result};

use super::models::RepetitionRecord;

#[derive(Clone)]
pub struct RepetitionStorage {
    db: Db,
}

impl RepetitionStorage {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// The learner's record for one block, if it exists.
    pub fn get_record(&self, user_id: i64, block_id: &str) -> Result<Option<RepetitionRecord>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM repetition_records WHERE user_id = ?1 AND block_id = ?2"
        ))?;
        let mut rows = stmt.query_map(params![user_id, block_id], row_to_record)?;
        match rows.next() {
            Some(record) => Ok(Some(record?)),
            None => Ok(None),
        }
    }

    /// The learner's full repetition set, ordered by record id. One
    /// query; the selector classifies the rows in memory instead of
    /// issuing per-tier lookups.
    pub fn list_records(&self, user_id: i64) -> Result<Vec<RepetitionRecord>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM repetition_records WHERE user_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![user_id], row_to_record)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Insert or update the record for `(record.user_id, record.block_id)`
    /// in one statement, then return the persisted row.
    pub fn upsert_record(&self, record: &RepetitionRecord) -> Result<RepetitionRecord> {
        let last_reviewed = record.last_reviewed_at.map(|t| t.to_rfc3339());
        let next_review = record.next_review_at.map(|t| t.to_rfc3339());

        self.db.with_retry("upsert repetition record", |conn| {
            conn.execute(
                "INSERT INTO repetition_records
                     (user_id, block_id, lesson_id, course_id, last_reviewed_at, next_review_at,
                      interval_days, ease_factor, needs_review, mistake_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(user_id, block_id) DO UPDATE SET
                     last_reviewed_at = excluded.last_reviewed_at,
                     next_review_at = excluded.next_review_at,
                     interval_days = excluded.interval_days,
                     ease_factor = excluded.ease_factor,
                     needs_review = excluded.needs_review,
                     mistake_count = excluded.mistake_count",
                params![
                    record.user_id,
                    record.block_id,
                    record.lesson_id,
                    record.course_id,
                    last_reviewed,
                    next_review,
                    record.interval_days,
                    record.ease_factor,
                    record.needs_review,
                    record.mistake_count,
                ],
            )
        })?;

        self.get_record(record.user_id, &record.block_id)?
            .ok_or_else(|| {
                crate::db::StorageError::Unavailable("upserted record vanished".to_string())
            })
    }

    /// Number of records the learner has touched at all.
    pub fn count_records(&self, user_id: i64) -> Result<i64> {
        let conn = self.db.lock()?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM repetition_records WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?)
    }

    /// Number of records the learner has never missed.
    pub fn count_clean_records(&self, user_id: i64) -> Result<i64> {
        let conn = self.db.lock()?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM repetition_records WHERE user_id = ?1 AND mistake_count = 0",
            params![user_id],
            |row| row.get(0),
        )?)
    }
}

const RECORD_COLUMNS: &str = "id, user_id, block_id, lesson_id, course_id, last_reviewed_at, \
    next_review_at, interval_days, ease_factor, needs_review, mistake_count";

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<RepetitionRecord> {
    Ok(RepetitionRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        block_id: row.get(2)?,
        lesson_id: row.get(3)?,
        course_id: row.get(4)?,
        last_reviewed_at: timestamp_from_sql(5, row.get(5)?)?,
        next_review_at: timestamp_from_sql(6, row.get(6)?)?,
        interval_days: row.get(7)?,
        ease_factor: row.get(8)?,
        needs_review: row.get(9)?,
        mistake_count: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::storage::tests::seed_catalog;
    use crate::training::{submit_answer, training_cards};
    use crate::users::storage::tests::seed_user;
    use chrono::{Duration, Utc};

    #[test]
    fn test_record_created_lazily_on_first_answer() {
        let db = Db::open_in_memory().unwrap();
        let catalog = seed_catalog(&db, 1);
        let user = seed_user(&db);
        let repetition = RepetitionStorage::new(db);
        let now = Utc::now();

        assert!(repetition.get_record(user, "block-0").unwrap().is_none());

        let record =
            submit_answer(&repetition, user, "block-0", "lesson-1", "course-1", true, now).unwrap();
        assert!(record.id > 0);
        assert_eq!(record.interval_days, 1);
        assert_eq!(record.ease_factor, 2.5);
        assert_eq!(record.next_review_at, Some(now + Duration::days(1)));
        assert!(!record.needs_review);

        drop(catalog);
    }

    #[test]
    fn test_second_answer_updates_same_row() {
        let db = Db::open_in_memory().unwrap();
        let _catalog = seed_catalog(&db, 1);
        let user = seed_user(&db);
        let repetition = RepetitionStorage::new(db);
        let now = Utc::now();

        let first =
            submit_answer(&repetition, user, "block-0", "lesson-1", "course-1", false, now)
                .unwrap();
        let second = submit_answer(
            &repetition,
            user,
            "block-0",
            "lesson-1",
            "course-1",
            true,
            now + Duration::days(1),
        )
        .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(repetition.count_records(user).unwrap(), 1);
        assert_eq!(second.mistake_count, 1);
        assert!(!second.needs_review);
        assert_eq!(repetition.count_clean_records(user).unwrap(), 0);
    }

    #[test]
    fn test_training_cards_mixes_tiers_from_store() {
        let db = Db::open_in_memory().unwrap();
        let catalog = seed_catalog(&db, 6);
        let user = seed_user(&db);
        let repetition = RepetitionStorage::new(db);
        let now = Utc::now();

        // block-0: answered wrong -> flagged tier.
        submit_answer(&repetition, user, "block-0", "lesson-1", "course-1", false, now).unwrap();
        // block-1: answered right a day ago -> due tier now.
        submit_answer(
            &repetition,
            user,
            "block-1",
            "lesson-1",
            "course-1",
            true,
            now - Duration::days(1),
        )
        .unwrap();
        // block-2: answered right just now -> not due, not fresh.
        submit_answer(&repetition, user, "block-2", "lesson-1", "course-1", true, now).unwrap();

        let cards = training_cards(&repetition, &catalog, user, 10, now).unwrap();
        let ids: Vec<&str> = cards.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["block-0", "block-1", "block-3", "block-4", "block-5"]);
    }

    #[test]
    fn test_records_are_per_learner() {
        let db = Db::open_in_memory().unwrap();
        let _catalog = seed_catalog(&db, 1);
        let user = seed_user(&db);
        let repetition = RepetitionStorage::new(db);
        let now = Utc::now();

        submit_answer(&repetition, user, "block-0", "lesson-1", "course-1", true, now).unwrap();
        assert!(repetition.list_records(user + 1).unwrap().is_empty());
    }
}
