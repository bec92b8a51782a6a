//! Storage operations for achievements

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::db::{timestamp_from_sql, Db, Result};

use super::models::{Achievement, AchievementView, UserAchievement};

#[derive(Clone)]
pub struct AchievementStorage {
    db: Db,
}

impl AchievementStorage {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Seed the built-in achievement catalog. Existing rows are kept.
    pub fn ensure_catalog(&self) -> Result<()> {
        self.db.with_retry("seed achievements", |conn| {
            let mut stmt = conn.prepare(
                "INSERT OR IGNORE INTO achievements (id, title, description, icon, max_progress)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for &(id, title, description, icon, max_progress) in DEFAULT_CATALOG {
                stmt.execute(params![id, title, description, icon, max_progress])?;
            }
            Ok(())
        })
    }

    pub fn list_achievements(&self) -> Result<Vec<Achievement>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, description, icon, max_progress FROM achievements ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Achievement {
                id: row.get(0)?,
                title: row.get(1)?,
                description: row.get(2)?,
                icon: row.get(3)?,
                max_progress: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get_user_achievement(
        &self,
        user_id: i64,
        achievement_id: &str,
    ) -> Result<Option<UserAchievement>> {
        let conn = self.db.lock()?;
        conn.query_row(
            "SELECT user_id, achievement_id, unlocked_at, progress
             FROM user_achievements WHERE user_id = ?1 AND achievement_id = ?2",
            params![user_id, achievement_id],
            |row| {
                Ok(UserAchievement {
                    user_id: row.get(0)?,
                    achievement_id: row.get(1)?,
                    unlocked_at: timestamp_from_sql(2, row.get(2)?)?,
                    progress: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(Into::into)
    }

    /// Write progress (and possibly the unlock timestamp) for one
    /// (user, achievement) pair. An unlock timestamp, once set, is
    /// never cleared.
    pub fn upsert_user_achievement(
        &self,
        user_id: i64,
        achievement_id: &str,
        progress: i64,
        unlocked_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let unlocked = unlocked_at.map(|t| t.to_rfc3339());
        self.db.with_retry("upsert user achievement", |conn| {
            conn.execute(
                "INSERT INTO user_achievements (user_id, achievement_id, progress, unlocked_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, achievement_id) DO UPDATE SET
                     progress = excluded.progress,
                     unlocked_at = COALESCE(user_achievements.unlocked_at, excluded.unlocked_at)",
                params![user_id, achievement_id, progress, unlocked],
            )
        })?;
        Ok(())
    }

    /// Catalog joined with the user's unlock state.
    pub fn list_views(&self, user_id: i64) -> Result<Vec<AchievementView>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(
            "SELECT a.id, a.title, a.description, a.icon, a.max_progress,
                    ua.unlocked_at, ua.progress
             FROM achievements a
             LEFT JOIN user_achievements ua
                 ON ua.achievement_id = a.id AND ua.user_id = ?1
             ORDER BY a.id",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            let unlocked_at = timestamp_from_sql(5, row.get(5)?)?;
            Ok(AchievementView {
                id: row.get(0)?,
                title: row.get(1)?,
                description: row.get(2)?,
                icon: row.get(3)?,
                max_progress: row.get(4)?,
                unlocked: unlocked_at.is_some(),
                unlocked_at,
                progress: row.get::<_, Option<i64>>(6)?.unwrap_or(0),
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

/// Built-in achievement catalog, mirroring the product's fixed set.
const DEFAULT_CATALOG: &[(&str, &str, &str, &str, Option<i64>)] = &[
    ("all_courses", "Completionist", "Touch every course", "trophy", None),
    ("excellent", "Excellent", "Keep 90% of cards mistake-free", "star", Some(100)),
    ("fast_start", "Fast start", "Complete 5 lessons", "rocket", Some(5)),
    ("first_step", "First step", "Complete your first block", "footprints", Some(1)),
    ("hundred_cards", "Century", "Review 100 cards", "cards", Some(100)),
    ("perfect", "Perfect", "Keep every card mistake-free", "diamond", Some(100)),
    ("persistence", "Persistence", "Keep a 30 day streak", "calendar", Some(30)),
    ("seven_days", "Seven days", "Keep a 7 day streak", "flame", Some(7)),
];
