//! Storage operations for users, statistics and refresh tokens

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    string_list_from_sql, string_list_to_sql, timestamp_from_sql, Db, Result, StorageError,
};

use super::models::{User, UserStatistics, UserUpdate};

#[derive(Clone)]
pub struct UserStorage {
    db: Db,
}

impl UserStorage {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create a user account. Fails with `Conflict` when the email is
    /// already registered.
    pub fn create_user(&self, email: &str, password_hash: &str, name: &str) -> Result<User> {
        let now = Utc::now().to_rfc3339();
        let categories = string_list_to_sql(&[])?;

        let id = self.db.with_retry("create user", |conn| {
            conn.execute(
                "INSERT INTO users (email, password_hash, name, selected_categories,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![email, password_hash, name, categories, now],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        self.get_by_id(id)
    }

    pub fn get_by_id(&self, user_id: i64) -> Result<User> {
        let conn = self.db.lock()?;
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![user_id],
            row_to_user,
        )
        .map_err(|err| match err {
            rusqlite::Error::QueryReturnedNoRows => {
                StorageError::NotFound("user", user_id.to_string())
            }
            other => other.into(),
        })
    }

    pub fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.db.lock()?;
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            row_to_user,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Apply a partial profile update and return the new state.
    pub fn update_user(&self, user_id: i64, update: &UserUpdate) -> Result<User> {
        let mut user = self.get_by_id(user_id)?;

        if let Some(name) = &update.name {
            user.name = name.clone();
        }
        if let Some(level) = update.level {
            user.level = level;
        }
        if let Some(xp) = update.xp {
            user.xp = xp;
        }
        if let Some(streak) = update.streak {
            user.streak = streak;
        }
        if let Some(daily_goal) = update.daily_goal {
            user.daily_goal = daily_goal;
        }
        if let Some(completed_today) = update.completed_today {
            user.completed_today = completed_today;
        }
        if let Some(categories) = &update.selected_categories {
            user.selected_categories = categories.clone();
        }

        let categories = string_list_to_sql(&user.selected_categories)?;
        let updated_at = Utc::now().to_rfc3339();

        self.db.with_retry("update user", |conn| {
            conn.execute(
                "UPDATE users SET name = ?1, level = ?2, xp = ?3, streak = ?4, daily_goal = ?5,
                     completed_today = ?6, selected_categories = ?7, updated_at = ?8
                 WHERE id = ?9",
                params![
                    user.name,
                    user.level,
                    user.xp,
                    user.streak,
                    user.daily_goal,
                    user.completed_today,
                    categories,
                    updated_at,
                    user_id,
                ],
            )
        })?;

        self.get_by_id(user_id)
    }

    // ==================== Statistics ====================

    pub fn get_statistics(&self, user_id: i64) -> Result<UserStatistics> {
        let conn = self.db.lock()?;
        let stats = conn
            .query_row(
                "SELECT user_id, total_lessons, average_accuracy, days_learning,
                        total_cards_reviewed, updated_at
                 FROM user_statistics WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(UserStatistics {
                        user_id: row.get(0)?,
                        total_lessons: row.get(1)?,
                        average_accuracy: row.get(2)?,
                        days_learning: row.get(3)?,
                        total_cards_reviewed: row.get(4)?,
                        updated_at: timestamp_from_sql(5, row.get(5)?)?,
                    })
                },
            )
            .optional()?;

        Ok(stats.unwrap_or_else(|| UserStatistics::empty(user_id)))
    }

    pub fn put_statistics(&self, stats: &UserStatistics) -> Result<()> {
        let updated_at = stats.updated_at.map(|t| t.to_rfc3339());
        self.db.with_retry("put statistics", |conn| {
            conn.execute(
                "INSERT INTO user_statistics
                     (user_id, total_lessons, average_accuracy, days_learning,
                      total_cards_reviewed, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(user_id) DO UPDATE SET
                     total_lessons = excluded.total_lessons,
                     average_accuracy = excluded.average_accuracy,
                     days_learning = excluded.days_learning,
                     total_cards_reviewed = excluded.total_cards_reviewed,
                     updated_at = excluded.updated_at",
                params![
                    stats.user_id,
                    stats.total_lessons,
                    stats.average_accuracy,
                    stats.days_learning,
                    stats.total_cards_reviewed,
                    updated_at,
                ],
            )
        })?;
        Ok(())
    }

    // ==================== Refresh tokens ====================

    pub fn store_refresh_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let expires = expires_at.to_rfc3339();
        self.db.with_retry("store refresh token", |conn| {
            conn.execute(
                "INSERT INTO refresh_tokens (user_id, token, expires_at) VALUES (?1, ?2, ?3)",
                params![user_id, token, expires],
            )
        })?;
        Ok(())
    }

    /// Look up a refresh token. Returns the owning user id if the token
    /// exists, is not revoked and has not expired.
    pub fn consume_refresh_token(&self, token: &str, now: DateTime<Utc>) -> Result<Option<i64>> {
        let conn = self.db.lock()?;
        let row = conn
            .query_row(
                "SELECT user_id, expires_at, revoked FROM refresh_tokens WHERE token = ?1",
                params![token],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        timestamp_from_sql(1, row.get(1)?)?,
                        row.get::<_, bool>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((user_id, Some(expires_at), false)) if expires_at > now => Ok(Some(user_id)),
            _ => Ok(None),
        }
    }

    pub fn revoke_refresh_token(&self, token: &str) -> Result<bool> {
        let changed = self.db.with_retry("revoke refresh token", |conn| {
            conn.execute(
                "UPDATE refresh_tokens SET revoked = 1 WHERE token = ?1",
                params![token],
            )
        })?;
        Ok(changed > 0)
    }
}

const USER_COLUMNS: &str = "id, email, password_hash, name, level, xp, streak, daily_goal, \
    completed_today, selected_categories, is_active, created_at, updated_at";

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let created_at = timestamp_from_sql(11, row.get(11)?)?.ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            11,
            rusqlite::types::Type::Text,
            "missing created_at".into(),
        )
    })?;
    let updated_at = timestamp_from_sql(12, row.get(12)?)?.unwrap_or(created_at);

    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        name: row.get(3)?,
        level: row.get(4)?,
        xp: row.get(5)?,
        streak: row.get(6)?,
        daily_goal: row.get(7)?,
        completed_today: row.get(8)?,
        selected_categories: string_list_from_sql(9, row.get(9)?)?,
        is_active: row.get(10)?,
        created_at,
        updated_at,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    /// Insert a user for fixtures that need a valid foreign key.
    pub(crate) fn seed_user(db: &Db) -> i64 {
        let users = UserStorage::new(db.clone());
        users
            .create_user("learner@example.com", "hash", "Learner")
            .unwrap()
            .id
    }

    #[test]
    fn test_create_and_fetch_user() {
        let db = Db::open_in_memory().unwrap();
        let users = UserStorage::new(db);

        let user = users.create_user("a@example.com", "hash", "Ada").unwrap();
        assert_eq!(user.level, 1);
        assert!(user.is_active);

        let by_email = users.get_by_email("a@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert!(users.get_by_email("b@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let db = Db::open_in_memory().unwrap();
        let users = UserStorage::new(db);
        users.create_user("a@example.com", "hash", "Ada").unwrap();

        let err = users.create_user("a@example.com", "hash", "Eve").unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[test]
    fn test_partial_update_keeps_other_fields() {
        let db = Db::open_in_memory().unwrap();
        let users = UserStorage::new(db);
        let user = users.create_user("a@example.com", "hash", "Ada").unwrap();

        let updated = users
            .update_user(
                user.id,
                &UserUpdate {
                    daily_goal: Some(8),
                    selected_categories: Some(vec!["health".into()]),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.daily_goal, 8);
        assert_eq!(updated.selected_categories, vec!["health".to_string()]);
        assert_eq!(updated.name, "Ada");
        assert_eq!(updated.level, 1);
    }

    #[test]
    fn test_statistics_default_until_written() {
        let db = Db::open_in_memory().unwrap();
        let users = UserStorage::new(db);
        let user = users.create_user("a@example.com", "hash", "Ada").unwrap();

        let stats = users.get_statistics(user.id).unwrap();
        assert_eq!(stats.total_cards_reviewed, 0);

        let mut stats = stats;
        stats.total_cards_reviewed = 12;
        stats.updated_at = Some(Utc::now());
        users.put_statistics(&stats).unwrap();

        assert_eq!(users.get_statistics(user.id).unwrap().total_cards_reviewed, 12);
    }

    #[test]
    fn test_refresh_token_lifecycle() {
        let db = Db::open_in_memory().unwrap();
        let users = UserStorage::new(db);
        let user = users.create_user("a@example.com", "hash", "Ada").unwrap();
        let now = Utc::now();

        users
            .store_refresh_token(user.id, "tok", now + Duration::days(30))
            .unwrap();
        assert_eq!(users.consume_refresh_token("tok", now).unwrap(), Some(user.id));
        assert_eq!(users.consume_refresh_token("other", now).unwrap(), None);

        // Expired
        assert_eq!(
            users
                .consume_refresh_token("tok", now + Duration::days(31))
                .unwrap(),
            None
        );

        // Revoked
        assert!(users.revoke_refresh_token("tok").unwrap());
        assert_eq!(users.consume_refresh_token("tok", now).unwrap(), None);
    }
}
