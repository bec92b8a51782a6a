//! Data models for user accounts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub level: i64,
    pub xp: i64,
    /// Consecutive days with at least one completed review.
    pub streak: i64,
    pub daily_goal: i64,
    pub completed_today: i64,
    pub selected_categories: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub level: Option<i64>,
    pub xp: Option<i64>,
    pub streak: Option<i64>,
    pub daily_goal: Option<i64>,
    pub completed_today: Option<i64>,
    pub selected_categories: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStatistics {
    pub user_id: i64,
    pub total_lessons: i64,
    pub average_accuracy: f64,
    pub days_learning: i64,
    pub total_cards_reviewed: i64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserStatistics {
    pub fn empty(user_id: i64) -> Self {
        Self {
            user_id,
            total_lessons: 0,
            average_accuracy: 0.0,
            days_learning: 0,
            total_cards_reviewed: 0,
            updated_at: None,
        }
    }
}
