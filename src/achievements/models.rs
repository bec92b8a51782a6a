//! Data models for achievements

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub max_progress: Option<i64>,
}

/// Per-user unlock state for one achievement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAchievement {
    pub user_id: i64,
    pub achievement_id: String,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub progress: i64,
}

/// Achievement joined with the requesting user's state, as returned by
/// the API.
#[derive(Debug, Clone, Serialize)]
pub struct AchievementView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub progress: i64,
    pub max_progress: Option<i64>,
}
