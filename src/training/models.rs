//! Per-learner scheduling state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default ease factor for a record that has never been reviewed.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Default interval for a record that has never been reviewed.
pub const DEFAULT_INTERVAL_DAYS: i64 = 1;

/// Spaced repetition state for one (learner, block) pair.
///
/// Born on the first submitted answer, never deleted, and mutated only
/// by the review scheduler. At most one record exists per pair; the
/// store enforces this with a unique constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepetitionRecord {
    /// Row id; 0 until the record has been persisted.
    #[serde(default)]
    pub id: i64,
    pub user_id: i64,
    pub block_id: String,
    pub lesson_id: String,
    pub course_id: String,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub next_review_at: Option<DateTime<Utc>>,
    pub interval_days: i64,
    pub ease_factor: f64,
    pub needs_review: bool,
    pub mistake_count: i64,
}

impl RepetitionRecord {
    /// State assumed for a block the learner has never answered.
    pub fn fresh(user_id: i64, block_id: &str, lesson_id: &str, course_id: &str) -> Self {
        Self {
            id: 0,
            user_id,
            block_id: block_id.to_string(),
            lesson_id: lesson_id.to_string(),
            course_id: course_id.to_string(),
            last_reviewed_at: None,
            next_review_at: None,
            interval_days: DEFAULT_INTERVAL_DAYS,
            ease_factor: DEFAULT_EASE_FACTOR,
            needs_review: false,
            mistake_count: 0,
        }
    }

    /// Whether the record is due at `now` (and not already flagged).
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.needs_review
            && self
                .next_review_at
                .map(|due| due <= now)
                .unwrap_or(false)
    }
}
