//! Data models for the course catalog

use serde::{Deserialize, Serialize};

/// Top-level subject grouping for courses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub course_id: String,
    pub title: String,
    pub category_id: String,
    #[serde(default)]
    pub subcategory: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub difficulty_score: i64,
    #[serde(default)]
    pub total_lessons: i64,
    #[serde(default)]
    pub total_practice_tasks: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub full_description: String,
    #[serde(default)]
    pub cover_image_url: String,
}

fn default_status() -> String {
    "active".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

/// A lesson inside a course, ordered by `position`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    pub course_id: String,
    pub position: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Kind of content block inside a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Explanatory material, no answer expected
    Theory,
    /// An exercise the learner answers during training
    Practice,
}

/// A theory or practice content unit. Immutable catalog entry and the
/// item handed out by the card selector.
///
/// The payload fields vary by kind: theory blocks carry `content` and
/// `visualization_hint`, practice blocks carry the question/answer set.
/// Scheduling never looks at the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub lesson_id: String,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    pub position: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visualization_hint: Option<String>,
}

impl Block {
    /// Minimal practice block, used by tests and seed data.
    pub fn practice(id: &str, lesson_id: &str, position: i64, title: &str) -> Self {
        Self {
            id: id.to_string(),
            lesson_id: lesson_id.to_string(),
            kind: BlockKind::Practice,
            subtype: Some("multiple_choice".to_string()),
            position,
            title: title.to_string(),
            content: None,
            question: None,
            options: None,
            hints: Vec::new(),
            correct_answer: None,
            explanation: None,
            sample_answer: None,
            answer: None,
            visualization_hint: None,
        }
    }
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Theory => "theory",
            BlockKind::Practice => "practice",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "theory" => Some(BlockKind::Theory),
            "practice" => Some(BlockKind::Practice),
            _ => None,
        }
    }
}
