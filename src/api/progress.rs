//! Completion log endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::progress::ProgressEntry;

use super::{notify_achievement_evaluator, ApiError, AppState, AuthUser};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/progress", get(get_progress))
        .route("/progress/block", post(mark_block))
        .route("/progress/lesson", post(mark_lesson))
}

#[derive(Serialize)]
struct ProgressSummary {
    total_blocks_completed: usize,
    progress: Vec<ProgressEntry>,
}

async fn get_progress(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProgressSummary>, ApiError> {
    let entries = state.progress.list(user_id)?;
    Ok(Json(ProgressSummary {
        total_blocks_completed: entries.len(),
        progress: entries,
    }))
}

#[derive(Deserialize)]
struct BlockProgressRequest {
    block_id: String,
    lesson_id: String,
    course_id: String,
}

#[derive(Deserialize)]
struct LessonProgressRequest {
    lesson_id: String,
    course_id: String,
}

#[derive(Serialize)]
struct ProgressResponse {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    block_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lesson_id: Option<String>,
}

async fn mark_block(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<BlockProgressRequest>,
) -> Result<Json<ProgressResponse>, ApiError> {
    // Reject unknown blocks up front.
    state.catalog.get_block(&request.block_id)?;

    let inserted = state.progress.mark_block(
        user_id,
        &request.block_id,
        &request.lesson_id,
        &request.course_id,
        Utc::now(),
    )?;

    if inserted {
        notify_achievement_evaluator(&state, user_id);
    }

    Ok(Json(ProgressResponse {
        message: if inserted {
            "Block marked as completed"
        } else {
            "Block already completed"
        },
        block_id: Some(request.block_id),
        lesson_id: None,
    }))
}

async fn mark_lesson(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<LessonProgressRequest>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let blocks = state.catalog.list_blocks_by_lesson(&request.lesson_id)?;
    let block_ids: Vec<String> = blocks.into_iter().map(|b| b.id).collect();

    state.progress.mark_lesson(
        user_id,
        &request.lesson_id,
        &request.course_id,
        &block_ids,
        Utc::now(),
    )?;
    notify_achievement_evaluator(&state, user_id);

    Ok(Json(ProgressResponse {
        message: "Lesson marked as completed",
        block_id: None,
        lesson_id: Some(request.lesson_id),
    }))
}
