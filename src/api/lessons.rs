//! Lesson details with ordered blocks.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::catalog::Block;

use super::{ApiError, AppState, AuthUser};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/lessons/{lesson_id}", get(get_lesson))
}

#[derive(Serialize)]
struct LessonResponse {
    id: String,
    course_id: String,
    position: i64,
    title: String,
    description: String,
    blocks: Vec<Block>,
}

async fn get_lesson(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(lesson_id): Path<String>,
) -> Result<Json<LessonResponse>, ApiError> {
    let lesson = state.catalog.get_lesson(&lesson_id)?;
    let blocks = state.catalog.list_blocks_by_lesson(&lesson_id)?;

    Ok(Json(LessonResponse {
        id: lesson.id,
        course_id: lesson.course_id,
        position: lesson.position,
        title: lesson.title,
        description: lesson.description,
        blocks,
    }))
}
