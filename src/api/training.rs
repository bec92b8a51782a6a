//! Training loop endpoints: fetch a batch of cards, submit an answer.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::catalog::Block;
use crate::training;

use super::{notify_achievement_evaluator, ApiError, AppState, AuthUser};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/training/cards", get(get_cards))
        .route("/training/submit", post(submit))
}

#[derive(Serialize)]
struct TrainingCardsResponse {
    cards: Vec<Block>,
}

async fn get_cards(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<TrainingCardsResponse>, ApiError> {
    let cards = training::training_cards(
        &state.repetition,
        &state.catalog,
        user_id,
        state.batch_size,
        Utc::now(),
    )?;
    Ok(Json(TrainingCardsResponse { cards }))
}

#[derive(Deserialize)]
struct SubmitRequest {
    block_id: String,
    lesson_id: String,
    course_id: String,
    is_correct: bool,
}

#[derive(Serialize)]
struct SubmitResponse {
    message: &'static str,
    /// RFC 3339 timestamp of the next scheduled review.
    next_review: String,
    /// New review interval in days.
    interval: i64,
    needs_review: bool,
}

async fn submit(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    // The referenced block must exist; the record is created lazily.
    state.catalog.get_block(&request.block_id)?;

    let record = training::submit_answer(
        &state.repetition,
        user_id,
        &request.block_id,
        &request.lesson_id,
        &request.course_id,
        request.is_correct,
        Utc::now(),
    )?;

    notify_achievement_evaluator(&state, user_id);

    Ok(Json(SubmitResponse {
        message: "Answer submitted",
        next_review: record
            .next_review_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_default(),
        interval: record.interval_days,
        needs_review: record.needs_review,
    }))
}
