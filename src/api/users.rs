//! Profile and statistics endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::users::{User, UserStatistics, UserUpdate};

use super::{ApiError, AppState, AuthUser};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user", get(get_user).put(update_user))
        .route("/user/statistics", get(get_statistics))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.get_by_id(user_id)?))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(update): Json<UserUpdate>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.update_user(user_id, &update)?))
}

async fn get_statistics(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserStatistics>, ApiError> {
    Ok(Json(state.users.get_statistics(user_id)?))
}
