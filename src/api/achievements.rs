//! Achievement listing.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::achievements::AchievementView;

use super::{ApiError, AppState, AuthUser};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/achievements", get(list_achievements))
}

async fn list_achievements(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<AchievementView>>, ApiError> {
    Ok(Json(state.achievements.list_views(user_id)?))
}
