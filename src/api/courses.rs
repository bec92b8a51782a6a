//! Course endpoints: listing, details, lessons, enrollment.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::catalog::{Course, Lesson};

use super::{ApiError, AppState, AuthUser};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/courses", get(list_courses))
        .route("/courses/{course_id}", get(get_course))
        .route("/courses/{course_id}/lessons", get(list_lessons))
        .route("/courses/{course_id}/enroll", post(enroll))
}

#[derive(Deserialize)]
struct CourseFilter {
    category_id: Option<String>,
}

async fn list_courses(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(filter): Query<CourseFilter>,
) -> Result<Json<Vec<Course>>, ApiError> {
    Ok(Json(state.catalog.list_courses(filter.category_id.as_deref())?))
}

async fn get_course(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(course_id): Path<String>,
) -> Result<Json<Course>, ApiError> {
    Ok(Json(state.catalog.get_course(&course_id)?))
}

async fn list_lessons(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(course_id): Path<String>,
) -> Result<Json<Vec<Lesson>>, ApiError> {
    // 404 for an unknown course rather than an empty list.
    state.catalog.get_course(&course_id)?;
    Ok(Json(state.catalog.list_course_lessons(&course_id)?))
}

#[derive(Serialize)]
struct EnrollResponse {
    message: &'static str,
    course_id: String,
}

async fn enroll(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(course_id): Path<String>,
) -> Result<Json<EnrollResponse>, ApiError> {
    let enrolled = state
        .catalog
        .enroll(user_id, &course_id, &Utc::now().to_rfc3339())?;

    Ok(Json(EnrollResponse {
        message: if enrolled {
            "Successfully enrolled"
        } else {
            "Already enrolled"
        },
        course_id,
    }))
}
