//! Registration, login and token refresh.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::users::auth::{generate_refresh_token, hash_password, verify_password};
use crate::users::AuthError;

use super::{ApiError, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize)]
struct RegisterRequest {
    email: String,
    password: String,
    name: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Serialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    token_type: &'static str,
}

const MIN_PASSWORD_LEN: usize = 8;

async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if !request.email.contains('@') {
        return Err(ApiError::BadRequest("invalid email address".to_string()));
    }

    if state.users.get_by_email(&request.email)?.is_some() {
        return Err(AuthError::EmailTaken.into());
    }

    let password_hash = hash_password(&request.password)?;
    let user = state
        .users
        .create_user(&request.email, &password_hash, &request.name)?;

    log::info!("registered user {} ({})", user.id, user.email);
    issue_tokens(&state, user.id)
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .users
        .get_by_email(&request.email)?
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(&request.password, &user.password_hash) {
        return Err(AuthError::InvalidCredentials.into());
    }
    if !user.is_active {
        return Err(AuthError::Inactive.into());
    }

    issue_tokens(&state, user.id)
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let now = Utc::now();
    let user_id = state
        .users
        .consume_refresh_token(&request.refresh_token, now)?
        .ok_or(AuthError::RefreshRejected)?;

    // Rotate: the presented token is retired when a new pair is issued.
    state.users.revoke_refresh_token(&request.refresh_token)?;
    issue_tokens(&state, user_id)
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.users.revoke_refresh_token(&request.refresh_token)?;
    Ok(Json(serde_json::json!({ "message": "Logged out" })))
}

fn issue_tokens(state: &AppState, user_id: i64) -> Result<Json<TokenResponse>, ApiError> {
    let now = Utc::now();
    let access_token = state.tokens.issue(user_id, now)?;
    let refresh_token = generate_refresh_token();
    state
        .users
        .store_refresh_token(user_id, &refresh_token, now + state.refresh_ttl)?;

    Ok(Json(TokenResponse {
        access_token,
        refresh_token,
        token_type: "bearer",
    }))
}
