//! HTTP API.
//!
//! Thin axum routers over the storage modules. Handlers stay small:
//! extract the authenticated user, call into the domain modules, map
//! errors through `ApiError`.

pub mod achievements;
pub mod auth;
pub mod categories;
pub mod courses;
pub mod lessons;
pub mod progress;
pub mod training;
pub mod users;

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Duration;
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::achievements::AchievementStorage;
use crate::catalog::CatalogStorage;
use crate::config::Config;
use crate::db::{Db, StorageError};
use crate::progress::ProgressStorage;
use crate::training::RepetitionStorage;
use crate::users::{AuthError, TokenSigner, UserStorage};

/// Shared state behind every handler.
pub struct AppState {
    pub catalog: CatalogStorage,
    pub users: UserStorage,
    pub repetition: RepetitionStorage,
    pub progress: ProgressStorage,
    pub achievements: AchievementStorage,
    pub tokens: TokenSigner,
    pub refresh_ttl: Duration,
    pub batch_size: usize,
}

impl AppState {
    pub fn new(db: Db, config: &Config, token_secret: &str) -> Self {
        Self {
            catalog: CatalogStorage::new(db.clone()),
            users: UserStorage::new(db.clone()),
            repetition: RepetitionStorage::new(db.clone()),
            progress: ProgressStorage::new(db.clone()),
            achievements: AchievementStorage::new(db),
            tokens: TokenSigner::new(
                token_secret,
                Duration::minutes(config.access_token_ttl_minutes),
            ),
            refresh_ttl: Duration::days(config.refresh_token_ttl_days),
            batch_size: config.training_batch_size,
        }
    }
}

/// Build the full application router.
pub fn router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let api = Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(categories::router())
        .merge(courses::router())
        .merge(lessons::router())
        .merge(progress::router())
        .merge(training::router())
        .merge(achievements::router());

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api", api)
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Learnify API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("ignoring invalid CORS origin {origin:?}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// API error envelope. Storage and auth errors convert into this and
/// map onto HTTP statuses in one place.
#[derive(Debug)]
pub enum ApiError {
    Storage(StorageError),
    Auth(AuthError),
    BadRequest(String),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Storage(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::Storage(err) => match err {
                StorageError::NotFound(..) => (StatusCode::NOT_FOUND, err.to_string()),
                StorageError::Conflict(_) => (StatusCode::CONFLICT, err.to_string()),
                StorageError::Unavailable(_) => {
                    log::error!("store unavailable: {err}");
                    (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
                }
                other => {
                    log::error!("internal storage error: {other}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal error".to_string(),
                    )
                }
            },
            ApiError::Auth(err) => match err {
                AuthError::EmailTaken => (StatusCode::BAD_REQUEST, err.to_string()),
                AuthError::Inactive => (StatusCode::FORBIDDEN, err.to_string()),
                AuthError::Hash(detail) => {
                    log::error!("auth internals failed: {detail}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal error".to_string(),
                    )
                }
                _ => (StatusCode::UNAUTHORIZED, err.to_string()),
            },
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail.clone()),
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Authenticated learner id, resolved from the `Authorization: Bearer`
/// header. Every core call threads this identity; there is no implicit
/// default user.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i64);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Auth(AuthError::InvalidToken))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Auth(AuthError::InvalidToken))?;

        let user_id = state.tokens.verify(token, chrono::Utc::now())?;

        let user = state.users.get_by_id(user_id).map_err(|err| match err {
            StorageError::NotFound(..) => ApiError::Auth(AuthError::InvalidToken),
            other => ApiError::Storage(other),
        })?;
        if !user.is_active {
            return Err(ApiError::Auth(AuthError::Inactive));
        }

        Ok(AuthUser(user.id))
    }
}

/// Run the achievement evaluator after a completion event. The result
/// is not consumed; failures are logged and swallowed.
pub(crate) fn notify_achievement_evaluator(state: &AppState, user_id: i64) {
    if let Err(err) = crate::achievements::evaluate(
        &state.achievements,
        &state.users,
        &state.progress,
        &state.repetition,
        user_id,
        chrono::Utc::now(),
    ) {
        log::warn!("achievement evaluation failed for user {user_id}: {err}");
    }
}
