//! Axum route handlers for the session (run flag and active model).

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::session::Session;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SetModelRequest {
    pub model: String,
}

/// GET /api/v1/session
pub async fn handle_get_session(
    State(state): State<AppState>,
) -> Result<Json<Session>, AppError> {
    Ok(Json(state.sessions.load().await?))
}

/// POST /api/v1/session/pause
pub async fn handle_pause(State(state): State<AppState>) -> Result<Json<Session>, AppError> {
    Ok(Json(state.sessions.set_active(false).await?))
}

/// POST /api/v1/session/resume
pub async fn handle_resume(State(state): State<AppState>) -> Result<Json<Session>, AppError> {
    Ok(Json(state.sessions.set_active(true).await?))
}

/// PUT /api/v1/session/model
pub async fn handle_set_model(
    State(state): State<AppState>,
    Json(request): Json<SetModelRequest>,
) -> Result<Json<Session>, AppError> {
    Ok(Json(state.sessions.set_model(&request.model).await?))
}
