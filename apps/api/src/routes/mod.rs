pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::generation::handlers as generation;
use crate::session::handlers as session;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Generation API
        .route("/api/v1/prompts/generate", post(generation::handle_generate))
        .route("/api/v1/prompts/command", post(generation::handle_command))
        // Session API
        .route("/api/v1/session", get(session::handle_get_session))
        .route("/api/v1/session/pause", post(session::handle_pause))
        .route("/api/v1/session/resume", post(session::handle_resume))
        .route("/api/v1/session/model", put(session::handle_set_model))
        .with_state(state)
}
