//! Axum route handlers for the Prompt Generation API.

use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::error;

use crate::errors::AppError;
use crate::generation::command::parse_generate_args;
use crate::generation::generator::{generate_prompts, GenerateResponse};
use crate::generation::orchestrator::GenerationRequest;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct GenerateBody {
    pub count: Option<usize>,
    #[serde(default)]
    pub theme: String,
}

#[derive(Debug, Deserialize)]
pub struct CommandBody {
    #[serde(default)]
    pub args: String,
}

impl GenerateBody {
    fn into_request(self, default_count: usize) -> GenerationRequest {
        GenerationRequest::new(
            self.count.unwrap_or(default_count),
            self.theme.trim().to_string(),
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/prompts/generate
///
/// Generates up to `count` prompts on `theme` and appends them to today's collection.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<GenerateResponse>, AppError> {
    let request = body.into_request(state.config.default_prompt_count);
    run(&state, request).await
}

/// POST /api/v1/prompts/command
///
/// Same as generate, but takes the raw argument text of the chat command.
pub async fn handle_command(
    State(state): State<AppState>,
    Json(body): Json<CommandBody>,
) -> Result<Json<GenerateResponse>, AppError> {
    let request = parse_generate_args(&body.args, state.config.default_prompt_count)?;
    run(&state, request).await
}

async fn run(
    state: &AppState,
    request: GenerationRequest,
) -> Result<Json<GenerateResponse>, AppError> {
    let session = state.sessions.load().await?;
    let response = generate_prompts(
        state.llm.as_ref(),
        state.sink.as_ref(),
        &session,
        &state.settings,
        request,
    )
    .await
    .inspect_err(|e| {
        if e.is_external_service_failure() {
            error!("Generation aborted, nothing persisted: {e}");
        }
    })?;
    Ok(Json(response))
}
