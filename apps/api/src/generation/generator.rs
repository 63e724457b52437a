//! Prompt Generation: runs one invocation end to end.
//!
//! Flow: session check → run batch → append to today's collection → summary.
//!
//! Any external-service failure (generative service or sink) aborts the
//! invocation. Nothing is persisted for a batch that failed mid-way.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::generation::orchestrator::{
    run_batch, AcceptedPrompt, BatchState, GenerationBatch, GenerationRequest, PipelineSettings,
};
use crate::llm_client::CompletionService;
use crate::session::Session;
use crate::sink::{todays_collection, PromptSink};

/// Final summary returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateResponse {
    pub requested_count: usize,
    pub accepted_count: usize,
    pub attempts_used: u32,
    pub outcome: BatchState,
    pub collection: String,
    pub prompts: Vec<AcceptedPrompt>,
    /// Accepted prompts below the soft word target.
    pub warnings: usize,
    pub summary: String,
}

impl GenerateResponse {
    fn from_batch(batch: GenerationBatch, collection: String) -> Self {
        Self {
            requested_count: batch.requested_count,
            accepted_count: batch.accepted_count(),
            attempts_used: batch.attempts_used,
            outcome: batch.state,
            warnings: batch.warnings(),
            summary: batch.summary(),
            prompts: batch.accepted,
            collection,
        }
    }
}

/// Generates a batch for `request` and stores it in today's collection.
///
/// `session` is the snapshot read at the start of the invocation.
pub async fn generate_prompts(
    llm: &dyn CompletionService,
    sink: &dyn PromptSink,
    session: &Session,
    settings: &PipelineSettings,
    request: GenerationRequest,
) -> Result<GenerateResponse, AppError> {
    if !session.active {
        return Err(AppError::Paused);
    }

    info!(
        "Generating {} prompts with model {} (theme: {:?})",
        request.desired_count, session.model, request.theme_text
    );

    let mut rng = StdRng::from_entropy();
    let batch = run_batch(llm, session, settings, &request, &mut rng).await?;

    let collection = todays_collection();
    sink.append_rows(&collection, &batch.rows()).await?;

    let response = GenerateResponse::from_batch(batch, collection);
    info!("{}", response.summary);
    Ok(response)
}
