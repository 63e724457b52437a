use std::sync::Arc;

use crate::config::Config;
use crate::generation::orchestrator::PipelineSettings;
use crate::llm_client::CompletionService;
use crate::session::SessionStore;
use crate::sink::PromptSink;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable generative service. Default: `LlmClient`.
    pub llm: Arc<dyn CompletionService>,
    /// Destination for finished batches. Default: `PgSheetSink`.
    pub sink: Arc<dyn PromptSink>,
    pub sessions: SessionStore,
    pub config: Config,
    /// Retry budget, temperature and validation mode, fixed at startup.
    pub settings: PipelineSettings,
}
