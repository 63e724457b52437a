mod config;
mod db;
mod errors;
mod generation;
mod llm_client;
mod routes;
mod session;
mod sink;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::generation::orchestrator::PipelineSettings;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::session::SessionStore;
use crate::sink::PgSheetSink;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; missing credentials abort before anything is served
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Stockprompt v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (batch sink)
    let db = create_pool(&config.database_url).await?;
    ensure_schema(&db).await?;

    // Initialize Redis (session store)
    let redis = redis::Client::open(config.redis_url.clone())?;
    let sessions = SessionStore::new(redis, config.default_model.clone());
    let session = sessions.load().await?;
    info!(
        "Session loaded (active: {}, model: {})",
        session.active, session.model
    );

    // Initialize LLM client
    let llm = LlmClient::new(config.openai_api_key.clone(), config.openai_base_url.clone())?;
    info!("LLM client initialized (endpoint: {})", config.openai_base_url);

    let settings = PipelineSettings {
        retry: config.retry_policy(),
        temperature: config.temperature,
        validation_mode: config.validation_mode,
    };
    info!(
        "Pipeline: max_attempts={}, retry_delay={:?}, validation={:?}",
        settings.retry.max_attempts, settings.retry.delay, settings.validation_mode
    );

    // Build app state
    let state = AppState {
        llm: Arc::new(llm),
        sink: Arc::new(PgSheetSink::new(db)),
        sessions,
        config: config.clone(),
        settings,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
