//! Session: the persisted run/pause flag and active model.
//!
//! Read once per invocation and handed to the orchestrator by reference, so a
//! batch never observes a flag flip or model switch halfway through.

pub mod handlers;

use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;

const ACTIVE_KEY: &str = "stockprompt:session:active";
const MODEL_KEY: &str = "stockprompt:session:model";

/// Snapshot of the session at the start of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub active: bool,
    pub model: String,
}

impl Session {
    /// Builds a snapshot from raw stored values, falling back to defaults for absent keys.
    fn from_stored(active: Option<String>, model: Option<String>, default_model: &str) -> Self {
        Self {
            active: active.map(|v| v != "0").unwrap_or(true),
            model: model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| default_model.to_string()),
        }
    }
}

/// Redis-backed session store.
#[derive(Clone)]
pub struct SessionStore {
    client: redis::Client,
    default_model: String,
}

impl SessionStore {
    pub fn new(client: redis::Client, default_model: String) -> Self {
        Self {
            client,
            default_model,
        }
    }

    pub async fn load(&self) -> Result<Session, AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let active: Option<String> = conn.get(ACTIVE_KEY).await?;
        let model: Option<String> = conn.get(MODEL_KEY).await?;
        Ok(Session::from_stored(active, model, &self.default_model))
    }

    /// Pause (`false`) or resume (`true`) generation.
    pub async fn set_active(&self, active: bool) -> Result<Session, AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set::<_, _, ()>(ACTIVE_KEY, if active { "1" } else { "0" })
            .await?;
        info!("Session {}", if active { "resumed" } else { "paused" });
        self.load().await
    }

    pub async fn set_model(&self, model: &str) -> Result<Session, AppError> {
        let model = validate_model_name(model)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set::<_, _, ()>(MODEL_KEY, model).await?;
        info!("Active model set to {model}");
        self.load().await
    }
}

fn validate_model_name(model: &str) -> Result<&str, AppError> {
    let model = model.trim();
    if model.is_empty() {
        return Err(AppError::Validation("model cannot be empty".to_string()));
    }
    if model.chars().any(char::is_whitespace) {
        return Err(AppError::Validation(
            "model cannot contain whitespace".to_string(),
        ));
    }
    Ok(model)
}
