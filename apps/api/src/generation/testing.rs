//! Test doubles for the generative service and the batch sink.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::llm_client::{ChatMessage, CompletionService, LlmError};
use crate::sink::PromptSink;

/// 57 descriptive words with a short first sentence.
pub const GOOD_TEXT: &str = "Minimal ceramic coffee cup on a pale linen tablecloth. \
    Soft morning light falls from the left, casting gentle shadows across the fabric. \
    The background stays clean and bright, leaving generous copy space on the right side. \
    Muted neutral tones, calm atmosphere, shallow depth of field, simple composition, \
    modern lifestyle mood, high resolution stock photo with copy space.";

pub const SHORT_TEXT: &str = "Short.";

/// One recorded `complete` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

/// Replays scripted completions, then repeats `fallback` forever.
/// `Err(status)` entries fail the call with that HTTP status.
pub struct ScriptedCompletions {
    script: Mutex<VecDeque<Result<String, u16>>>,
    fallback: Option<String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedCompletions {
    pub fn new(script: Vec<Result<&str, u16>>, fallback: Option<&str>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().map(|r| r.map(str::to_string)).collect()),
            fallback: fallback.map(str::to_string),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always(text: &str) -> Self {
        Self::new(vec![], Some(text))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletions {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(RecordedCall {
            model: model.to_string(),
            messages: messages.to_vec(),
            temperature,
        });
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(status)) => Err(LlmError::Api {
                status,
                message: "scripted failure".to_string(),
            }),
            None => self.fallback.clone().ok_or(LlmError::EmptyContent),
        }
    }
}

/// Sink that keeps every append in memory, optionally failing instead.
#[derive(Default)]
pub struct RecordingSink {
    pub appends: Mutex<Vec<(String, Vec<String>)>>,
    pub fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            appends: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn appends(&self) -> Vec<(String, Vec<String>)> {
        self.appends.lock().unwrap().clone()
    }
}

#[async_trait]
impl PromptSink for RecordingSink {
    async fn append_rows(&self, collection: &str, rows: &[String]) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        self.appends
            .lock()
            .unwrap()
            .push((collection.to_string(), rows.to_vec()));
        Ok(())
    }
}
