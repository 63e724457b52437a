//! Retry orchestration: fills one batch of prompts under a bounded attempt budget.
//!
//! State machine per batch: `Collecting → Done | Exhausted`.
//!
//! Each cycle draws a parameter suffix, asks the generative service for one
//! candidate, sanitizes and validates it. Accepted candidates are appended;
//! rejected ones cost an attempt and a fixed delay. `Exhausted` yields a partial
//! batch, never an error. A failing service call aborts the whole batch.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::generation::params::ParameterSuffix;
use crate::generation::prompts::{build_messages, DEFAULT_TEMPERATURE};
use crate::generation::sanitizer::sanitize;
use crate::generation::validator::{validate, Reason, ValidationMode};
use crate::llm_client::CompletionService;
use crate::session::Session;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 50;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// One user invocation: how many prompts, on what theme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub desired_count: usize,
    pub theme_text: String,
}

impl GenerationRequest {
    pub fn new(desired_count: usize, theme_text: impl Into<String>) -> Self {
        Self {
            desired_count,
            theme_text: theme_text.into(),
        }
    }

    /// Quotes survive sanitization only when the theme itself contains one.
    pub fn quoting_allowed(&self) -> bool {
        self.theme_text.contains('"')
    }
}

/// Bounded-retry policy: the attempt budget and the pause after each rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Everything about a run that comes from configuration rather than the request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    pub retry: RetryPolicy,
    pub temperature: f32,
    pub validation_mode: ValidationMode,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            temperature: DEFAULT_TEMPERATURE,
            validation_mode: ValidationMode::Strict,
        }
    }
}

/// A sanitized prompt that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedPrompt {
    pub text: String,
    pub word_count: usize,
    /// `below_target` prompts are usable but shorter than the soft target.
    pub reason: Reason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    Collecting,
    Done,
    Exhausted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationBatch {
    pub requested_count: usize,
    pub accepted: Vec<AcceptedPrompt>,
    pub attempts_used: u32,
    pub state: BatchState,
}

impl GenerationBatch {
    fn new(requested_count: usize, retry: &RetryPolicy) -> Self {
        // Never more accepted prompts than attempts, whatever the caller asked for.
        let capacity = requested_count.min(retry.max_attempts as usize);
        Self {
            requested_count,
            accepted: Vec::with_capacity(capacity),
            attempts_used: 0,
            state: BatchState::Collecting,
        }
    }

    /// The state the batch should be in given its counters.
    fn next_state(&self, retry: &RetryPolicy) -> BatchState {
        if self.accepted.len() >= self.requested_count {
            BatchState::Done
        } else if self.attempts_used >= retry.max_attempts {
            BatchState::Exhausted
        } else {
            BatchState::Collecting
        }
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    /// Number of accepted prompts below the soft word target.
    pub fn warnings(&self) -> usize {
        self.accepted
            .iter()
            .filter(|p| p.reason == Reason::BelowTarget)
            .count()
    }

    /// Rows handed to the sink, in acceptance order.
    pub fn rows(&self) -> Vec<String> {
        self.accepted.iter().map(|p| p.text.clone()).collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "Generated {} of {} prompts",
            self.accepted_count(),
            self.requested_count
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestration
// ────────────────────────────────────────────────────────────────────────────

/// Runs the generate → sanitize → validate loop until the batch is full or
/// the attempt budget is spent.
///
/// Strictly sequential: one service call in flight at a time.
#[instrument(
    skip_all,
    fields(
        batch_id = %uuid::Uuid::new_v4(),
        requested = request.desired_count,
        model = %session.model,
    )
)]
pub async fn run_batch<R>(
    llm: &dyn CompletionService,
    session: &Session,
    settings: &PipelineSettings,
    request: &GenerationRequest,
    rng: &mut R,
) -> Result<GenerationBatch, AppError>
where
    R: Rng + Send + ?Sized,
{
    let messages = build_messages(&request.theme_text);
    let quoting_allowed = request.quoting_allowed();
    let mut batch = GenerationBatch::new(request.desired_count, &settings.retry);

    loop {
        batch.state = batch.next_state(&settings.retry);
        if batch.state != BatchState::Collecting {
            break;
        }

        let suffix = ParameterSuffix::choose(rng);
        let raw = llm
            .complete(&session.model, &messages, settings.temperature)
            .await
            .map_err(|e| {
                AppError::Llm(format!(
                    "Generation call failed on attempt {}: {e}",
                    batch.attempts_used + 1
                ))
            })?;
        batch.attempts_used += 1;

        let text = sanitize(&raw, &suffix, quoting_allowed);
        let verdict = validate(&text, settings.validation_mode);

        if verdict.accepted {
            if verdict.reason == Reason::BelowTarget {
                warn!(
                    "Prompt has {} words (below target), accepted with warning",
                    verdict.word_count
                );
            }
            batch.accepted.push(AcceptedPrompt {
                text,
                word_count: verdict.word_count,
                reason: verdict.reason,
            });
        } else {
            warn!(
                "Rejected candidate on attempt {}/{}: {} ({} words)",
                batch.attempts_used,
                settings.retry.max_attempts,
                verdict.reason,
                verdict.word_count
            );
            tokio::time::sleep(settings.retry.delay).await;
        }
    }

    info!(
        "Batch finished ({:?}): {} of {} accepted in {} attempts",
        batch.state,
        batch.accepted_count(),
        batch.requested_count,
        batch.attempts_used
    );

    Ok(batch)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::generation::params::NO_LOGO;
    use crate::generation::testing::{ScriptedCompletions, GOOD_TEXT, SHORT_TEXT};
    use crate::generation::validator::{count_words_excluding_params, MIN_WORDS};

    fn session() -> Session {
        Session {
            active: true,
            model: "test-model".to_string(),
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(1234)
    }

    #[test]
    fn test_good_text_clears_target() {
        assert!(count_words_excluding_params(GOOD_TEXT) >= 45);
    }

    #[test]
    fn test_quoting_allowed_follows_theme() {
        assert!(GenerationRequest::new(1, "a sign saying \"open\"").quoting_allowed());
        assert!(!GenerationRequest::new(1, "a sign").quoting_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_then_good_candidate() {
        let llm = ScriptedCompletions::new(vec![Ok(SHORT_TEXT), Ok(GOOD_TEXT)], None);
        let request = GenerationRequest::new(1, "coffee");

        let settings = PipelineSettings::default();
        let batch = run_batch(&llm, &session(), &settings, &request, &mut rng())
            .await
            .unwrap();

        assert_eq!(batch.state, BatchState::Done);
        assert_eq!(batch.attempts_used, 2);
        assert_eq!(batch.accepted_count(), 1);

        // Replaying the same seed reproduces the suffixes drawn for both attempts.
        let mut replay = StdRng::seed_from_u64(1234);
        let _first = ParameterSuffix::choose(&mut replay);
        let second = ParameterSuffix::choose(&mut replay);
        let text = &batch.accepted[0].text;
        assert!(text.ends_with(&format!("copy space. {second}")));
        assert!(text.ends_with(NO_LOGO));
        assert_eq!(batch.summary(), "Generated 1 of 1 prompts");
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_short_exhausts_budget() {
        let llm = ScriptedCompletions::always(SHORT_TEXT);
        let request = GenerationRequest::new(3, "anything");

        let settings = PipelineSettings::default();
        let batch = run_batch(&llm, &session(), &settings, &request, &mut rng())
            .await
            .unwrap();

        assert_eq!(batch.state, BatchState::Exhausted);
        assert_eq!(batch.accepted_count(), 0);
        assert_eq!(batch.attempts_used, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(llm.call_count(), DEFAULT_MAX_ATTEMPTS as usize);
        assert_eq!(batch.summary(), "Generated 0 of 3 prompts");
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_requested_count_is_bounded_by_attempts() {
        let llm = ScriptedCompletions::always(GOOD_TEXT);
        let request = GenerationRequest::new(i64::MAX as usize, "coffee");
        let settings = PipelineSettings {
            retry: RetryPolicy {
                max_attempts: 3,
                delay: Duration::from_millis(10),
            },
            ..PipelineSettings::default()
        };

        let batch = run_batch(&llm, &session(), &settings, &request, &mut rng())
            .await
            .unwrap();

        assert_eq!(batch.state, BatchState::Exhausted);
        assert_eq!(batch.accepted_count(), 3);
        assert_eq!(batch.attempts_used, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_requested_count() {
        let llm = ScriptedCompletions::always(GOOD_TEXT);
        let request = GenerationRequest::new(3, "coffee");

        let settings = PipelineSettings::default();
        let batch = run_batch(&llm, &session(), &settings, &request, &mut rng())
            .await
            .unwrap();

        assert_eq!(batch.state, BatchState::Done);
        assert_eq!(batch.accepted_count(), 3);
        assert_eq!(llm.call_count(), 3);
        for prompt in &batch.accepted {
            assert!(prompt.word_count >= MIN_WORDS);
            assert_eq!(prompt.text.matches("--ar").count(), 1);
            assert_eq!(prompt.text.matches(NO_LOGO).count(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_requested_makes_no_calls() {
        let llm = ScriptedCompletions::always(GOOD_TEXT);
        let request = GenerationRequest::new(0, "coffee");

        let settings = PipelineSettings::default();
        let batch = run_batch(&llm, &session(), &settings, &request, &mut rng())
            .await
            .unwrap();

        assert_eq!(batch.state, BatchState::Done);
        assert_eq!(batch.attempts_used, 0);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_budget_is_enforced() {
        let llm = ScriptedCompletions::always(SHORT_TEXT);
        let settings = PipelineSettings {
            retry: RetryPolicy {
                max_attempts: 5,
                delay: Duration::from_millis(10),
            },
            ..PipelineSettings::default()
        };

        let request = GenerationRequest::new(2, "x");
        let batch = run_batch(&llm, &session(), &settings, &request, &mut rng())
            .await
            .unwrap();

        assert_eq!(batch.state, BatchState::Exhausted);
        assert_eq!(llm.call_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_service_failure_aborts_batch() {
        let llm = ScriptedCompletions::new(vec![Ok(GOOD_TEXT), Err(500)], Some(GOOD_TEXT));
        let request = GenerationRequest::new(3, "coffee");

        let settings = PipelineSettings::default();
        let result = run_batch(&llm, &session(), &settings, &request, &mut rng()).await;

        assert!(matches!(result, Err(AppError::Llm(_))));
        // No retry of the failed call.
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_waits_fixed_delay() {
        let llm =
            ScriptedCompletions::new(vec![Ok(SHORT_TEXT), Ok(SHORT_TEXT)], Some(GOOD_TEXT));
        let start = tokio::time::Instant::now();

        let batch = run_batch(
            &llm,
            &session(),
            &PipelineSettings::default(),
            &GenerationRequest::new(1, "coffee"),
            &mut rng(),
        )
        .await
        .unwrap();

        let elapsed = start.elapsed();
        assert_eq!(batch.attempts_used, 3);
        assert!(elapsed >= DEFAULT_RETRY_DELAY * 2);
        assert!(elapsed < DEFAULT_RETRY_DELAY * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_model_and_theme_reach_service() {
        let llm = ScriptedCompletions::always(GOOD_TEXT);
        let settings = PipelineSettings {
            temperature: 0.4,
            ..PipelineSettings::default()
        };

        let request = GenerationRequest::new(1, "foggy harbor");
        run_batch(&llm, &session(), &settings, &request, &mut rng())
            .await
            .unwrap();

        let calls = llm.calls();
        assert_eq!(calls[0].model, "test-model");
        assert!((calls[0].temperature - 0.4).abs() < f32::EPSILON);
        assert!(calls[0].messages[1].content.starts_with("foggy harbor"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_embedded_marker_keeps_model_parameters() {
        let raw = format!("{GOOD_TEXT} --ar 16:9 --no logo Some trailing junk");
        let llm = ScriptedCompletions::always(&raw);

        let batch = run_batch(
            &llm,
            &session(),
            &PipelineSettings::default(),
            &GenerationRequest::new(1, "coffee"),
            &mut rng(),
        )
        .await
        .unwrap();

        assert_eq!(batch.accepted_count(), 1);
        assert!(batch.accepted[0].text.ends_with("copy space. --ar 16:9 --no logo"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quotes_kept_only_when_theme_quoted() {
        let raw = format!("{GOOD_TEXT} A sign reads \"OPEN\".");
        let llm = ScriptedCompletions::always(&raw);

        let quoted = run_batch(
            &llm,
            &session(),
            &PipelineSettings::default(),
            &GenerationRequest::new(1, "shop sign \"OPEN\""),
            &mut rng(),
        )
        .await
        .unwrap();
        assert!(quoted.accepted[0].text.contains("\"OPEN\""));

        let plain = run_batch(
            &llm,
            &session(),
            &PipelineSettings::default(),
            &GenerationRequest::new(1, "shop sign"),
            &mut rng(),
        )
        .await
        .unwrap();
        assert!(!plain.accepted[0].text.contains('"'));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lenient_mode_accepts_run_on_first_sentence() {
        let run_on = GOOD_TEXT.replace('.', ",");
        let llm = ScriptedCompletions::new(vec![Ok(run_on.as_str())], Some(GOOD_TEXT));
        let lenient = PipelineSettings {
            validation_mode: ValidationMode::Lenient,
            ..PipelineSettings::default()
        };

        let request = GenerationRequest::new(1, "x");
        let batch = run_batch(&llm, &session(), &lenient, &request, &mut rng())
            .await
            .unwrap();

        assert_eq!(batch.attempts_used, 1);
        assert!(batch.accepted[0]
            .text
            .starts_with("Minimal ceramic coffee cup on a pale linen tablecloth,"));
    }
}
