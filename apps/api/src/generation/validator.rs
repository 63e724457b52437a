//! Prompt validation: structural acceptance checks on a sanitized candidate.
//!
//! Rejections (`too_short`, `first_sentence_too_long`, `duplicate_markers`,
//! `missing_markers`) are recovered by the orchestrator through retry. They are
//! values, never errors.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::generation::params::ASPECT_RATIO_MARKER;
use crate::generation::sanitizer::{is_marker_punctuation, marker_core};

/// Hard floor: fewer words than this is rejected.
pub const MIN_WORDS: usize = 28;
/// Soft target: below this is accepted with a warning.
pub const TARGET_WORDS: usize = 45;
/// Maximum length, in characters, of the first sentence.
pub const MAX_FIRST_SENTENCE_CHARS: usize = 100;

static RE_CANONICAL_NO_LOGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|\s)--no\s+logo\b").expect("valid no-logo pattern"));

/// Which validation policy applies. `Strict` enforces the first-sentence rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    #[default]
    Strict,
    Lenient,
}

impl FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(ValidationMode::Strict),
            "lenient" => Ok(ValidationMode::Lenient),
            other => Err(format!("expected 'strict' or 'lenient', got '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Ok,
    BelowTarget,
    TooShort,
    FirstSentenceTooLong,
    DuplicateMarkers,
    MissingMarkers,
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Reason::Ok => "ok",
            Reason::BelowTarget => "below_target",
            Reason::TooShort => "too_short",
            Reason::FirstSentenceTooLong => "first_sentence_too_long",
            Reason::DuplicateMarkers => "duplicate_markers",
            Reason::MissingMarkers => "missing_markers",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of validating one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub accepted: bool,
    pub reason: Reason,
    pub word_count: usize,
}

impl Verdict {
    fn accept(reason: Reason, word_count: usize) -> Self {
        Self {
            accepted: true,
            reason,
            word_count,
        }
    }

    fn reject(reason: Reason, word_count: usize) -> Self {
        Self {
            accepted: false,
            reason,
            word_count,
        }
    }
}

/// Validates a sanitized candidate.
///
/// Check order: marker counts, word floor, first sentence (strict only), soft target.
pub fn validate(text: &str, mode: ValidationMode) -> Verdict {
    let word_count = count_words_excluding_params(text);

    let aspect_ratios = count_aspect_ratio_markers(text);
    let no_logos = count_no_logo_markers(text);
    if aspect_ratios > 1 || no_logos > 1 {
        return Verdict::reject(Reason::DuplicateMarkers, word_count);
    }
    if aspect_ratios == 0 || no_logos == 0 {
        return Verdict::reject(Reason::MissingMarkers, word_count);
    }

    if word_count < MIN_WORDS {
        return Verdict::reject(Reason::TooShort, word_count);
    }

    if mode == ValidationMode::Strict && !first_sentence_within_limit(text) {
        return Verdict::reject(Reason::FirstSentenceTooLong, word_count);
    }

    if word_count < TARGET_WORDS {
        Verdict::accept(Reason::BelowTarget, word_count)
    } else {
        Verdict::accept(Reason::Ok, word_count)
    }
}

/// Counts whitespace-separated tokens, skipping any that start with `--`
/// once surrounding punctuation is stripped.
pub fn count_words_excluding_params(text: &str) -> usize {
    text.split_whitespace()
        .filter(|token| !token.trim_matches(is_marker_punctuation).is_empty())
        .filter(|token| marker_core(token).is_none())
        .count()
}

fn count_aspect_ratio_markers(text: &str) -> usize {
    text.split_whitespace()
        .filter_map(marker_core)
        .filter(|core| core.eq_ignore_ascii_case(ASPECT_RATIO_MARKER))
        .count()
}

fn count_no_logo_markers(text: &str) -> usize {
    RE_CANONICAL_NO_LOGO.find_iter(text).count()
}

/// The descriptive part of the prompt: everything before the first `--` token.
fn descriptive_text(text: &str) -> String {
    text.split_whitespace()
        .take_while(|token| marker_core(token).is_none())
        .collect::<Vec<_>>()
        .join(" ")
}

/// False when there is no period before the parameters, or the first
/// period-terminated sentence is longer than `MAX_FIRST_SENTENCE_CHARS`.
fn first_sentence_within_limit(text: &str) -> bool {
    let body = descriptive_text(text);
    match body.find('.') {
        Some(end) => body[..=end].trim().chars().count() <= MAX_FIRST_SENTENCE_CHARS,
        None => false,
    }
}
