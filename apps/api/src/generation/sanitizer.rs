//! Text sanitizer: turns one raw completion into a single clean line that ends
//! in exactly one parameter suffix.
//!
//! The cleanup is an ordered list of small rules, applied in this sequence:
//! 1. `join_lines`               line breaks become spaces
//! 2. `anchor_suffix`            truncate after an existing `--no logo`, or append the suffix
//!                               (quotes that rule 5 will drop are ignored by the search)
//! 3. `strip_marker_punctuation` drop punctuation glued to `--` markers and their values
//! 4. `strip_wrapping_quotes`    remove quote pairs wrapping the descriptive text
//! 5. `remove_quotes`            drop every `"` unless the theme itself used quotes
//! 6. `collapse_whitespace`      single spaces, trimmed
//!
//! The pipeline is idempotent: sanitizing its own output changes nothing.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::generation::params::{ParameterSuffix, MARKER_KEYS, MARKER_PREFIX, NO_LOGO};

/// Any spelling of the no-logo marker the later rules could normalise into the canonical one.
/// The marker must start a token; `contrast--no logo` is plain text.
static RE_NO_LOGO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|\s)(?P<marker>[,.;:!?"]*--no(?:[,.;:!?"]*\s)+[,.;:!?"]*logo)\b"#)
        .expect("valid no-logo pattern")
});

static RE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Inputs shared by every rule for one attempt.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub suffix: &'a ParameterSuffix,
    pub quoting_allowed: bool,
}

/// One named normalisation step.
pub struct Rule {
    pub name: &'static str,
    pub apply: fn(&str, &RuleContext<'_>) -> String,
}

pub const PIPELINE: [Rule; 6] = [
    Rule {
        name: "join_lines",
        apply: join_lines,
    },
    Rule {
        name: "anchor_suffix",
        apply: anchor_suffix,
    },
    Rule {
        name: "strip_marker_punctuation",
        apply: strip_marker_punctuation,
    },
    Rule {
        name: "strip_wrapping_quotes",
        apply: strip_wrapping_quotes,
    },
    Rule {
        name: "remove_quotes",
        apply: remove_quotes,
    },
    Rule {
        name: "collapse_whitespace",
        apply: collapse_whitespace,
    },
];

/// Runs the full pipeline over one raw candidate.
pub fn sanitize(raw: &str, suffix: &ParameterSuffix, quoting_allowed: bool) -> String {
    let ctx = RuleContext {
        suffix,
        quoting_allowed,
    };
    PIPELINE
        .iter()
        .fold(raw.to_string(), |text, rule| (rule.apply)(&text, &ctx))
}

/// Characters treated as junk when glued to a parameter marker.
pub fn is_marker_punctuation(c: char) -> bool {
    matches!(c, ',' | '.' | ';' | ':' | '!' | '?' | '"')
}

/// A whitespace token that, once surrounding punctuation is stripped, starts with `--`.
pub fn marker_core(token: &str) -> Option<&str> {
    let core = token.trim_matches(is_marker_punctuation);
    core.starts_with(MARKER_PREFIX).then_some(core)
}

fn is_marker_key(core: &str) -> bool {
    MARKER_KEYS.iter().any(|key| key.eq_ignore_ascii_case(core))
}

// ────────────────────────────────────────────────────────────────────────────
// Rules
// ────────────────────────────────────────────────────────────────────────────

fn join_lines(text: &str, _ctx: &RuleContext<'_>) -> String {
    text.replace("\r\n", " ")
        .replace(|c: char| matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}'), " ")
}

fn anchor_suffix(text: &str, ctx: &RuleContext<'_>) -> String {
    let text = if ctx.quoting_allowed {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.replace('"', ""))
    };
    match RE_NO_LOGO.captures(&text).and_then(|caps| caps.name("marker")) {
        Some(m) => format!("{}{}", &text[..m.start()], NO_LOGO),
        None => format!("{} {}", text.trim_end(), ctx.suffix),
    }
}

fn strip_marker_punctuation(text: &str, _ctx: &RuleContext<'_>) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut expects_value = false;

    for token in text.split_whitespace() {
        if let Some(core) = marker_core(token) {
            expects_value = is_marker_key(core);
            out.push(core);
        } else if expects_value {
            expects_value = false;
            let value = token.trim_matches(is_marker_punctuation);
            out.push(if value.is_empty() { token } else { value });
        } else {
            out.push(token);
        }
    }

    out.join(" ")
}

fn strip_wrapping_quotes(text: &str, _ctx: &RuleContext<'_>) -> String {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let split = tokens
        .iter()
        .position(|t| marker_core(t).is_some())
        .unwrap_or(tokens.len());

    let joined = tokens[..split].join(" ");
    let mut body = joined.as_str();
    loop {
        let trimmed = body.trim();
        match trimmed
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
        {
            Some(inner) => body = inner,
            None => {
                body = trimmed;
                break;
            }
        }
    }

    let tail = tokens[split..].join(" ");
    format!("{body} {tail}")
}

fn remove_quotes(text: &str, ctx: &RuleContext<'_>) -> String {
    if ctx.quoting_allowed {
        text.to_string()
    } else {
        text.replace('"', "")
    }
}

fn collapse_whitespace(text: &str, _ctx: &RuleContext<'_>) -> String {
    RE_WHITESPACE.replace_all(text, " ").trim().to_string()
}
