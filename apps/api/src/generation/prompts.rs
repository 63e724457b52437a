// All LLM prompt constants for the Generation module.

use crate::llm_client::ChatMessage;

/// Sampling temperature used when none is configured.
pub const DEFAULT_TEMPERATURE: f32 = 1.0;

/// System prompt for stock-photo prompt generation.
pub const GENERATION_SYSTEM: &str =
    "You are an assistant that meticulously analyzes the given theme, then composes a single-line prompt \
    aimed at photostocks. These prompts must be:\n\
    - Laconic and minimalistic\n\
    - Not overloaded with details\n\
    - Must include 'copy space'\n\
    - Must be at least 45 words (excluding words starting with --)\n\
    - The first sentence ideally <=100 characters, ends with a period\n\
    No greetings, disclaimers, or multiple prompts in one answer.";

/// Appended after the theme in every user message.
pub const SINGLE_PROMPT_INSTRUCTION: &str =
    "IMPORTANT: Generate ONLY ONE prompt. Follow the system rules strictly.";

/// Builds the ordered system + user messages for one attempt.
pub fn build_messages(theme: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(GENERATION_SYSTEM),
        ChatMessage::user(format!("{theme}\n\n{SINGLE_PROMPT_INSTRUCTION}")),
    ]
}
