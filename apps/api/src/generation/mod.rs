// Prompt generation: parameter selection, sanitization, validation, bounded retry.
// All LLM calls go through llm_client.

pub mod command;
pub mod generator;
pub mod handlers;
pub mod orchestrator;
pub mod params;
pub mod prompts;
pub mod sanitizer;
pub mod validator;

#[cfg(test)]
pub mod testing;
