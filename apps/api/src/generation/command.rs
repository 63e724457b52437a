//! Free-text command arguments, as typed after the chat command.
//!
//! `"5 misty pine forest"` → 5 prompts about "misty pine forest".
//! `"misty pine forest"`   → the default count.
//! `""`                    → the default count with an empty theme.

use crate::errors::AppError;
use crate::generation::orchestrator::GenerationRequest;

pub fn parse_generate_args(
    args: &str,
    default_count: usize,
) -> Result<GenerationRequest, AppError> {
    let mut tokens = args.split_whitespace().peekable();

    let count = match tokens.peek() {
        Some(&first) if first.chars().all(|c| c.is_ascii_digit()) => {
            let count = first.parse::<usize>().map_err(|_| {
                AppError::Validation(format!("count '{first}' is out of range"))
            })?;
            tokens.next();
            count
        }
        _ => default_count,
    };

    let theme = tokens.collect::<Vec<_>>().join(" ");
    Ok(GenerationRequest::new(count, theme))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_number_is_count() {
        let request = parse_generate_args("5 misty pine forest", 10).unwrap();
        assert_eq!(request.desired_count, 5);
        assert_eq!(request.theme_text, "misty pine forest");
    }

    #[test]
    fn test_theme_only_uses_default_count() {
        let request = parse_generate_args("misty pine forest", 10).unwrap();
        assert_eq!(request.desired_count, 10);
        assert_eq!(request.theme_text, "misty pine forest");
    }

    #[test]
    fn test_empty_args() {
        let request = parse_generate_args("   ", 10).unwrap();
        assert_eq!(request.desired_count, 10);
        assert_eq!(request.theme_text, "");
    }

    #[test]
    fn test_count_only() {
        let request = parse_generate_args("3", 10).unwrap();
        assert_eq!(request.desired_count, 3);
        assert!(request.theme_text.is_empty());
    }

    #[test]
    fn test_number_later_in_theme_is_not_count() {
        let request = parse_generate_args("top 10 beaches", 7).unwrap();
        assert_eq!(request.desired_count, 7);
        assert_eq!(request.theme_text, "top 10 beaches");
    }

    #[test]
    fn test_signed_or_mixed_first_token_is_theme() {
        assert_eq!(parse_generate_args("-3 cats", 10).unwrap().desired_count, 10);
        assert_eq!(parse_generate_args("3rd avenue", 10).unwrap().desired_count, 10);
    }

    #[test]
    fn test_huge_count_is_validation_error() {
        let result = parse_generate_args("99999999999999999999999 cats", 10);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_quotes_in_theme_allow_quoting() {
        let request = parse_generate_args("2 sign saying \"SALE\"", 10).unwrap();
        assert!(request.quoting_allowed());
    }
}
