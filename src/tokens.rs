//! Token-equivalent estimation for context budgeting.
//!
//! The budget unit is an approximation: one token per four characters,
//! rounded up. Exact tokenizer counts are not needed for budgeting and
//! would tie the estimate to a specific model.

/// Characters per token-equivalent.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimates the token-equivalent cost of a piece of text.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_string() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn test_exact_multiple() {
        assert_eq!(estimate_tokens("twelve chars"), 3); // 12 / 4
    }

    #[test]
    fn test_rounds_up() {
        assert_eq!(estimate_tokens("hello"), 2); // 5 chars -> 2
        assert_eq!(estimate_tokens("a"), 1);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // 4 multibyte characters estimate as 1 token
        assert_eq!(estimate_tokens("こんにち"), 1);
    }
}
