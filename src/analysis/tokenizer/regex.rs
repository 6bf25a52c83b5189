//! Regex-based tokenizer implementation.

use std::sync::Arc;

use regex::Regex;

use crate::analysis::token::{Token, TokenIter};
use crate::analysis::tokenizer::Tokenizer;
use crate::error::{GlaiveError, Result};

/// A tokenizer that emits every non-empty match of a regular expression.
#[derive(Clone, Debug)]
pub struct RegexTokenizer {
    pattern: Arc<Regex>,
}

impl RegexTokenizer {
    /// Default pattern: runs of word characters.
    pub const DEFAULT_PATTERN: &'static str = r"\w+";

    /// Create a new regex tokenizer with the default pattern.
    pub fn new() -> Result<Self> {
        Self::with_pattern(Self::DEFAULT_PATTERN)
    }

    /// Create a new regex tokenizer with a custom pattern.
    pub fn with_pattern(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| GlaiveError::analysis(format!("Invalid regex pattern {pattern:?}: {e}")))?;
        Ok(RegexTokenizer {
            pattern: Arc::new(regex),
        })
    }

    /// Get the regex pattern used by this tokenizer.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl Tokenizer for RegexTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenIter> {
        let tokens: Vec<Token> = self
            .pattern
            .find_iter(text)
            .filter(|m| !m.as_str().is_empty())
            .map(|m| Token::new(m.as_str(), m.start(), m.end()))
            .collect();
        Ok(Box::new(tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "regex"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_tokenizer() {
        let tokenizer = RegexTokenizer::new().unwrap();
        let tokens: Vec<_> = tokenizer.tokenize("hello, world! test123").unwrap().collect();

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].text, "hello");
        assert_eq!(tokens[1].text, "world");
        assert_eq!(tokens[2].text, "test123");
        assert_eq!(tokens[2].start_offset, 14);
    }

    #[test]
    fn test_custom_pattern() {
        let tokenizer = RegexTokenizer::with_pattern(r"[^,]+").unwrap();
        let tokens: Vec<_> = tokenizer
            .tokenize("red,green,,blue")
            .unwrap()
            .map(|t| t.text)
            .collect();
        assert_eq!(tokens, vec!["red", "green", "blue"]);
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(RegexTokenizer::with_pattern("[invalid").is_err());
    }
}
