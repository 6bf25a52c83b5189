//! Whitespace tokenizer implementation.

use crate::analysis::token::TokenIter;
use crate::analysis::tokenizer::{Tokenizer, split_runs};
use crate::error::Result;

/// A tokenizer that splits text on whitespace.
///
/// The ASCII flavor only treats ASCII blanks as separators, so a
/// non-breaking space stays inside a token.
#[derive(Clone, Debug, Default)]
pub struct WhitespaceTokenizer {
    ascii: bool,
}

impl WhitespaceTokenizer {
    /// Create a Unicode-aware whitespace tokenizer.
    pub fn new() -> Self {
        WhitespaceTokenizer { ascii: false }
    }

    /// Create a tokenizer that only splits on ASCII whitespace.
    pub fn ascii() -> Self {
        WhitespaceTokenizer { ascii: true }
    }
}

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenIter> {
        let tokens = if self.ascii {
            split_runs(text, |c| !c.is_ascii_whitespace())
        } else {
            split_runs(text, |c| !c.is_whitespace())
        };
        Ok(Box::new(tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        if self.ascii { "ascii_whitespace" } else { "whitespace" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_tokenizer() {
        let tokenizer = WhitespaceTokenizer::new();
        let tokens: Vec<_> = tokenizer.tokenize("hello  world\ttest").unwrap().collect();

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].text, "hello");
        assert_eq!(tokens[1].text, "world");
        assert_eq!(tokens[1].start_offset, 7);
        assert_eq!(tokens[2].text, "test");
    }

    #[test]
    fn test_ascii_keeps_unicode_spaces() {
        let text = "a\u{00A0}b c";
        let unicode: Vec<_> = WhitespaceTokenizer::new().tokenize(text).unwrap().collect();
        let ascii: Vec<_> = WhitespaceTokenizer::ascii().tokenize(text).unwrap().collect();
        assert_eq!(unicode.len(), 3);
        assert_eq!(ascii.len(), 2);
        assert_eq!(ascii[0].text, "a\u{00A0}b");
    }

    #[test]
    fn test_empty_text() {
        let tokens: Vec<_> = WhitespaceTokenizer::new().tokenize("   ").unwrap().collect();
        assert!(tokens.is_empty());
    }
}
