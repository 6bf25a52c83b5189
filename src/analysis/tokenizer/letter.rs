//! Letter tokenizer implementation.

use crate::analysis::token::TokenIter;
use crate::analysis::tokenizer::{Tokenizer, split_runs};
use crate::error::Result;

/// A tokenizer that emits maximal runs of letters; everything else
/// separates tokens.
#[derive(Clone, Debug, Default)]
pub struct LetterTokenizer {
    ascii: bool,
}

impl LetterTokenizer {
    /// Create a Unicode-aware letter tokenizer.
    pub fn new() -> Self {
        LetterTokenizer { ascii: false }
    }

    /// Create a tokenizer that only recognizes `[A-Za-z]`.
    pub fn ascii() -> Self {
        LetterTokenizer { ascii: true }
    }
}

impl Tokenizer for LetterTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenIter> {
        let tokens = if self.ascii {
            split_runs(text, |c| c.is_ascii_alphabetic())
        } else {
            split_runs(text, char::is_alphabetic)
        };
        Ok(Box::new(tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        if self.ascii { "ascii_letter" } else { "letter" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_tokenizer() {
        let tokens: Vec<_> = LetterTokenizer::new()
            .tokenize("Dave's résumé, 2nd-ed")
            .unwrap()
            .map(|t| t.text)
            .collect();
        assert_eq!(tokens, vec!["Dave", "s", "résumé", "nd", "ed"]);
    }

    #[test]
    fn test_ascii_letter_tokenizer() {
        let tokens: Vec<_> = LetterTokenizer::ascii()
            .tokenize("résumé")
            .unwrap()
            .map(|t| t.text)
            .collect();
        assert_eq!(tokens, vec!["r", "sum"]);
    }
}
