//! Tokenizer implementations for text analysis.
//!
//! Tokenizers are the first step of an analyzer: they split a field value
//! into tokens with byte offsets. Every built-in tokenizer except
//! [`identity::IdentityTokenizer`] and [`regex::RegexTokenizer`] comes in an
//! ASCII flavor and a Unicode-aware flavor.
//!
//! # Available Tokenizers
//!
//! - [`identity::IdentityTokenizer`] - Treats the entire text as one token
//! - [`letter::LetterTokenizer`] - Maximal runs of letters
//! - [`whitespace::WhitespaceTokenizer`] - Splits on whitespace
//! - [`standard::StandardTokenizer`] - Words, numbers, acronyms, e-mails, hosts
//! - [`regex::RegexTokenizer`] - Custom regex-based tokenization
//!
//! # Examples
//!
//! ```
//! use glaive::analysis::tokenizer::Tokenizer;
//! use glaive::analysis::tokenizer::whitespace::WhitespaceTokenizer;
//!
//! let tokenizer = WhitespaceTokenizer::new();
//! let tokens: Vec<_> = tokenizer.tokenize("Hello world").unwrap().collect();
//! assert_eq!(tokens.len(), 2);
//! ```

use crate::analysis::token::{Token, TokenIter};
use crate::error::Result;

pub mod identity;
pub mod letter;
pub mod regex;
pub mod standard;
pub mod whitespace;

/// Trait for tokenizers that convert text into tokens.
pub trait Tokenizer: Send + Sync + std::fmt::Debug {
    /// Split `text` into tokens.
    fn tokenize(&self, text: &str) -> Result<TokenIter>;

    /// Name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;
}

/// Collect maximal runs of characters accepted by `keep` as tokens.
pub(crate) fn split_runs<F>(text: &str, keep: F) -> Vec<Token>
where
    F: Fn(char) -> bool,
{
    let mut tokens = Vec::new();
    let mut start = None;

    for (i, c) in text.char_indices() {
        match (keep(c), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                tokens.push(Token::new(&text[s..i], s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push(Token::new(&text[s..], s, text.len()));
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_runs_offsets() {
        let tokens = split_runs("ab  cd e", |c| !c.is_whitespace());
        let spans: Vec<_> = tokens
            .iter()
            .map(|t| (t.text.as_str(), t.start_offset, t.end_offset))
            .collect();
        assert_eq!(spans, vec![("ab", 0, 2), ("cd", 4, 6), ("e", 7, 8)]);
    }

    #[test]
    fn test_split_runs_repeated_words() {
        let tokens = split_runs("to be or not to be", |c| c.is_alphabetic());
        assert_eq!(tokens[4].start_offset, 13);
        assert_eq!(tokens[5].start_offset, 16);
    }
}
