//! Stop filter implementation.
//!
//! ```
//! use glaive::analysis::token_filter::Filter;
//! use glaive::analysis::token_filter::stop::StopFilter;
//! use glaive::analysis::token::Token;
//!
//! let filter = StopFilter::new();
//! let tokens = vec![
//!     Token::new("the", 0, 3),
//!     Token::new("quick", 4, 9),
//! ];
//! let result: Vec<_> = filter.filter(Box::new(tokens.into_iter())).unwrap().collect();
//!
//! assert_eq!(result.len(), 1);
//! assert_eq!(result[0].text, "quick");
//! assert_eq!(result[0].position_increment, 2);
//! ```

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use crate::analysis::token::{Token, TokenIter};
use crate::analysis::token_filter::Filter;
use crate::error::Result;

/// Default English stop words list.
pub const DEFAULT_ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

/// Default English stop words as a shared set.
pub static DEFAULT_ENGLISH_STOP_WORDS_SET: LazyLock<Arc<HashSet<String>>> = LazyLock::new(|| {
    Arc::new(
        DEFAULT_ENGLISH_STOP_WORDS
            .iter()
            .map(|&s| s.to_string())
            .collect(),
    )
});

/// A filter that removes stop words.
///
/// A removed token's position increment is carried onto the next token that
/// survives, so "quick the fox" and "quick fox" do not become adjacent
/// phrases.
#[derive(Clone, Debug)]
pub struct StopFilter {
    stop_words: Arc<HashSet<String>>,
}

impl StopFilter {
    /// Create a stop filter with the default English list.
    pub fn new() -> Self {
        StopFilter {
            stop_words: Arc::clone(&DEFAULT_ENGLISH_STOP_WORDS_SET),
        }
    }

    /// Create a stop filter from a custom word list.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StopFilter {
            stop_words: Arc::new(words.into_iter().map(Into::into).collect()),
        }
    }

    /// Whether `word` is a stop word.
    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// Number of stop words.
    pub fn len(&self) -> usize {
        self.stop_words.len()
    }

    /// Whether the word list is empty.
    pub fn is_empty(&self) -> bool {
        self.stop_words.is_empty()
    }
}

impl Default for StopFilter {
    fn default() -> Self {
        Self::new()
    }
}

struct StopIter {
    inner: TokenIter,
    stop_words: Arc<HashSet<String>>,
}

impl Iterator for StopIter {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let mut skipped = 0;
        for mut token in self.inner.by_ref() {
            if self.stop_words.contains(&token.text) {
                skipped += token.position_increment;
                continue;
            }
            token.position_increment += skipped;
            return Some(token);
        }
        None
    }
}

impl Filter for StopFilter {
    fn filter(&self, tokens: TokenIter) -> Result<TokenIter> {
        Ok(Box::new(StopIter {
            inner: tokens,
            stop_words: Arc::clone(&self.stop_words),
        }))
    }

    fn name(&self) -> &'static str {
        "stop"
    }
}
