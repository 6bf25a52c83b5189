//! Lowercase filter implementation.

use crate::analysis::token::TokenIter;
use crate::analysis::token_filter::Filter;
use crate::error::Result;

/// A filter that converts token text to lowercase. Offsets and position
/// increments are kept.
#[derive(Clone, Debug, Default)]
pub struct LowercaseFilter {
    ascii: bool,
}

impl LowercaseFilter {
    /// Create a Unicode-aware lowercase filter.
    pub fn new() -> Self {
        LowercaseFilter { ascii: false }
    }

    /// Create a filter that only folds `A-Z`.
    pub fn ascii() -> Self {
        LowercaseFilter { ascii: true }
    }
}

impl Filter for LowercaseFilter {
    fn filter(&self, tokens: TokenIter) -> Result<TokenIter> {
        if self.ascii {
            Ok(Box::new(tokens.map(|mut token| {
                token.text.make_ascii_lowercase();
                token
            })))
        } else {
            Ok(Box::new(tokens.map(|mut token| {
                if token.text.chars().any(char::is_uppercase) {
                    token.text = token.text.to_lowercase();
                }
                token
            })))
        }
    }

    fn name(&self) -> &'static str {
        if self.ascii { "ascii_lowercase" } else { "lowercase" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::Token;

    fn run(filter: &LowercaseFilter, words: &[&str]) -> Vec<String> {
        let tokens: Vec<Token> = words.iter().map(|w| Token::new(*w, 0, w.len())).collect();
        filter
            .filter(Box::new(tokens.into_iter()))
            .unwrap()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_lowercase_filter() {
        assert_eq!(
            run(&LowercaseFilter::new(), &["The", "QUICK", "Ärger"]),
            vec!["the", "quick", "ärger"]
        );
    }

    #[test]
    fn test_ascii_lowercase_leaves_non_ascii() {
        assert_eq!(run(&LowercaseFilter::ascii(), &["ÄRGER"]), vec!["Ärger"]);
    }
}
