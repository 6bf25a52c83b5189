//! Identity tokenizer: the whole value is one token.

use crate::analysis::token::{Token, TokenIter};
use crate::analysis::tokenizer::Tokenizer;
use crate::error::Result;

/// A tokenizer that returns the entire input as a single token. Empty
/// input produces no tokens.
#[derive(Clone, Debug, Default)]
pub struct IdentityTokenizer;

impl IdentityTokenizer {
    pub fn new() -> Self {
        IdentityTokenizer
    }
}

impl Tokenizer for IdentityTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenIter> {
        if text.is_empty() {
            return Ok(Box::new(std::iter::empty()));
        }
        Ok(Box::new(std::iter::once(Token::new(text, 0, text.len()))))
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_tokenizer() {
        let tokens: Vec<_> = IdentityTokenizer::new()
            .tokenize("New York City")
            .unwrap()
            .collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "New York City");
        assert_eq!(tokens[0].end_offset, 13);

        assert_eq!(IdentityTokenizer::new().tokenize("").unwrap().count(), 0);
    }
}
