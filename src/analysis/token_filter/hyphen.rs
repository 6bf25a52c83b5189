//! Hyphenated word handling.

use crate::analysis::token::{Token, TokenIter};
use crate::analysis::token_filter::Filter;
use crate::error::Result;

/// Indexes a hyphenated word both joined and split.
///
/// `e-mail` becomes `email` followed by `e` stacked on the same position and
/// `mail` one position later, so the queries `email`, `e-mail` and
/// `"e mail"` all match.
#[derive(Clone, Debug, Default)]
pub struct HyphenFilter;

impl HyphenFilter {
    pub fn new() -> Self {
        HyphenFilter
    }

    fn expand(token: Token) -> Vec<Token> {
        let parts: Vec<&str> = token.text.split('-').collect();
        if parts.len() < 2 || parts.iter().any(|p| p.is_empty()) {
            return vec![token];
        }

        let mut out = Vec::with_capacity(parts.len() + 1);
        out.push(Token {
            text: parts.concat(),
            ..token.clone()
        });
        let mut offset = token.start_offset;
        for (i, part) in parts.iter().enumerate() {
            let increment = if i == 0 { 0 } else { 1 };
            out.push(
                Token::new(*part, offset, offset + part.len()).with_position_increment(increment),
            );
            offset += part.len() + 1;
        }
        out
    }
}

impl Filter for HyphenFilter {
    fn filter(&self, tokens: TokenIter) -> Result<TokenIter> {
        Ok(Box::new(tokens.flat_map(Self::expand)))
    }

    fn name(&self) -> &'static str {
        "hyphen"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hyphen_expansion() {
        let tokens = vec![Token::new("e-mail", 0, 6), Token::new("me", 7, 9)];
        let result: Vec<_> = HyphenFilter::new()
            .filter(Box::new(tokens.into_iter()))
            .unwrap()
            .map(|t| (t.text, t.position_increment, t.start_offset))
            .collect();
        assert_eq!(
            result,
            vec![
                ("email".to_string(), 1, 0),
                ("e".to_string(), 0, 0),
                ("mail".to_string(), 1, 2),
                ("me".to_string(), 1, 7),
            ]
        );
    }

    #[test]
    fn test_dangling_hyphens_untouched() {
        let tokens = vec![Token::new("pre-", 0, 4)];
        let result: Vec<_> = HyphenFilter::new()
            .filter(Box::new(tokens.into_iter()))
            .unwrap()
            .collect();
        assert_eq!(result[0].text, "pre-");
    }
}
