//! Token types for text analysis.
//!
//! A [`Token`] is one unit of analyzed text: its normalized text, the byte
//! range it came from in the original field value, and how many positions
//! it advances past the previous token. Filters that drop tokens (stop
//! words) widen the increment of the next surviving token so phrase
//! queries keep seeing the gap.
//!
//! ```
//! use glaive::analysis::token::Token;
//!
//! let token = Token::new("world", 6, 11);
//! assert_eq!(token.text, "world");
//! assert_eq!(token.position_increment, 1);
//! ```

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::Analyzer;
use crate::error::Result;

/// A single analyzed token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    /// The token's text after filtering.
    pub text: String,
    /// Byte offset of the first character in the source text.
    pub start_offset: usize,
    /// Byte offset one past the last character in the source text.
    pub end_offset: usize,
    /// Positions advanced relative to the previous token. Zero stacks the
    /// token on the previous position.
    pub position_increment: u32,
}

impl Token {
    /// Create a token with a position increment of one.
    pub fn new<S: Into<String>>(text: S, start_offset: usize, end_offset: usize) -> Self {
        Token {
            text: text.into(),
            start_offset,
            end_offset,
            position_increment: 1,
        }
    }

    /// Set the position increment.
    pub fn with_position_increment(mut self, increment: u32) -> Self {
        self.position_increment = increment;
        self
    }

    /// Replace the text, keeping offsets and increment.
    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = text.into();
        self
    }

    /// Length of the token text in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the token text is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Tokens order by where they start, then where they end, then by text.
impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start_offset
            .cmp(&other.start_offset)
            .then(self.end_offset.cmp(&other.end_offset))
            .then_with(|| self.text.cmp(&other.text))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "token[\"{}\":{}:{}:{}]",
            self.text, self.start_offset, self.end_offset, self.position_increment
        )
    }
}

/// Boxed token iterator passed between tokenizers and filters.
pub type TokenIter = Box<dyn Iterator<Item = Token> + Send>;

/// A restartable stream of tokens produced by an analyzer for one field.
///
/// `reset` re-runs the same analyzer over new text, so one stream can be
/// reused for every value of a multi-valued field.
pub struct TokenStream<'a> {
    analyzer: &'a dyn Analyzer,
    field: String,
    text: String,
    tokens: TokenIter,
}

impl<'a> TokenStream<'a> {
    /// Analyze `text` as a value of `field`.
    pub fn new(analyzer: &'a dyn Analyzer, field: &str, text: &str) -> Result<Self> {
        let tokens = analyzer.analyze(field, text)?;
        Ok(TokenStream {
            analyzer,
            field: field.to_string(),
            text: text.to_string(),
            tokens,
        })
    }

    /// Rewind onto new text.
    pub fn reset(&mut self, text: &str) -> Result<()> {
        self.tokens = self.analyzer.analyze(&self.field, text)?;
        self.text.clear();
        self.text.push_str(text);
        Ok(())
    }

    /// The text currently being analyzed.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The field this stream analyzes for.
    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Iterator for TokenStream<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.tokens.next()
    }
}

impl fmt::Debug for TokenStream<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStream")
            .field("analyzer", &self.analyzer.name())
            .field("field", &self.field)
            .field("text", &self.text)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::standard::StandardAnalyzer;

    #[test]
    fn test_token_ordering() {
        let a = Token::new("b", 0, 3);
        let b = Token::new("a", 0, 4);
        let c = Token::new("a", 2, 3);
        let d = Token::new("z", 0, 3);

        let mut tokens = vec![c.clone(), d.clone(), b.clone(), a.clone()];
        tokens.sort();
        assert_eq!(tokens, vec![a, d, b, c]);
    }

    #[test]
    fn test_display() {
        let token = Token::new("fox", 16, 19).with_position_increment(2);
        assert_eq!(token.to_string(), "token[\"fox\":16:19:2]");
    }

    #[test]
    fn test_token_stream_reset() {
        let analyzer = StandardAnalyzer::default();
        let mut stream = TokenStream::new(&analyzer, "body", "Quick Fox").unwrap();
        assert_eq!(stream.text(), "Quick Fox");
        assert_eq!(stream.next().unwrap().text, "quick");

        stream.reset("lazy dogs").unwrap();
        let texts: Vec<String> = stream.by_ref().map(|t| t.text).collect();
        assert_eq!(texts, vec!["lazy", "dogs"]);
        assert_eq!(stream.text(), "lazy dogs");
        assert!(stream.next().is_none());
    }
}
