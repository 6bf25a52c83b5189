//! Whitespace analyzer.

use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::pipeline::{PipelineAnalyzer, preset};
use crate::analysis::token::TokenIter;
use crate::analysis::token_filter::stop::StopFilter;
use crate::analysis::tokenizer::whitespace::WhitespaceTokenizer;
use crate::error::Result;

/// Splits on whitespace, optionally lowercasing and removing stop words.
#[derive(Clone, Debug)]
pub struct WhitespaceAnalyzer {
    inner: PipelineAnalyzer,
}

impl WhitespaceAnalyzer {
    pub fn new(lowercase: bool, stop_words: Option<StopFilter>) -> Self {
        WhitespaceAnalyzer {
            inner: preset(
                Arc::new(WhitespaceTokenizer::new()),
                None,
                lowercase,
                stop_words,
                "whitespace",
            ),
        }
    }

    pub fn ascii(lowercase: bool, stop_words: Option<StopFilter>) -> Self {
        WhitespaceAnalyzer {
            inner: preset(
                Arc::new(WhitespaceTokenizer::ascii()),
                None,
                lowercase,
                stop_words,
                "ascii_whitespace",
            ),
        }
    }
}

impl Default for WhitespaceAnalyzer {
    fn default() -> Self {
        Self::new(false, None)
    }
}

impl Analyzer for WhitespaceAnalyzer {
    fn analyze(&self, field: &str, text: &str) -> Result<TokenIter> {
        self.inner.analyze(field, text)
    }

    fn name(&self) -> &'static str {
        "whitespace"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_analyzer() {
        let tokens: Vec<String> = WhitespaceAnalyzer::default()
            .analyze("f", "Hello, World!")
            .unwrap()
            .map(|t| t.text)
            .collect();
        assert_eq!(tokens, vec!["Hello,", "World!"]);

        let tokens: Vec<String> = WhitespaceAnalyzer::new(true, Some(StopFilter::new()))
            .analyze("f", "To Be or NOT")
            .unwrap()
            .map(|t| t.text)
            .collect();
        assert!(tokens.is_empty());
    }
}
