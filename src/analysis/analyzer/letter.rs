//! Letter analyzer.

use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::pipeline::{PipelineAnalyzer, preset};
use crate::analysis::token::TokenIter;
use crate::analysis::token_filter::stop::StopFilter;
use crate::analysis::tokenizer::letter::LetterTokenizer;
use crate::error::Result;

/// Emits runs of letters, lowercased by default.
#[derive(Clone, Debug)]
pub struct LetterAnalyzer {
    inner: PipelineAnalyzer,
}

impl LetterAnalyzer {
    pub fn new(lowercase: bool, stop_words: Option<StopFilter>) -> Self {
        LetterAnalyzer {
            inner: preset(
                Arc::new(LetterTokenizer::new()),
                None,
                lowercase,
                stop_words,
                "letter",
            ),
        }
    }

    pub fn ascii(lowercase: bool, stop_words: Option<StopFilter>) -> Self {
        LetterAnalyzer {
            inner: preset(
                Arc::new(LetterTokenizer::ascii()),
                None,
                lowercase,
                stop_words,
                "ascii_letter",
            ),
        }
    }
}

impl Default for LetterAnalyzer {
    fn default() -> Self {
        Self::new(true, None)
    }
}

impl Analyzer for LetterAnalyzer {
    fn analyze(&self, field: &str, text: &str) -> Result<TokenIter> {
        self.inner.analyze(field, text)
    }

    fn name(&self) -> &'static str {
        "letter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_analyzer() {
        let tokens: Vec<(String, usize)> = LetterAnalyzer::default()
            .analyze("f", "R2D2 likes C3PO")
            .unwrap()
            .map(|t| (t.text, t.start_offset))
            .collect();
        assert_eq!(
            tokens,
            vec![
                ("r".to_string(), 0),
                ("d".to_string(), 2),
                ("likes".to_string(), 5),
                ("c".to_string(), 11),
                ("po".to_string(), 13),
            ]
        );
    }
}
