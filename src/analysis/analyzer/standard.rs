//! Standard analyzer that provides good defaults for most use cases.
//!
//! # Pipeline
//!
//! 1. StandardTokenizer (words, acronyms, numbers, e-mail addresses, hosts)
//! 2. HyphenFilter
//! 3. LowercaseFilter
//! 4. StopFilter (33 common English stop words)
//!
//! # Examples
//!
//! ```
//! use glaive::analysis::analyzer::Analyzer;
//! use glaive::analysis::analyzer::standard::StandardAnalyzer;
//!
//! let analyzer = StandardAnalyzer::default();
//! let tokens: Vec<_> = analyzer.analyze("body", "Hello the world and test").unwrap().collect();
//!
//! assert_eq!(tokens.len(), 3);
//! assert_eq!(tokens[0].text, "hello");
//! assert_eq!(tokens[1].text, "world");
//! assert_eq!(tokens[1].position_increment, 2);
//! ```

use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::pipeline::{PipelineAnalyzer, preset};
use crate::analysis::token::TokenIter;
use crate::analysis::token_filter::hyphen::HyphenFilter;
use crate::analysis::token_filter::stop::StopFilter;
use crate::analysis::tokenizer::standard::StandardTokenizer;
use crate::error::Result;

/// The default analyzer for free text.
#[derive(Clone, Debug)]
pub struct StandardAnalyzer {
    inner: PipelineAnalyzer,
}

impl StandardAnalyzer {
    /// Create a standard analyzer.
    ///
    /// `stop_words` of `None` disables stop word removal.
    pub fn new(lowercase: bool, stop_words: Option<StopFilter>) -> Self {
        Self::build(StandardTokenizer::new(), lowercase, stop_words)
    }

    /// Same pipeline with ASCII-only character classification.
    pub fn ascii(lowercase: bool, stop_words: Option<StopFilter>) -> Self {
        Self::build(StandardTokenizer::ascii(), lowercase, stop_words)
    }

    /// Lowercasing standard analyzer that keeps stop words.
    pub fn without_stop_words() -> Self {
        Self::new(true, None)
    }

    fn build(tokenizer: StandardTokenizer, lowercase: bool, stop_words: Option<StopFilter>) -> Self {
        crate::init(env!("CARGO_PKG_NAME"));
        StandardAnalyzer {
            inner: preset(
                Arc::new(tokenizer),
                Some(Arc::new(HyphenFilter::new())),
                lowercase,
                stop_words,
                "standard",
            ),
        }
    }

    /// Get the inner pipeline analyzer.
    pub fn inner(&self) -> &PipelineAnalyzer {
        &self.inner
    }
}

impl Default for StandardAnalyzer {
    fn default() -> Self {
        Self::new(true, Some(StopFilter::new()))
    }
}

impl Analyzer for StandardAnalyzer {
    fn analyze(&self, field: &str, text: &str) -> Result<TokenIter> {
        self.inner.analyze(field, text)
    }

    fn name(&self) -> &'static str {
        "standard"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(analyzer: &StandardAnalyzer, text: &str) -> Vec<String> {
        analyzer.analyze("f", text).unwrap().map(|t| t.text).collect()
    }

    #[test]
    fn test_standard_analyzer() {
        let analyzer = StandardAnalyzer::default();
        assert_eq!(
            texts(&analyzer, "The Quick e-mail from DAVE@example.com"),
            vec!["quick", "email", "e", "mail", "from", "dave@example.com"]
        );
    }

    #[test]
    fn test_options() {
        let analyzer = StandardAnalyzer::new(false, None);
        assert_eq!(texts(&analyzer, "The Fox"), vec!["The", "Fox"]);

        let analyzer = StandardAnalyzer::new(true, Some(StopFilter::from_words(["fox"])));
        assert_eq!(texts(&analyzer, "The Fox"), vec!["the"]);

        assert_eq!(
            texts(&StandardAnalyzer::without_stop_words(), "the end"),
            vec!["the", "end"]
        );
    }
}
