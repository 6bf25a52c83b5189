//! Pipeline analyzer that combines tokenizers and filters.
//!
//! This is the main building block for custom analyzers: a tokenizer plus
//! any number of token filters applied in the order they were added.
//!
//! # Examples
//!
//! ```
//! use glaive::analysis::analyzer::Analyzer;
//! use glaive::analysis::analyzer::pipeline::PipelineAnalyzer;
//! use glaive::analysis::tokenizer::regex::RegexTokenizer;
//! use glaive::analysis::token_filter::lowercase::LowercaseFilter;
//! use glaive::analysis::token_filter::stop::StopFilter;
//! use std::sync::Arc;
//!
//! let tokenizer = Arc::new(RegexTokenizer::new().unwrap());
//! let analyzer = PipelineAnalyzer::new(tokenizer)
//!     .add_filter(Arc::new(LowercaseFilter::new()))
//!     .add_filter(Arc::new(StopFilter::from_words(vec!["the", "and"])))
//!     .with_name("my_custom_analyzer");
//!
//! let tokens: Vec<_> = analyzer.analyze("body", "Hello THE world AND test").unwrap().collect();
//!
//! assert_eq!(tokens.len(), 3);
//! assert_eq!(tokens[0].text, "hello");
//! assert_eq!(tokens[1].text, "world");
//! assert_eq!(tokens[2].text, "test");
//! ```

use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::token::TokenIter;
use crate::analysis::token_filter::Filter;
use crate::analysis::tokenizer::Tokenizer;
use crate::error::Result;

/// A configurable analyzer that combines a tokenizer with a chain of filters.
#[derive(Clone)]
pub struct PipelineAnalyzer {
    tokenizer: Arc<dyn Tokenizer>,
    filters: Vec<Arc<dyn Filter>>,
    name: String,
}

impl PipelineAnalyzer {
    /// Create a new pipeline analyzer with the given tokenizer.
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        PipelineAnalyzer {
            name: format!("pipeline_{}", tokenizer.name()),
            tokenizer,
            filters: Vec::new(),
        }
    }

    /// Add a filter to the pipeline.
    pub fn add_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Set a custom name for this analyzer.
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// The configured name.
    pub fn label(&self) -> &str {
        &self.name
    }

    /// Get the tokenizer used by this analyzer.
    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    /// Get the filters used by this analyzer.
    pub fn filters(&self) -> &[Arc<dyn Filter>] {
        &self.filters
    }
}

impl Analyzer for PipelineAnalyzer {
    fn analyze(&self, _field: &str, text: &str) -> Result<TokenIter> {
        let mut tokens = self.tokenizer.tokenize(text)?;
        for filter in &self.filters {
            tokens = filter.filter(tokens)?;
        }
        Ok(tokens)
    }

    fn name(&self) -> &'static str {
        "pipeline"
    }
}

impl std::fmt::Debug for PipelineAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineAnalyzer")
            .field("name", &self.name)
            .field("tokenizer", &self.tokenizer.name())
            .field(
                "filters",
                &self.filters.iter().map(|f| f.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Build `tokenizer -> [lowercase] -> [stop]`, the shape shared by the
/// preset analyzers.
pub(crate) fn preset(
    tokenizer: Arc<dyn Tokenizer>,
    extra: Option<Arc<dyn Filter>>,
    lowercase: bool,
    stop_words: Option<crate::analysis::token_filter::stop::StopFilter>,
    name: &str,
) -> PipelineAnalyzer {
    use crate::analysis::token_filter::lowercase::LowercaseFilter;

    let mut pipeline = PipelineAnalyzer::new(tokenizer).with_name(name);
    if let Some(extra) = extra {
        pipeline = pipeline.add_filter(extra);
    }
    if lowercase {
        pipeline = pipeline.add_filter(Arc::new(LowercaseFilter::new()));
    }
    if let Some(stop) = stop_words {
        pipeline = pipeline.add_filter(Arc::new(stop));
    }
    pipeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::Token;
    use crate::analysis::token_filter::stem::StemFilter;
    use crate::analysis::tokenizer::whitespace::WhitespaceTokenizer;

    /// A host-defined filter dropping short tokens.
    #[derive(Debug)]
    struct MinLength(usize);

    impl Filter for MinLength {
        fn filter(&self, tokens: TokenIter) -> Result<TokenIter> {
            let min = self.0;
            Ok(Box::new(tokens.filter(move |t| t.text.chars().count() >= min)))
        }

        fn name(&self) -> &'static str {
            "min_length"
        }
    }

    #[test]
    fn test_filters_apply_in_order() {
        let analyzer = PipelineAnalyzer::new(Arc::new(WhitespaceTokenizer::new()))
            .add_filter(Arc::new(MinLength(3)))
            .add_filter(Arc::new(StemFilter::new()));

        let tokens: Vec<Token> = analyzer
            .analyze("body", "an ox was jumping over fences")
            .unwrap()
            .collect();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["was", "jump", "over", "fenc"]);
        assert_eq!(tokens[1].start_offset, 10);
    }

    #[test]
    fn test_debug_lists_filters() {
        let analyzer = PipelineAnalyzer::new(Arc::new(WhitespaceTokenizer::new()))
            .add_filter(Arc::new(MinLength(2)));
        let debug = format!("{analyzer:?}");
        assert!(debug.contains("min_length"));
        assert!(debug.contains("pipeline_whitespace"));
    }
}
