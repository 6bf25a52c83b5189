//! Regex analyzer.

use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::pipeline::{PipelineAnalyzer, preset};
use crate::analysis::token::TokenIter;
use crate::analysis::tokenizer::regex::RegexTokenizer;
use crate::error::Result;

/// Emits every match of a pattern, optionally lowercased.
#[derive(Clone, Debug)]
pub struct RegexAnalyzer {
    inner: PipelineAnalyzer,
}

impl RegexAnalyzer {
    /// Fails with an analysis error when `pattern` does not compile.
    pub fn new(pattern: &str, lowercase: bool) -> Result<Self> {
        let tokenizer = RegexTokenizer::with_pattern(pattern)?;
        Ok(RegexAnalyzer {
            inner: preset(Arc::new(tokenizer), None, lowercase, None, "regex"),
        })
    }
}

impl Analyzer for RegexAnalyzer {
    fn analyze(&self, field: &str, text: &str) -> Result<TokenIter> {
        self.inner.analyze(field, text)
    }

    fn name(&self) -> &'static str {
        "regex"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_regex_analyzer() {
        let analyzer = RegexAnalyzer::new(r"[A-Za-z]+\d*", true).unwrap();
        let tokens: Vec<String> = analyzer
            .analyze("f", "Ab12 -- CD3, e")
            .unwrap()
            .map(|t| t.text)
            .collect();
        assert_eq!(tokens, vec!["ab12", "cd3", "e"]);
    }

    #[test]
    fn test_bad_pattern() {
        let err = RegexAnalyzer::new("(unclosed", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Analysis);
    }
}
