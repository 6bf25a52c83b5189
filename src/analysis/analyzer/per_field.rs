//! Per-field analyzer.

use std::sync::Arc;

use ahash::AHashMap;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::token::TokenIter;
use crate::error::Result;

/// Applies a different analyzer to each configured field, falling back to
/// a default for everything else.
///
/// Reuse one analyzer instance for several fields with `Arc::clone`.
///
/// # Example
///
/// ```
/// use glaive::analysis::analyzer::Analyzer;
/// use glaive::analysis::analyzer::keyword::KeywordAnalyzer;
/// use glaive::analysis::analyzer::per_field::PerFieldAnalyzer;
/// use glaive::analysis::analyzer::standard::StandardAnalyzer;
/// use std::sync::Arc;
///
/// let keyword: Arc<dyn Analyzer> = Arc::new(KeywordAnalyzer::new());
/// let mut analyzer = PerFieldAnalyzer::new(Arc::new(StandardAnalyzer::default()));
/// analyzer.add_analyzer("id", Arc::clone(&keyword));
/// analyzer.add_analyzer("category", keyword);
///
/// let tokens: Vec<_> = analyzer.analyze("id", "AB-12").unwrap().collect();
/// assert_eq!(tokens[0].text, "AB-12");
/// ```
#[derive(Clone, Debug)]
pub struct PerFieldAnalyzer {
    default_analyzer: Arc<dyn Analyzer>,
    field_analyzers: AHashMap<String, Arc<dyn Analyzer>>,
}

impl PerFieldAnalyzer {
    /// Create a new per-field analyzer with a default analyzer.
    pub fn new(default_analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            default_analyzer,
            field_analyzers: AHashMap::new(),
        }
    }

    /// Add (or replace) a field-specific analyzer.
    pub fn add_analyzer(&mut self, field: impl Into<String>, analyzer: Arc<dyn Analyzer>) {
        self.field_analyzers.insert(field.into(), analyzer);
    }

    /// Builder form of [`add_analyzer`](Self::add_analyzer).
    pub fn with_analyzer(mut self, field: impl Into<String>, analyzer: Arc<dyn Analyzer>) -> Self {
        self.add_analyzer(field, analyzer);
        self
    }

    /// Get the analyzer for a specific field.
    pub fn get_analyzer(&self, field: &str) -> &Arc<dyn Analyzer> {
        self.field_analyzers
            .get(field)
            .unwrap_or(&self.default_analyzer)
    }

    /// Get the default analyzer.
    pub fn default_analyzer(&self) -> &Arc<dyn Analyzer> {
        &self.default_analyzer
    }
}

impl Analyzer for PerFieldAnalyzer {
    fn analyze(&self, field: &str, text: &str) -> Result<TokenIter> {
        self.get_analyzer(field).analyze(field, text)
    }

    fn name(&self) -> &'static str {
        "per_field"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::keyword::KeywordAnalyzer;
    use crate::analysis::analyzer::standard::StandardAnalyzer;

    #[test]
    fn test_per_field_analyzer() {
        let mut analyzer = PerFieldAnalyzer::new(Arc::new(StandardAnalyzer::default()));
        analyzer.add_analyzer("id", Arc::new(KeywordAnalyzer::new()));

        let text = "Hello World";
        let tokens: Vec<_> = analyzer.analyze("title", text).unwrap().collect();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "hello");
        assert_eq!(tokens[1].text, "world");

        let tokens: Vec<_> = analyzer.analyze("id", text).unwrap().collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "Hello World");
    }

    #[test]
    fn test_default_analyzer_when_field_not_configured() {
        let analyzer = PerFieldAnalyzer::new(Arc::new(KeywordAnalyzer::new()));
        assert_eq!(analyzer.get_analyzer("anything").name(), "keyword");
        assert_eq!(analyzer.default_analyzer().name(), "keyword");
    }
}
