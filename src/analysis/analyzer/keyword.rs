//! Keyword analyzer that treats the entire input as a single token.
//!
//! ```
//! use glaive::analysis::analyzer::Analyzer;
//! use glaive::analysis::analyzer::keyword::KeywordAnalyzer;
//!
//! let analyzer = KeywordAnalyzer::new();
//! let tokens: Vec<_> = analyzer.analyze("id", "user-123-abc").unwrap().collect();
//!
//! assert_eq!(tokens.len(), 1);
//! assert_eq!(tokens[0].text, "user-123-abc");
//! ```

use crate::analysis::analyzer::Analyzer;
use crate::analysis::token::TokenIter;
use crate::analysis::tokenizer::Tokenizer;
use crate::analysis::tokenizer::identity::IdentityTokenizer;
use crate::error::Result;

/// Useful for id, tag and category fields matched exactly.
#[derive(Clone, Debug, Default)]
pub struct KeywordAnalyzer {
    tokenizer: IdentityTokenizer,
}

impl KeywordAnalyzer {
    pub fn new() -> Self {
        KeywordAnalyzer {
            tokenizer: IdentityTokenizer::new(),
        }
    }
}

impl Analyzer for KeywordAnalyzer {
    fn analyze(&self, _field: &str, text: &str) -> Result<TokenIter> {
        self.tokenizer.tokenize(text)
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}
