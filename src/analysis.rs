//! Text analysis: tokenizers, token filters and the analyzers built from
//! them.
//!
//! ```
//! use glaive::analysis::{Analyzer, StandardAnalyzer};
//!
//! let analyzer = StandardAnalyzer::default();
//! let tokens: Vec<_> = analyzer.analyze("body", "The Quick Brown Fox").unwrap().collect();
//! assert_eq!(tokens[0].text, "quick");
//! ```

pub mod analyzer;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

pub use analyzer::Analyzer;
pub use analyzer::keyword::KeywordAnalyzer;
pub use analyzer::letter::LetterAnalyzer;
pub use analyzer::per_field::PerFieldAnalyzer;
pub use analyzer::pipeline::PipelineAnalyzer;
pub use analyzer::regex::RegexAnalyzer;
pub use analyzer::standard::StandardAnalyzer;
pub use analyzer::whitespace::WhitespaceAnalyzer;
pub use token::{Token, TokenIter, TokenStream};
pub use token_filter::Filter;
pub use tokenizer::Tokenizer;
