//! Token filter implementations for token transformation.
//!
//! Filters sit after the tokenizer in an analyzer and may rewrite, drop or
//! add tokens.
//!
//! # Available Filters
//!
//! - [`lowercase::LowercaseFilter`] - Converts tokens to lowercase
//! - [`stop::StopFilter`] - Removes stop words, keeping the positional gap
//! - [`stem::StemFilter`] - Snowball stemming
//! - [`hyphen::HyphenFilter`] - Indexes hyphenated words joined and split
//!
//! # Examples
//!
//! ```
//! use glaive::analysis::token_filter::Filter;
//! use glaive::analysis::token_filter::lowercase::LowercaseFilter;
//! use glaive::analysis::token::Token;
//!
//! let filter = LowercaseFilter::new();
//! let tokens = vec![Token::new("Hello", 0, 5), Token::new("WORLD", 6, 11)];
//! let filtered: Vec<_> = filter.filter(Box::new(tokens.into_iter()))
//!     .unwrap()
//!     .collect();
//!
//! assert_eq!(filtered[0].text, "hello");
//! assert_eq!(filtered[1].text, "world");
//! ```

use crate::analysis::token::TokenIter;
use crate::error::Result;

pub mod hyphen;
pub mod lowercase;
pub mod stem;
pub mod stop;

/// Trait for filters that transform token streams.
///
/// Implement this to plug a custom filter into a
/// [`PipelineAnalyzer`](crate::analysis::analyzer::pipeline::PipelineAnalyzer).
pub trait Filter: Send + Sync + std::fmt::Debug {
    /// Apply this filter to a token stream.
    fn filter(&self, tokens: TokenIter) -> Result<TokenIter>;

    /// Get the name of this filter.
    fn name(&self) -> &'static str;
}
