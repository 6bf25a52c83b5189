//! Analyzers turn a field value into the token stream that gets indexed.
//!
//! Every analyzer is a tokenizer followed by a chain of token filters. The
//! built-in analyzers are thin presets over [`pipeline::PipelineAnalyzer`];
//! [`per_field::PerFieldAnalyzer`] routes each field to its own analyzer.
//! Hosts plug in their own behavior by implementing [`Analyzer`] (or
//! [`Filter`](crate::analysis::token_filter::Filter) /
//! [`Tokenizer`](crate::analysis::tokenizer::Tokenizer)) and handing an
//! `Arc` of it to the writer, the parser or a pipeline.

use crate::analysis::token::TokenIter;
use crate::error::Result;

pub mod keyword;
pub mod letter;
pub mod per_field;
pub mod pipeline;
pub mod regex;
pub mod standard;
pub mod whitespace;

/// Trait for analyzers that convert text into processed tokens.
pub trait Analyzer: Send + Sync + std::fmt::Debug {
    /// Analyze `text` as a value of `field`.
    fn analyze(&self, field: &str, text: &str) -> Result<TokenIter>;

    /// Get the name of this analyzer (for debugging and configuration).
    fn name(&self) -> &'static str;
}
