//! # Glaive
//!
//! An embedded, segment-based inverted-index search engine for Rust.
//!
//! ## Features
//!
//! - Pure Rust implementation
//! - Pluggable analysis pipeline (tokenizers, filters, per-field analyzers)
//! - File and in-memory storage with compound segment files
//! - Single-writer, many-reader indexes with snapshot isolation
//! - Term, phrase, boolean, range, fuzzy, wildcard, prefix and span queries
//! - A query parser with field-aware defaults
//! - TF-IDF scoring with explanations, sorting, filters and highlighting
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use glaive::analysis::StandardAnalyzer;
//! use glaive::index::document::Document;
//! use glaive::index::field_infos::FieldInfos;
//! use glaive::index::reader::IndexReader;
//! use glaive::index::writer::{IndexWriter, IndexWriterConfig, OpenMode};
//! use glaive::query::Query;
//! use glaive::search::searcher::Searcher;
//! use glaive::storage::memory::MemoryStorage;
//!
//! # fn main() -> glaive::error::Result<()> {
//! let storage = Arc::new(MemoryStorage::default());
//! let mut writer = IndexWriter::open(
//!     storage.clone(),
//!     Arc::new(StandardAnalyzer::default()),
//!     OpenMode::Create(FieldInfos::default()),
//!     IndexWriterConfig::default(),
//! )?;
//! writer.add_document(&Document::new().add_field("body", "the quick brown fox"))?;
//! writer.close()?;
//!
//! let searcher = Searcher::new(IndexReader::open(storage)?);
//! let top = searcher.search(&Query::term("body", "fox"), 0, 10)?;
//! assert_eq!(top.total_hits, 1);
//! assert_eq!(top.hits[0].doc, 0);
//! # Ok(())
//! # }
//! ```

use std::sync::{Once, OnceLock};

pub mod analysis;
pub mod error;
pub mod index;
pub mod query;
pub mod search;
pub mod storage;
pub mod util;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

static INIT: Once = Once::new();
static PROGRAM_NAME: OnceLock<String> = OnceLock::new();

/// One-time, process-wide engine initialization.
///
/// Records the program name and warms shared analysis tables. Only the
/// first call has any effect; entry points that need process state call
/// this themselves with the crate name.
pub fn init(program_name: &str) {
    INIT.call_once(|| {
        let _ = PROGRAM_NAME.set(program_name.to_string());
        std::sync::LazyLock::force(&analysis::token_filter::stop::DEFAULT_ENGLISH_STOP_WORDS_SET);
        log::debug!("glaive {VERSION} initialized for {program_name}");
    });
}

/// The name recorded by the first [`init`] call, if any.
pub fn program_name() -> Option<&'static str> {
    PROGRAM_NAME.get().map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init("first");
        let name = program_name().map(str::to_string);
        init("second");
        assert!(name.is_some());
        assert_eq!(program_name().map(str::to_string), name);
    }
}
