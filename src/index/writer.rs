//! The single writer of an index.
//!
//! An [`IndexWriter`] holds the store's write lock for its whole life.
//! Documents are inverted into an in-memory buffer; a flush writes the
//! buffer as a new segment, merges segments under the tiered policy and then
//! commits a new segments file. Readers opened before the commit keep seeing
//! the previous state.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use glaive::analysis::analyzer::standard::StandardAnalyzer;
//! use glaive::index::document::Document;
//! use glaive::index::field_infos::FieldInfos;
//! use glaive::index::writer::{IndexWriter, IndexWriterConfig, OpenMode};
//! use glaive::storage::Storage;
//! use glaive::storage::memory::MemoryStorage;
//!
//! # fn main() -> glaive::error::Result<()> {
//! let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::default());
//! let mut writer = IndexWriter::open(
//!     storage,
//!     Arc::new(StandardAnalyzer::default()),
//!     OpenMode::Create(FieldInfos::default()),
//!     IndexWriterConfig::default(),
//! )?;
//! writer.add_document(&Document::new().add_field("id", "1").add_field("body", "hello"))?;
//! writer.delete_term("id", "1")?;
//! assert_eq!(writer.doc_count(), 0);
//! writer.close()?;
//! # Ok(())
//! # }
//! ```

use std::ops::Range;
use std::sync::Arc;

use bit_vec::BitVec;
use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::Analyzer;
use crate::error::{GlaiveError, Result};
use crate::index::document::Document;
use crate::index::field_infos::FieldInfos;
use crate::index::merge_policy::{MergePolicy, TieredMergePolicy};
use crate::index::merger::merge_segments;
use crate::index::postings::DocumentBuffer;
use crate::index::segment_infos::SegmentInfos;
use crate::index::segment_reader::{SegmentReader, write_deletions};
use crate::index::segment_writer::{SegmentWriteOptions, write_segment};
use crate::index::term::Term;
use crate::storage::{Lock, Storage, WRITE_LOCK_NAME};

/// Index writer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexWriterConfig {
    /// Copy buffer size used when packing compound files.
    pub chunk_size: usize,

    /// Maximum memory usage for buffering (in bytes).
    pub max_buffer_memory: usize,

    /// Every `index_interval`-th term is kept in the in-memory term index.
    pub index_interval: u32,

    /// Postings get a skip entry every `skip_interval` documents.
    pub skip_interval: u32,

    /// Number of same-sized segments that trigger a merge.
    pub merge_factor: u32,

    /// Maximum number of documents to buffer before flushing.
    pub max_buffered_docs: u32,

    /// Merges never produce segments larger than this.
    pub max_merge_docs: u32,

    /// Tokens indexed per field and document; the rest are dropped.
    pub max_field_length: usize,

    /// Pack each segment into a single `.cfs` file.
    pub use_compound_file: bool,
}

impl Default for IndexWriterConfig {
    fn default() -> Self {
        IndexWriterConfig {
            chunk_size: 1024 * 1024,              // 1MB
            max_buffer_memory: 16 * 1024 * 1024, // 16MB
            index_interval: 128,
            skip_interval: 16,
            merge_factor: 10,
            max_buffered_docs: 10_000,
            max_merge_docs: u32::MAX,
            max_field_length: 10_000,
            use_compound_file: true,
        }
    }
}

impl IndexWriterConfig {
    /// Parse a config from JSON. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: IndexWriterConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the writer cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.index_interval == 0 || self.skip_interval == 0 {
            return Err(GlaiveError::configuration(format!(
                "index_interval ({}) and skip_interval ({}) must be positive",
                self.index_interval, self.skip_interval
            )));
        }
        if self.merge_factor < 2 {
            return Err(GlaiveError::configuration(format!(
                "merge_factor must be at least 2, got {}",
                self.merge_factor
            )));
        }
        if self.chunk_size == 0 || self.max_buffered_docs == 0 {
            return Err(GlaiveError::configuration(
                "chunk_size and max_buffered_docs must be positive",
            ));
        }
        Ok(())
    }

    fn write_options(&self) -> SegmentWriteOptions {
        SegmentWriteOptions {
            index_interval: self.index_interval,
            skip_interval: self.skip_interval,
            use_compound_file: self.use_compound_file,
            chunk_size: self.chunk_size,
        }
    }

    fn merge_policy(&self) -> TieredMergePolicy {
        TieredMergePolicy::new(self.merge_factor, self.max_merge_docs)
    }
}

/// What to do with the store when opening a writer.
#[derive(Debug, Clone)]
pub enum OpenMode {
    /// Start a new index with this schema, discarding any existing one.
    Create(FieldInfos),
    /// Open the existing index, or create one with this schema.
    CreateIfMissing(FieldInfos),
    /// Open the existing index; fails with `NotFound` if there is none.
    Append,
}

/// Adds and deletes documents.
#[derive(Debug)]
pub struct IndexWriter {
    storage: Arc<dyn Storage>,
    analyzer: Arc<dyn Analyzer>,
    config: IndexWriterConfig,
    infos: SegmentInfos,
    buffer: DocumentBuffer,
    lock: Option<Box<dyn Lock>>,
}

impl IndexWriter {
    /// Obtain the write lock and open the index. Fails fast with a lock
    /// error when another writer holds it.
    pub fn open(
        storage: Arc<dyn Storage>,
        analyzer: Arc<dyn Analyzer>,
        mode: OpenMode,
        config: IndexWriterConfig,
    ) -> Result<Self> {
        crate::init(env!("CARGO_PKG_NAME"));
        config.validate()?;

        let mut lock = storage.make_lock(WRITE_LOCK_NAME)?;
        if !lock.obtain()? {
            return Err(GlaiveError::lock(format!(
                "{WRITE_LOCK_NAME} lock is held by another writer"
            )));
        }
        log::debug!("obtained {WRITE_LOCK_NAME} lock");

        let exists = SegmentInfos::exists(storage.as_ref());
        let infos = match (mode, exists) {
            (OpenMode::Append, false) => {
                return Err(GlaiveError::not_found("no index to append to: segments file missing"));
            }
            (OpenMode::Append, true) | (OpenMode::CreateIfMissing(_), true) => SegmentInfos::read(storage.as_ref())?,
            (OpenMode::Create(field_infos), _) | (OpenMode::CreateIfMissing(field_infos), false) => {
                let mut infos = SegmentInfos::new(field_infos);
                // Segment names never repeat within one store, so readers
                // of the old index cannot mistake a new segment for theirs.
                if exists && let Ok(previous) = SegmentInfos::read(storage.as_ref()) {
                    infos.version = infos.version.max(previous.version + 1);
                    infos.counter = infos.counter.max(previous.counter);
                }
                infos.write(storage.as_ref())?;
                infos.remove_unreferenced_files(storage.as_ref())?;
                log::debug!("created index at version {}", infos.version);
                infos
            }
        };

        Ok(IndexWriter {
            storage,
            analyzer,
            config,
            infos,
            buffer: DocumentBuffer::new(),
            lock: Some(lock),
        })
    }

    fn check_open(&self) -> Result<()> {
        if self.lock.is_none() {
            return Err(GlaiveError::storage("index writer is closed"));
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.lock.is_none()
    }

    /// Analyze `doc` and buffer it. Flushes when the buffer reaches
    /// `max_buffered_docs` documents or `max_buffer_memory` bytes.
    pub fn add_document(&mut self, doc: &Document) -> Result<()> {
        self.check_open()?;
        self.buffer.add_document(
            doc,
            &mut self.infos.field_infos,
            self.analyzer.as_ref(),
            self.config.max_field_length,
        )?;
        if self.buffer.num_docs() >= self.config.max_buffered_docs
            || self.buffer.memory_usage() >= self.config.max_buffer_memory
        {
            log::debug!(
                "buffer full ({} docs, {} bytes), flushing",
                self.buffer.num_docs(),
                self.buffer.memory_usage()
            );
            self.flush()?;
        }
        Ok(())
    }

    /// Replace every document containing `field:text` with `doc`.
    pub fn update_document(&mut self, field: &str, text: &str, doc: &Document) -> Result<()> {
        self.delete_term(field, text)?;
        self.add_document(doc)
    }

    /// Delete every document containing `field:text`, buffered ones
    /// included, and commit. Returns the number of documents deleted.
    pub fn delete_term(&mut self, field: &str, text: &str) -> Result<u32> {
        self.delete_terms(&[Term::new(field, text)])
    }

    /// Delete every document containing any of `terms` and commit.
    pub fn delete_terms(&mut self, terms: &[Term]) -> Result<u32> {
        self.check_open()?;
        let flushed = self.flush_buffer()?;
        let deleted = self.apply_deletes(terms)?;
        if flushed || deleted > 0 {
            self.commit_infos()?;
        }
        log::debug!("deleted {deleted} documents for {} terms", terms.len());
        Ok(deleted)
    }

    fn apply_deletes(&mut self, terms: &[Term]) -> Result<u32> {
        let field_infos = Arc::new(self.infos.field_infos.clone());
        let mut total = 0;
        for info in &mut self.infos.segments {
            let reader = SegmentReader::open(self.storage.as_ref(), info, Arc::clone(&field_infos))?;
            let mut bits = match reader.deleted_docs() {
                Some(bits) => BitVec::clone(bits),
                None => BitVec::from_elem(reader.max_doc() as usize, false),
            };
            let mut newly = 0;
            for term in terms {
                let mut docs = reader.term_docs_for(&term.field, &term.text)?;
                while docs.next()? {
                    if !bits.get(docs.doc() as usize).unwrap_or(true) {
                        bits.set(docs.doc() as usize, true);
                        newly += 1;
                    }
                }
            }
            if newly > 0 {
                let generation = info.del_gen + 1;
                info.del_count = write_deletions(self.storage.as_ref(), info, generation, &bits)?;
                info.del_gen = generation;
                total += newly;
            }
        }
        Ok(total)
    }

    /// Write buffered documents as a new segment, merge as the policy asks
    /// and commit.
    pub fn flush(&mut self) -> Result<()> {
        self.check_open()?;
        self.flush_buffer()?;
        self.maybe_merge()?;
        self.commit_infos()
    }

    /// Same as [`flush`](Self::flush).
    pub fn commit(&mut self) -> Result<()> {
        self.flush()
    }

    /// Merge all segments into one, dropping deleted documents, and commit.
    pub fn optimize(&mut self) -> Result<()> {
        self.check_open()?;
        self.flush_buffer()?;
        let count = self.infos.segments.len();
        if count > 1 || self.infos.segments.first().is_some_and(|s| s.has_deletions()) {
            self.merge_range(0..count)?;
        }
        self.commit_infos()
    }

    fn flush_buffer(&mut self) -> Result<bool> {
        if self.buffer.is_empty() {
            return Ok(false);
        }
        let content = self.buffer.take();
        let name = self.infos.next_segment_name();
        match write_segment(
            self.storage.as_ref(),
            &name,
            &content,
            &self.infos.field_infos,
            self.config.write_options(),
        ) {
            Ok(info) => {
                self.infos.segments.push(info);
                Ok(true)
            }
            Err(e) => {
                self.buffer.restore(content);
                Err(e)
            }
        }
    }

    fn maybe_merge(&mut self) -> Result<()> {
        let policy = self.config.merge_policy();
        while let Some(range) = policy.find_merge(&self.infos.segments) {
            self.merge_range(range)?;
        }
        Ok(())
    }

    fn merge_range(&mut self, range: Range<usize>) -> Result<()> {
        let field_infos = Arc::new(self.infos.field_infos.clone());
        let readers = self.infos.segments[range.clone()]
            .iter()
            .map(|info| SegmentReader::open(self.storage.as_ref(), info, Arc::clone(&field_infos)))
            .collect::<Result<Vec<_>>>()?;
        let refs: Vec<&SegmentReader> = readers.iter().collect();
        let content = merge_segments(&refs, &field_infos)?;

        let merged = if content.doc_count == 0 {
            None
        } else {
            let name = self.infos.next_segment_name();
            Some(write_segment(
                self.storage.as_ref(),
                &name,
                &content,
                &field_infos,
                self.config.write_options(),
            )?)
        };
        log::debug!(
            "merged {} segments into {}",
            range.len(),
            merged.as_ref().map_or("nothing", |s| s.name.as_str())
        );
        self.infos.segments.splice(range, merged);
        Ok(())
    }

    fn commit_infos(&mut self) -> Result<()> {
        self.infos.version += 1;
        self.infos.write(self.storage.as_ref())?;
        self.infos.remove_unreferenced_files(self.storage.as_ref())?;
        Ok(())
    }

    /// Flush, commit and release the write lock. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.lock.is_none() {
            return Ok(());
        }
        let result = self.flush();
        if let Some(mut lock) = self.lock.take() {
            lock.release()?;
            log::debug!("released {WRITE_LOCK_NAME} lock");
        }
        result
    }

    /// Live documents, buffered ones included.
    pub fn doc_count(&self) -> u64 {
        self.infos.num_docs() + self.buffer.num_docs() as u64
    }

    /// Version of the last commit.
    pub fn version(&self) -> u64 {
        self.infos.version
    }

    pub fn segment_count(&self) -> usize {
        self.infos.segments.len()
    }

    pub fn config(&self) -> &IndexWriterConfig {
        &self.config
    }

    /// Replace the configuration. Takes effect on the next flush or merge.
    pub fn set_config(&mut self, config: IndexWriterConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Schema including fields first seen in buffered documents.
    pub fn field_infos(&self) -> &FieldInfos {
        &self.infos.field_infos
    }

    pub fn analyzer(&self) -> &Arc<dyn Analyzer> {
        &self.analyzer
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }
}

impl Drop for IndexWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("failed to close index writer: {e}");
        }
    }
}
