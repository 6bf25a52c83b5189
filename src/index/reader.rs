//! Point-in-time view over every segment of an index.
//!
//! An [`IndexReader`] is opened against the segments file committed at the
//! time of the call and never changes afterwards. Global document ids are
//! the concatenation of the segments' local ids in commit order; a global id
//! resolves to `(segment, local)` through the cumulative `starts` table.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::error::{ErrorKind, GlaiveError, Result};
use crate::index::document::Document;
use crate::index::field_infos::FieldInfos;
use crate::index::lazy_doc::LazyDoc;
use crate::index::segment_infos::SegmentInfos;
use crate::index::segment_reader::{SegmentReader, SegmentTermDocs, SegmentTermEnum};
use crate::index::term::Term;
use crate::index::term_vector::TermVector;
use crate::storage::Storage;

/// How often `open` retries when a commit removes files mid-open.
const OPEN_RETRIES: usize = 5;

/// A read-only snapshot of an index.
#[derive(Debug, Clone)]
pub struct IndexReader {
    storage: Arc<dyn Storage>,
    version: u64,
    field_infos: Arc<FieldInfos>,
    segments: Vec<Arc<SegmentReader>>,
    starts: Vec<u32>,
    num_docs: u32,
    norms_cache: Arc<Mutex<AHashMap<String, Arc<[u8]>>>>,
}

impl IndexReader {
    /// Open the latest commit in `storage`.
    pub fn open(storage: Arc<dyn Storage>) -> Result<Self> {
        crate::init(env!("CARGO_PKG_NAME"));
        let mut attempt = 0;
        loop {
            let infos = SegmentInfos::read(storage.as_ref())?;
            match Self::build(Arc::clone(&storage), infos, &[]) {
                Ok(reader) => return Ok(reader),
                Err(e) if e.kind() == ErrorKind::NotFound && attempt < OPEN_RETRIES => {
                    attempt += 1;
                    log::debug!("segment files changed while opening ({e}), retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn build(storage: Arc<dyn Storage>, infos: SegmentInfos, previous: &[Arc<SegmentReader>]) -> Result<Self> {
        let field_infos = Arc::new(infos.field_infos.clone());
        let mut segments = Vec::with_capacity(infos.segments.len());
        let mut starts = Vec::with_capacity(infos.segments.len() + 1);
        let mut max_doc = 0u32;
        let mut num_docs = 0u32;
        for info in &infos.segments {
            let reader = match previous.iter().find(|r| r.name() == info.name) {
                Some(old) => old.reopen(storage.as_ref(), info)?,
                None => SegmentReader::open(storage.as_ref(), info, Arc::clone(&field_infos))?,
            };
            starts.push(max_doc);
            max_doc = max_doc
                .checked_add(reader.max_doc())
                .ok_or_else(|| GlaiveError::corrupt("index holds more than u32::MAX documents"))?;
            num_docs += reader.num_docs();
            segments.push(Arc::new(reader));
        }
        starts.push(max_doc);
        log::debug!(
            "opened reader at version {} over {} segments ({num_docs}/{max_doc} docs)",
            infos.version,
            segments.len()
        );
        Ok(IndexReader {
            storage,
            version: infos.version,
            field_infos,
            segments,
            starts,
            num_docs,
            norms_cache: Arc::new(Mutex::new(AHashMap::new())),
        })
    }

    /// A reader over the latest commit. Unchanged segments are shared with
    /// this reader; if nothing was committed since, the result is
    /// equivalent to this reader.
    pub fn reopen(&self) -> Result<Self> {
        let infos = SegmentInfos::read(self.storage.as_ref())?;
        if infos.version == self.version {
            return Ok(self.clone());
        }
        Self::build(Arc::clone(&self.storage), infos, &self.segments)
    }

    /// Whether no commit happened since this reader was opened.
    pub fn is_latest(&self) -> Result<bool> {
        Ok(SegmentInfos::read_version(self.storage.as_ref())? == self.version)
    }

    /// Version of the commit this reader sees.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn field_infos(&self) -> &FieldInfos {
        &self.field_infos
    }

    pub fn field_names(&self) -> Vec<String> {
        self.field_infos.field_names().into_iter().map(str::to_string).collect()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> &[Arc<SegmentReader>] {
        &self.segments
    }

    /// Global id of the first document of each segment.
    pub fn starts(&self) -> &[u32] {
        &self.starts[..self.segments.len()]
    }

    /// Live documents.
    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    /// One past the largest document id, deleted documents included.
    pub fn max_doc(&self) -> u32 {
        self.starts.last().copied().unwrap_or(0)
    }

    pub fn has_deletions(&self) -> bool {
        self.num_docs < self.max_doc()
    }

    fn locate(&self, doc: u32) -> Result<(usize, u32)> {
        if doc >= self.max_doc() {
            return Err(GlaiveError::not_found(format!(
                "document {doc} out of range (max_doc {})",
                self.max_doc()
            )));
        }
        let index = self.starts.partition_point(|&start| start <= doc) - 1;
        Ok((index, doc - self.starts[index]))
    }

    /// Whether `doc` is deleted. Ids past the end count as deleted.
    pub fn is_deleted(&self, doc: u32) -> bool {
        match self.locate(doc) {
            Ok((index, local)) => self.segments[index].is_deleted(local),
            Err(_) => true,
        }
    }

    /// Stored fields of `doc`, decoded on access. Deleted documents keep
    /// their stored data until a merge drops them.
    pub fn get_lazy_doc(&self, doc: u32) -> Result<LazyDoc> {
        let (index, local) = self.locate(doc)?;
        let mut lazy = self.segments[index].document(local)?;
        lazy.set_doc(doc);
        Ok(lazy)
    }

    /// Stored fields of `doc`, fully decoded.
    pub fn get_document(&self, doc: u32) -> Result<Document> {
        self.get_lazy_doc(doc)?.load()
    }

    pub fn term_vectors(&self, doc: u32) -> Result<Vec<TermVector>> {
        let (index, local) = self.locate(doc)?;
        self.segments[index].term_vectors(local)
    }

    pub fn term_vector(&self, doc: u32, field: &str) -> Result<Option<TermVector>> {
        let (index, local) = self.locate(doc)?;
        self.segments[index].term_vector(local, field)
    }

    /// Documents containing `term`, deleted ones included.
    pub fn doc_freq(&self, term: &Term) -> Result<u32> {
        let mut total = 0;
        for segment in &self.segments {
            total += segment.doc_freq(&term.field, &term.text)?;
        }
        Ok(total)
    }

    /// Sorted terms of `field`.
    pub fn terms(&self, field: &str) -> Result<TermEnum> {
        self.terms_from(&Term::new(field, ""))
    }

    /// Sorted terms of `term.field`, starting at the first term `>= term`.
    pub fn terms_from(&self, term: &Term) -> Result<TermEnum> {
        let mut enums = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            let mut terms = segment.terms();
            terms.seek(&term.field, &term.text)?;
            enums.push(terms);
        }
        Ok(TermEnum {
            field: term.field.clone(),
            segments: enums,
            current: None,
            doc_freq: 0,
            exhausted: false,
        })
    }

    /// Live documents containing `term`, with frequencies and positions.
    pub fn term_docs(&self, term: &Term) -> Result<TermDocEnum> {
        let mut segments = Vec::with_capacity(self.segments.len());
        for (segment, &base) in self.segments.iter().zip(&self.starts) {
            let docs = segment.term_docs_for(&term.field, &term.text)?;
            segments.push((base, base + segment.max_doc(), docs));
        }
        Ok(TermDocEnum {
            segments,
            current: 0,
            started: false,
        })
    }

    /// Same enumerator as [`term_docs`](Self::term_docs); positions are
    /// read through `next_position`.
    pub fn term_positions(&self, term: &Term) -> Result<TermDocEnum> {
        self.term_docs(term)
    }

    /// Norm bytes of `field` for every document, 0 where a segment has none.
    /// `None` when no field of that name exists.
    pub fn norms(&self, field: &str) -> Option<Arc<[u8]>> {
        self.field_infos.get(field)?;
        let mut cache = self.norms_cache.lock();
        if let Some(norms) = cache.get(field) {
            return Some(Arc::clone(norms));
        }
        let mut out = Vec::with_capacity(self.max_doc() as usize);
        for segment in &self.segments {
            match segment.norms(field) {
                Some(column) => out.extend_from_slice(&column),
                None => out.resize(out.len() + segment.max_doc() as usize, 0),
            }
        }
        let norms: Arc<[u8]> = Arc::from(out.into_boxed_slice());
        cache.insert(field.to_string(), Arc::clone(&norms));
        Some(norms)
    }
}

/// Sorted enumeration of one field's terms across all segments.
///
/// Call [`next`](Self::next) before reading the first term.
#[derive(Debug)]
pub struct TermEnum {
    field: String,
    segments: Vec<SegmentTermEnum>,
    current: Option<String>,
    doc_freq: u32,
    exhausted: bool,
}

impl TermEnum {
    fn in_field(&self, terms: &SegmentTermEnum) -> bool {
        terms.is_valid() && terms.field() == self.field
    }

    fn select(&mut self) -> bool {
        let smallest = self
            .segments
            .iter()
            .filter(|t| self.in_field(t))
            .map(SegmentTermEnum::text)
            .min()
            .map(str::to_string);
        self.doc_freq = match &smallest {
            Some(text) => self
                .segments
                .iter()
                .filter(|t| self.in_field(t) && t.text() == text)
                .map(SegmentTermEnum::doc_freq)
                .sum(),
            None => 0,
        };
        self.current = smallest;
        self.exhausted = self.current.is_none();
        !self.exhausted
    }

    /// Advance to the next distinct term.
    pub fn next(&mut self) -> Result<bool> {
        if let Some(current) = self.current.take() {
            for terms in &mut self.segments {
                if terms.is_valid() && terms.field() == self.field && terms.text() == current {
                    terms.next()?;
                }
            }
        }
        Ok(self.select())
    }

    /// Move to the first term `>= text`. Never moves backwards.
    pub fn skip_to(&mut self, text: &str) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if self.current.as_deref().is_some_and(|current| current >= text) {
            return Ok(true);
        }
        for terms in &mut self.segments {
            terms.seek(&self.field, text)?;
        }
        Ok(self.select())
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Text of the current term.
    pub fn text(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn term(&self) -> Option<Term> {
        self.current.as_ref().map(|text| Term::new(self.field.clone(), text.clone()))
    }

    /// Documents containing the current term, summed over segments.
    pub fn doc_freq(&self) -> u32 {
        self.doc_freq
    }
}

/// Live postings of a term across all segments, in global id order.
#[derive(Debug)]
pub struct TermDocEnum {
    segments: Vec<(u32, u32, SegmentTermDocs)>,
    current: usize,
    started: bool,
}

impl TermDocEnum {
    /// Advance to the next live document.
    pub fn next(&mut self) -> Result<bool> {
        while let Some((_, _, docs)) = self.segments.get_mut(self.current) {
            if docs.next()? {
                self.started = true;
                return Ok(true);
            }
            self.current += 1;
        }
        Ok(false)
    }

    /// Move to the first live document `>= target`, staying put when the
    /// current document already qualifies.
    pub fn skip_to(&mut self, target: u32) -> Result<bool> {
        if self.started && self.current < self.segments.len() && self.doc() >= target {
            return Ok(true);
        }
        while let Some((base, end, docs)) = self.segments.get_mut(self.current) {
            if target < *end && docs.skip_to(target.saturating_sub(*base))? {
                self.started = true;
                return Ok(true);
            }
            self.current += 1;
        }
        Ok(false)
    }

    /// Global id of the current document.
    pub fn doc(&self) -> u32 {
        self.segments
            .get(self.current)
            .map_or(u32::MAX, |(base, _, docs)| base + docs.doc())
    }

    pub fn freq(&self) -> u32 {
        self.segments.get(self.current).map_or(0, |(_, _, docs)| docs.freq())
    }

    /// Documents in the posting lists, deleted ones included.
    pub fn doc_freq(&self) -> u32 {
        self.segments.iter().map(|(_, _, docs)| docs.doc_freq()).sum()
    }

    /// Next position of the current document.
    pub fn next_position(&mut self) -> Result<Option<u32>> {
        match self.segments.get_mut(self.current) {
            Some((_, _, docs)) => docs.next_position(),
            None => Ok(None),
        }
    }

    /// Remaining positions of the current document.
    pub fn positions(&mut self) -> Result<Vec<u32>> {
        match self.segments.get_mut(self.current) {
            Some((_, _, docs)) => docs.positions(),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::whitespace::WhitespaceAnalyzer;
    use crate::index::postings::DocumentBuffer;
    use crate::index::segment_writer::{SegmentWriteOptions, write_segment};
    use crate::storage::memory::MemoryStorage;

    const OPTIONS: SegmentWriteOptions = SegmentWriteOptions {
        index_interval: 4,
        skip_interval: 2,
        use_compound_file: false,
        chunk_size: 1024,
    };

    fn add_segment(storage: &dyn Storage, infos: &mut SegmentInfos, bodies: &[&str]) {
        let analyzer = WhitespaceAnalyzer::default();
        let mut buffer = DocumentBuffer::new();
        for body in bodies {
            let doc = Document::new().add_field("body", *body);
            buffer.add_document(&doc, &mut infos.field_infos, &analyzer, 100).unwrap();
        }
        let name = infos.next_segment_name();
        let info = write_segment(storage, &name, &buffer.take(), &infos.field_infos, OPTIONS).unwrap();
        infos.segments.push(info);
        infos.version += 1;
        infos.write(storage).unwrap();
    }

    fn two_segments() -> (Arc<dyn Storage>, SegmentInfos) {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::default());
        let mut infos = SegmentInfos::new(FieldInfos::default());
        add_segment(storage.as_ref(), &mut infos, &["apple banana", "banana cherry"]);
        add_segment(storage.as_ref(), &mut infos, &["cherry date", "apple", "banana banana"]);
        (storage, infos)
    }

    #[test]
    fn test_global_ids() {
        let (storage, _) = two_segments();
        let reader = IndexReader::open(storage).unwrap();
        assert_eq!(reader.segment_count(), 2);
        assert_eq!(reader.max_doc(), 5);
        assert_eq!(reader.num_docs(), 5);
        assert_eq!(reader.starts(), &[0, 2]);
        assert_eq!(reader.get_document(3).unwrap().get_value("body"), Some("apple"));
        assert_eq!(reader.get_lazy_doc(4).unwrap().doc(), 4);
        assert_eq!(reader.get_document(9).unwrap_err().kind(), ErrorKind::NotFound);
        assert!(reader.is_deleted(9));
        assert_eq!(reader.norms("body").unwrap().len(), 5);
        assert!(reader.norms("nope").is_none());
    }

    #[test]
    fn test_term_enum_merges_segments() {
        let (storage, _) = two_segments();
        let reader = IndexReader::open(storage).unwrap();
        let mut terms = reader.terms("body").unwrap();
        let mut seen = Vec::new();
        while terms.next().unwrap() {
            seen.push((terms.text().unwrap().to_string(), terms.doc_freq()));
        }
        assert_eq!(
            seen,
            vec![
                ("apple".to_string(), 2),
                ("banana".to_string(), 3),
                ("cherry".to_string(), 2),
                ("date".to_string(), 1)
            ]
        );

        let mut terms = reader.terms("body").unwrap();
        assert!(terms.skip_to("c").unwrap());
        assert_eq!(terms.text(), Some("cherry"));
        assert!(terms.skip_to("b").unwrap());
        assert_eq!(terms.text(), Some("cherry"));
        assert!(!terms.skip_to("e").unwrap());
        // Exhausted enums stay exhausted.
        assert!(!terms.skip_to("a").unwrap());
        assert!(!terms.next().unwrap());
    }

    #[test]
    fn test_term_docs_across_segments() {
        let (storage, _) = two_segments();
        let reader = IndexReader::open(storage).unwrap();
        let mut docs = reader.term_docs(&Term::new("body", "banana")).unwrap();
        let mut seen = Vec::new();
        while docs.next().unwrap() {
            seen.push((docs.doc(), docs.freq()));
        }
        assert_eq!(seen, vec![(0, 1), (1, 1), (4, 2)]);

        let mut docs = reader.term_positions(&Term::new("body", "banana")).unwrap();
        assert!(docs.skip_to(2).unwrap());
        assert_eq!(docs.doc(), 4);
        assert_eq!(docs.positions().unwrap(), vec![0, 1]);
        assert_eq!(reader.doc_freq(&Term::new("body", "banana")).unwrap(), 3);
    }

    #[test]
    fn test_reopen() {
        let (storage, mut infos) = two_segments();
        let reader = IndexReader::open(Arc::clone(&storage)).unwrap();
        assert!(reader.is_latest().unwrap());
        let same = reader.reopen().unwrap();
        assert_eq!(same.version(), reader.version());

        add_segment(storage.as_ref(), &mut infos, &["elder"]);
        assert!(!reader.is_latest().unwrap());
        let newer = reader.reopen().unwrap();
        assert_eq!(newer.max_doc(), 6);
        assert_eq!(newer.segment_count(), 3);
        assert_eq!(reader.max_doc(), 5);
    }
}
