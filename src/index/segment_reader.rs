//! Read access to one segment.
//!
//! A [`SegmentReader`] loads and verifies every file of its segment when it
//! is opened and keeps the bytes in memory, so later commits or merges that
//! delete the files do not affect it. The decoded state is shared behind an
//! `Arc`, which lets enumerators outlive the borrow of the reader that made
//! them.

use std::cmp::Ordering;
use std::sync::Arc;

use ahash::AHashMap;
use bit_vec::BitVec;

use crate::error::{GlaiveError, Result};
use crate::index::field_infos::FieldInfos;
use crate::index::lazy_doc::LazyDoc;
use crate::index::segment_infos::SegmentInfo;
use crate::index::segment_writer::{
    DEL_MAGIC, FDT_MAGIC, FDX_MAGIC, FORMAT_VERSION, FRQ_MAGIC, NRM_MAGIC, PRX_MAGIC, TII_MAGIC, TIS_MAGIC,
    TV_OFFSETS, TV_POSITIONS, TVD_MAGIC, TVX_MAGIC,
};
use crate::index::term_vector::{Offset, TVTerm, TermVector};
use crate::storage::Storage;
use crate::storage::compound::CompoundStorage;
use crate::storage::structured::{StructReader, StructWriter, check_header, read_checked, write_header};
use crate::util::varint;

/// Dictionary entry of a term: where its postings live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TermInfo {
    pub doc_freq: u32,
    pub frq_pointer: u64,
    pub prx_pointer: u64,
    /// Offset of the skip data from `frq_pointer`, 0 when the term has none.
    pub skip_offset: u64,
}

#[derive(Debug)]
struct IndexEntry {
    field: u32,
    text: String,
    offset: usize,
    ordinal: u64,
}

/// The decoded files of a segment.
#[derive(Debug)]
pub(crate) struct SegmentCore {
    name: String,
    doc_count: u32,
    field_infos: Arc<FieldInfos>,
    skip_interval: u32,
    tis: Vec<u8>,
    terms_start: usize,
    term_count: u64,
    index: Vec<IndexEntry>,
    frq: Vec<u8>,
    prx: Vec<u8>,
    fdx: Vec<u64>,
    fdt: Arc<[u8]>,
    norms: AHashMap<usize, Arc<[u8]>>,
    tvx: Vec<u64>,
    tvd: Vec<u8>,
}

fn load_file(files: &dyn Storage, info: &SegmentInfo, ext: &str, magic: &[u8; 4]) -> Result<(Vec<u8>, usize)> {
    let name = info.file_name(ext);
    let bytes = read_checked(files, &name)?;
    let mut reader = StructReader::new(&bytes);
    check_header(&mut reader, &name, magic, FORMAT_VERSION)?;
    let body = reader.position();
    Ok((bytes, body))
}

fn check_doc_count(info: &SegmentInfo, ext: &str, found: u32) -> Result<()> {
    if found != info.doc_count {
        return Err(GlaiveError::corrupt(format!(
            "{}: {found} documents, segments file says {}",
            info.file_name(ext),
            info.doc_count
        )));
    }
    Ok(())
}

impl SegmentCore {
    fn load(storage: &dyn Storage, info: &SegmentInfo, field_infos: Arc<FieldInfos>) -> Result<Self> {
        let compound;
        let files: &dyn Storage = if info.use_compound_file {
            compound = CompoundStorage::open(storage, &info.file_name("cfs"))?;
            &compound
        } else {
            storage
        };

        let (tis, body) = load_file(files, info, "tis", TIS_MAGIC)?;
        let (skip_interval, term_count, terms_start) = {
            let mut reader = StructReader::new(&tis);
            reader.seek(body)?;
            let _index_interval = reader.read_vint()?;
            let skip_interval = reader.read_vint()?;
            let term_count = reader.read_vlong()?;
            (skip_interval.max(1), term_count, reader.position())
        };

        let (tii, body) = load_file(files, info, "tii", TII_MAGIC)?;
        let mut index = Vec::new();
        {
            let mut reader = StructReader::new(&tii);
            reader.seek(body)?;
            let count = reader.read_vlong()?;
            for _ in 0..count {
                index.push(IndexEntry {
                    field: reader.read_vint()?,
                    text: reader.read_string()?,
                    offset: reader.read_vlong()? as usize,
                    ordinal: reader.read_vlong()?,
                });
            }
        }

        let (frq, _) = load_file(files, info, "frq", FRQ_MAGIC)?;
        let (prx, _) = load_file(files, info, "prx", PRX_MAGIC)?;

        let (fdx_bytes, body) = load_file(files, info, "fdx", FDX_MAGIC)?;
        let fdx = read_offsets(&fdx_bytes, body, info, "fdx")?;
        let (fdt, _) = load_file(files, info, "fdt", FDT_MAGIC)?;

        let (nrm, body) = load_file(files, info, "nrm", NRM_MAGIC)?;
        let mut norms = AHashMap::new();
        {
            let mut reader = StructReader::new(&nrm);
            reader.seek(body)?;
            check_doc_count(info, "nrm", reader.read_vint()?)?;
            let fields = reader.read_vint()?;
            for _ in 0..fields {
                let number = reader.read_vint()? as usize;
                let column = reader.read_raw(info.doc_count as usize)?;
                norms.insert(number, Arc::from(column));
            }
        }

        let (tvx_bytes, body) = load_file(files, info, "tvx", TVX_MAGIC)?;
        let tvx = read_offsets(&tvx_bytes, body, info, "tvx")?;
        let (tvd, _) = load_file(files, info, "tvd", TVD_MAGIC)?;

        Ok(SegmentCore {
            name: info.name.clone(),
            doc_count: info.doc_count,
            field_infos,
            skip_interval,
            tis,
            terms_start,
            term_count,
            index,
            frq,
            prx,
            fdx,
            fdt: Arc::from(fdt.into_boxed_slice()),
            norms,
            tvx,
            tvd,
        })
    }

    fn field_name(&self, number: u32) -> &str {
        self.field_infos.name(number as usize).unwrap_or("")
    }
}

fn read_offsets(bytes: &[u8], body: usize, info: &SegmentInfo, ext: &str) -> Result<Vec<u64>> {
    let mut reader = StructReader::new(bytes);
    reader.seek(body)?;
    let count = reader.read_vint()?;
    check_doc_count(info, ext, count)?;
    (0..count).map(|_| reader.read_u64()).collect()
}

/// Load the deletions of `info`, if it has any.
pub(crate) fn read_deletions(storage: &dyn Storage, info: &SegmentInfo) -> Result<Option<BitVec>> {
    if info.del_gen == 0 {
        return Ok(None);
    }
    let name = info.del_file_name(info.del_gen);
    let bytes = read_checked(storage, &name)?;
    let mut reader = StructReader::new(&bytes);
    check_header(&mut reader, &name, DEL_MAGIC, FORMAT_VERSION)?;
    let max_doc = reader.read_vint()?;
    let count = reader.read_vint()?;
    check_doc_count(info, "del", max_doc)?;

    let mut bits = BitVec::from_bytes(reader.read_bytes()?);
    if bits.len() < max_doc as usize {
        return Err(GlaiveError::corrupt(format!("{name}: bit vector shorter than {max_doc}")));
    }
    bits.truncate(max_doc as usize);
    let actual = bits.iter().filter(|&b| b).count() as u32;
    if actual != count {
        return Err(GlaiveError::corrupt(format!("{name}: header says {count} deletions, found {actual}")));
    }
    Ok(Some(bits))
}

/// Write `bits` as deletions generation `generation` of `info`. Returns the
/// number of deleted documents.
pub(crate) fn write_deletions(storage: &dyn Storage, info: &SegmentInfo, generation: u32, bits: &BitVec) -> Result<u32> {
    let count = bits.iter().filter(|&b| b).count() as u32;
    let mut writer = StructWriter::new(storage.create_output(&info.del_file_name(generation))?);
    write_header(&mut writer, DEL_MAGIC, FORMAT_VERSION)?;
    writer.write_vint(info.doc_count)?;
    writer.write_vint(count)?;
    writer.write_bytes(&bits.to_bytes())?;
    writer.close()?;
    Ok(count)
}

/// An open segment plus its current deletions.
#[derive(Debug, Clone)]
pub struct SegmentReader {
    info: SegmentInfo,
    core: Arc<SegmentCore>,
    deleted: Option<Arc<BitVec>>,
}

impl SegmentReader {
    /// Load segment `info` from `storage`.
    pub fn open(storage: &dyn Storage, info: &SegmentInfo, field_infos: Arc<FieldInfos>) -> Result<Self> {
        let core = Arc::new(SegmentCore::load(storage, info, field_infos)?);
        let deleted = read_deletions(storage, info)?.map(Arc::new);
        log::trace!("opened segment {} ({} docs)", info.name, info.doc_count);
        Ok(SegmentReader {
            info: info.clone(),
            core,
            deleted,
        })
    }

    /// A reader for a newer commit of the same segment. The segment's files
    /// are immutable, so only the deletions are reloaded, and only when
    /// their generation changed.
    pub fn reopen(&self, storage: &dyn Storage, info: &SegmentInfo) -> Result<Self> {
        if info.name != self.info.name || info.doc_count != self.info.doc_count {
            return Err(GlaiveError::corrupt(format!(
                "cannot reopen segment {} as {}",
                self.info.name, info.name
            )));
        }
        let deleted = if info.del_gen == self.info.del_gen {
            self.deleted.clone()
        } else {
            read_deletions(storage, info)?.map(Arc::new)
        };
        Ok(SegmentReader {
            info: info.clone(),
            core: Arc::clone(&self.core),
            deleted,
        })
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn info(&self) -> &SegmentInfo {
        &self.info
    }

    pub fn field_infos(&self) -> &FieldInfos {
        &self.core.field_infos
    }

    /// Documents including deleted ones.
    pub fn max_doc(&self) -> u32 {
        self.core.doc_count
    }

    /// Live documents.
    pub fn num_docs(&self) -> u32 {
        self.max_doc() - self.del_count()
    }

    pub fn del_count(&self) -> u32 {
        self.deleted
            .as_ref()
            .map_or(0, |bits| bits.iter().filter(|&b| b).count() as u32)
    }

    pub fn has_deletions(&self) -> bool {
        self.del_count() > 0
    }

    pub fn is_deleted(&self, doc: u32) -> bool {
        self.deleted
            .as_ref()
            .is_some_and(|bits| bits.get(doc as usize).unwrap_or(false))
    }

    pub(crate) fn deleted_docs(&self) -> Option<&Arc<BitVec>> {
        self.deleted.as_ref()
    }

    /// Number of distinct terms over all fields.
    pub fn term_count(&self) -> u64 {
        self.core.term_count
    }

    /// Enumerator positioned before the first term.
    pub fn terms(&self) -> SegmentTermEnum {
        SegmentTermEnum::new(Arc::clone(&self.core))
    }

    /// Dictionary entry of `field:text`.
    pub fn term_info(&self, field: &str, text: &str) -> Result<Option<TermInfo>> {
        let mut terms = self.terms();
        if terms.seek(field, text)? && terms.field() == field && terms.text() == text {
            Ok(Some(terms.term_info()))
        } else {
            Ok(None)
        }
    }

    /// Number of documents containing `field:text`, deleted ones included.
    pub fn doc_freq(&self, field: &str, text: &str) -> Result<u32> {
        Ok(self.term_info(field, text)?.map_or(0, |ti| ti.doc_freq))
    }

    /// Postings of a term; an absent term gives an empty enumerator.
    pub fn term_docs(&self, info: Option<TermInfo>) -> SegmentTermDocs {
        SegmentTermDocs::new(Arc::clone(&self.core), self.deleted.clone(), info.unwrap_or_default())
    }

    /// Postings of `field:text`.
    pub fn term_docs_for(&self, field: &str, text: &str) -> Result<SegmentTermDocs> {
        Ok(self.term_docs(self.term_info(field, text)?))
    }

    fn check_doc(&self, doc: u32) -> Result<()> {
        if doc >= self.core.doc_count {
            return Err(GlaiveError::not_found(format!(
                "document {doc} out of range for segment {} ({} docs)",
                self.core.name, self.core.doc_count
            )));
        }
        Ok(())
    }

    /// Stored fields of `doc`, decoded on access. The returned document
    /// carries the segment-local id.
    pub fn document(&self, doc: u32) -> Result<LazyDoc> {
        self.check_doc(doc)?;
        let start = self.core.fdx[doc as usize] as usize;
        LazyDoc::parse(doc, Arc::clone(&self.core.fdt), start, &self.core.field_infos)
    }

    /// Norm bytes of `field`, one per document.
    pub fn norms(&self, field: &str) -> Option<Arc<[u8]>> {
        let number = self.core.field_infos.number(field)?;
        self.core.norms.get(&number).cloned()
    }

    /// Every term vector stored for `doc`.
    pub fn term_vectors(&self, doc: u32) -> Result<Vec<TermVector>> {
        self.check_doc(doc)?;
        let core = &self.core;
        let mut reader = StructReader::new(&core.tvd);
        reader.seek(core.tvx[doc as usize] as usize)?;
        let fields = reader.read_vint()?;
        let mut vectors = Vec::with_capacity(fields as usize);
        for _ in 0..fields {
            let number = reader.read_vint()?;
            let flags = reader.read_u8()?;
            let num_terms = reader.read_vint()?;
            let mut terms = Vec::with_capacity(num_terms as usize);
            for _ in 0..num_terms {
                let text = reader.read_string()?;
                let freq = reader.read_vint()?;
                let mut positions = Vec::new();
                if flags & TV_POSITIONS != 0 {
                    let mut last = 0;
                    for _ in 0..freq {
                        last += reader.read_vint()?;
                        positions.push(last);
                    }
                }
                let mut offsets = Vec::new();
                if flags & TV_OFFSETS != 0 {
                    let mut last_start = 0;
                    for _ in 0..freq {
                        let start = last_start + reader.read_vlong()? as usize;
                        let len = reader.read_vlong()? as usize;
                        offsets.push(Offset::new(start, start + len));
                        last_start = start;
                    }
                }
                terms.push(TVTerm {
                    text,
                    freq,
                    positions,
                    offsets,
                });
            }
            vectors.push(TermVector {
                field: core.field_name(number).to_string(),
                terms,
            });
        }
        Ok(vectors)
    }

    /// The term vector of one field of `doc`.
    pub fn term_vector(&self, doc: u32, field: &str) -> Result<Option<TermVector>> {
        Ok(self.term_vectors(doc)?.into_iter().find(|tv| tv.field == field))
    }
}

/// Walks the term dictionary of a segment in sorted order.
#[derive(Debug, Clone)]
pub struct SegmentTermEnum {
    core: Arc<SegmentCore>,
    position: usize,
    next_ordinal: u64,
    field: u32,
    text: String,
    info: TermInfo,
    valid: bool,
}

impl SegmentTermEnum {
    fn new(core: Arc<SegmentCore>) -> Self {
        SegmentTermEnum {
            position: core.terms_start,
            core,
            next_ordinal: 0,
            field: 0,
            text: String::new(),
            info: TermInfo::default(),
            valid: false,
        }
    }

    /// Advance to the next term.
    pub fn next(&mut self) -> Result<bool> {
        if self.next_ordinal >= self.core.term_count {
            self.valid = false;
            return Ok(false);
        }
        let core = Arc::clone(&self.core);
        let mut reader = StructReader::new(&core.tis);
        reader.seek(self.position)?;

        let prefix = reader.read_vint()? as usize;
        let suffix = std::str::from_utf8(reader.read_bytes()?)
            .map_err(|e| GlaiveError::corrupt(format!("{}.tis: term is not UTF-8: {e}", core.name)))?;
        if prefix > self.text.len() || !self.text.is_char_boundary(prefix) {
            return Err(GlaiveError::corrupt(format!(
                "{}.tis: prefix {prefix} does not fit previous term {:?}",
                core.name, self.text
            )));
        }
        self.text.truncate(prefix);
        self.text.push_str(suffix);
        self.field = reader.read_vint()?;
        self.info = TermInfo {
            doc_freq: reader.read_vint()?,
            frq_pointer: reader.read_vlong()?,
            prx_pointer: reader.read_vlong()?,
            skip_offset: reader.read_vlong()?,
        };
        self.position = reader.position();
        self.next_ordinal += 1;
        self.valid = true;
        Ok(true)
    }

    /// Move to the first term at or after `field:text`. Never moves
    /// backwards: if the current term is already past the target the
    /// enumerator stays where it is.
    pub fn seek(&mut self, field: &str, text: &str) -> Result<bool> {
        if self.valid && self.compare_to(field, text) != Ordering::Less {
            return Ok(true);
        }
        let core = Arc::clone(&self.core);
        let idx = core
            .index
            .partition_point(|e| (core.field_name(e.field), e.text.as_str()) <= (field, text));
        if idx > 0 {
            let entry = &core.index[idx - 1];
            if entry.ordinal >= self.next_ordinal {
                self.position = entry.offset;
                self.next_ordinal = entry.ordinal;
                self.text.clear();
            }
        }
        while self.next()? {
            if self.compare_to(field, text) != Ordering::Less {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn compare_to(&self, field: &str, text: &str) -> Ordering {
        self.field().cmp(field).then_with(|| self.text.as_str().cmp(text))
    }

    /// Whether the enumerator sits on a term.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn field(&self) -> &str {
        self.core.field_name(self.field)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn term_info(&self) -> TermInfo {
        self.info
    }

    pub fn doc_freq(&self) -> u32 {
        self.info.doc_freq
    }

    /// Postings of the current term.
    pub fn term_docs(&self, deleted: Option<Arc<BitVec>>) -> SegmentTermDocs {
        SegmentTermDocs::new(Arc::clone(&self.core), deleted, self.info)
    }
}

#[derive(Debug, Clone, Copy)]
struct SkipEntry {
    doc: u32,
    frq: usize,
    prx: usize,
}

/// Postings of one term in one segment, with positions on demand. Deleted
/// documents are skipped.
#[derive(Debug)]
pub struct SegmentTermDocs {
    core: Arc<SegmentCore>,
    deleted: Option<Arc<BitVec>>,
    info: TermInfo,
    read: u32,
    frq_pos: usize,
    prx_pos: usize,
    doc: u32,
    freq: u32,
    pending_positions: u32,
    position: u32,
    skips: Option<Vec<SkipEntry>>,
    next_skip: usize,
    started: bool,
    exhausted: bool,
}

impl SegmentTermDocs {
    fn new(core: Arc<SegmentCore>, deleted: Option<Arc<BitVec>>, info: TermInfo) -> Self {
        SegmentTermDocs {
            frq_pos: info.frq_pointer as usize,
            prx_pos: info.prx_pointer as usize,
            core,
            deleted,
            info,
            read: 0,
            doc: 0,
            freq: 0,
            pending_positions: 0,
            position: 0,
            skips: None,
            next_skip: 0,
            started: false,
            exhausted: info.doc_freq == 0,
        }
    }

    /// Documents in the posting list, deleted ones included.
    pub fn doc_freq(&self) -> u32 {
        self.info.doc_freq
    }

    /// Current document. Only meaningful after `next` returned true.
    pub fn doc(&self) -> u32 {
        self.doc
    }

    pub fn freq(&self) -> u32 {
        self.freq
    }

    fn is_deleted(&self, doc: u32) -> bool {
        self.deleted
            .as_ref()
            .is_some_and(|bits| bits.get(doc as usize).unwrap_or(false))
    }

    fn skip_positions(&mut self) -> Result<()> {
        for _ in 0..self.pending_positions {
            varint::read_u32_at(&self.core.prx, &mut self.prx_pos)?;
        }
        self.pending_positions = 0;
        Ok(())
    }

    /// Advance to the next live document.
    pub fn next(&mut self) -> Result<bool> {
        loop {
            if self.exhausted || self.read >= self.info.doc_freq {
                self.exhausted = true;
                return Ok(false);
            }
            self.skip_positions()?;
            let code = varint::read_u32_at(&self.core.frq, &mut self.frq_pos)?;
            self.doc += code >> 1;
            self.freq = if code & 1 == 1 {
                1
            } else {
                varint::read_u32_at(&self.core.frq, &mut self.frq_pos)?
            };
            self.read += 1;
            self.started = true;
            self.pending_positions = self.freq;
            self.position = 0;
            if !self.is_deleted(self.doc) {
                return Ok(true);
            }
        }
    }

    fn load_skips(&mut self) -> Result<&[SkipEntry]> {
        if self.skips.is_none() {
            let mut skips = Vec::new();
            if self.info.skip_offset > 0 {
                let frq = &self.core.frq;
                let mut pos = (self.info.frq_pointer + self.info.skip_offset) as usize;
                let count = varint::read_u32_at(frq, &mut pos)?;
                let (mut doc, mut frq_pos, mut prx_pos) =
                    (0u32, self.info.frq_pointer as usize, self.info.prx_pointer as usize);
                for _ in 0..count {
                    doc += varint::read_u32_at(frq, &mut pos)?;
                    frq_pos += varint::read_u64_at(frq, &mut pos)? as usize;
                    prx_pos += varint::read_u64_at(frq, &mut pos)? as usize;
                    skips.push(SkipEntry {
                        doc,
                        frq: frq_pos,
                        prx: prx_pos,
                    });
                }
            }
            self.skips = Some(skips);
        }
        Ok(self.skips.as_deref().unwrap_or_default())
    }

    /// Move to the first live document `>= target`. Stays put when the
    /// current document already qualifies.
    pub fn skip_to(&mut self, target: u32) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if self.started && self.doc >= target {
            return Ok(true);
        }

        let interval = self.core.skip_interval;
        let read = self.read;
        let mut jump = None;
        let mut index = self.next_skip;
        let skips = self.load_skips()?;
        while index < skips.len() && skips[index].doc < target {
            if (index as u32 + 1) * interval > read {
                jump = Some((index, skips[index]));
            }
            index += 1;
        }
        self.next_skip = index;
        if let Some((i, entry)) = jump {
            self.doc = entry.doc;
            self.frq_pos = entry.frq;
            self.prx_pos = entry.prx;
            self.read = (i as u32 + 1) * interval;
            self.pending_positions = 0;
            self.started = true;
        }

        while self.next()? {
            if self.doc >= target {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Next position of the current document, in increasing order.
    pub fn next_position(&mut self) -> Result<Option<u32>> {
        if self.pending_positions == 0 {
            return Ok(None);
        }
        self.position += varint::read_u32_at(&self.core.prx, &mut self.prx_pos)?;
        self.pending_positions -= 1;
        Ok(Some(self.position))
    }

    /// The remaining positions of the current document.
    pub fn positions(&mut self) -> Result<Vec<u32>> {
        let mut out = Vec::with_capacity(self.pending_positions as usize);
        while let Some(p) = self.next_position()? {
            out.push(p);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::whitespace::WhitespaceAnalyzer;
    use crate::index::document::Document;
    use crate::index::field_infos::{FieldInfo, IndexValue, StoreValue, TermVectorValue};
    use crate::index::postings::DocumentBuffer;
    use crate::index::segment_writer::{SegmentWriteOptions, write_segment};
    use crate::storage::memory::MemoryStorage;

    fn build(storage: &MemoryStorage, docs: &[Document], compound: bool) -> (SegmentInfo, Arc<FieldInfos>) {
        let mut fis = FieldInfos::default();
        fis.add_field(FieldInfo::new("tag", StoreValue::Compress, IndexValue::Untokenized, TermVectorValue::No).unwrap())
            .unwrap();
        let analyzer = WhitespaceAnalyzer::default();
        let mut buffer = DocumentBuffer::new();
        for doc in docs {
            buffer.add_document(doc, &mut fis, &analyzer, 10_000).unwrap();
        }
        let options = SegmentWriteOptions {
            index_interval: 2,
            skip_interval: 3,
            use_compound_file: compound,
            chunk_size: 16,
        };
        let info = write_segment(storage, "_0", &buffer.take(), &fis, options).unwrap();
        (info, Arc::new(fis))
    }

    fn docs(n: usize) -> Vec<Document> {
        (0..n)
            .map(|i| {
                let parity = if i % 2 == 0 { "even" } else { "odd" };
                Document::new()
                    .add_field("body", format!("all {parity} n{i} all"))
                    .add_field("tag", format!("t{}", i % 3))
            })
            .collect()
    }

    #[test]
    fn test_term_enum() {
        let storage = MemoryStorage::default();
        let (info, fis) = build(&storage, &docs(4), false);
        let reader = SegmentReader::open(&storage, &info, fis).unwrap();

        let mut terms = reader.terms();
        let mut seen = Vec::new();
        while terms.next().unwrap() {
            seen.push(format!("{}:{}", terms.field(), terms.text()));
        }
        assert_eq!(
            seen,
            vec!["body:all", "body:even", "body:n0", "body:n1", "body:n2", "body:n3", "body:odd", "tag:t0", "tag:t1", "tag:t2"]
        );
        assert_eq!(reader.term_count(), 10);

        let mut terms = reader.terms();
        assert!(terms.seek("body", "m").unwrap());
        assert_eq!(terms.text(), "n0");
        assert!(terms.seek("body", "even").unwrap());
        assert_eq!(terms.text(), "n0");
        assert!(terms.seek("tag", "t1").unwrap());
        assert_eq!(terms.text(), "t1");
        assert!(!terms.seek("zzz", "").unwrap());

        assert_eq!(reader.doc_freq("body", "all").unwrap(), 4);
        assert_eq!(reader.doc_freq("body", "missing").unwrap(), 0);
    }

    #[test]
    fn test_postings_and_skips() {
        let storage = MemoryStorage::default();
        let (info, fis) = build(&storage, &docs(40), true);
        let reader = SegmentReader::open(&storage, &info, fis).unwrap();

        let mut td = reader.term_docs_for("body", "all").unwrap();
        assert!(td.next().unwrap());
        assert_eq!((td.doc(), td.freq()), (0, 2));
        assert_eq!(td.positions().unwrap(), vec![0, 3]);

        assert!(td.skip_to(25).unwrap());
        assert_eq!(td.doc(), 25);
        assert_eq!(td.positions().unwrap(), vec![0, 3]);
        assert!(td.skip_to(3).unwrap());
        assert_eq!(td.doc(), 25);
        assert!(td.skip_to(39).unwrap());
        assert!(!td.skip_to(40).unwrap());

        let mut even = reader.term_docs_for("body", "even").unwrap();
        assert!(even.skip_to(31).unwrap());
        assert_eq!(even.doc(), 32);
        assert_eq!(even.next_position().unwrap(), Some(1));
        assert!(even.next().unwrap());
        assert_eq!(even.doc(), 34);

        let mut none = reader.term_docs(None);
        assert!(!none.next().unwrap());
    }

    #[test]
    fn test_stored_vectors_and_norms() {
        let storage = MemoryStorage::default();
        let (info, fis) = build(&storage, &docs(3), true);
        let reader = SegmentReader::open(&storage, &info, fis).unwrap();

        let doc = reader.document(1).unwrap();
        assert_eq!(doc.get_value("body").unwrap(), Some("all odd n1 all"));
        assert_eq!(doc.get_value("tag").unwrap(), Some("t1"));
        assert!(reader.document(3).is_err());

        let tv = reader.term_vector(2, "body").unwrap().unwrap();
        let all = tv.find("all").unwrap();
        assert_eq!(all.positions, vec![0, 3]);
        assert_eq!(all.offsets[1], Offset::new(12, 15));
        assert!(reader.term_vector(2, "tag").unwrap().is_none());

        assert_eq!(reader.norms("body").unwrap().len(), 3);
        assert!(reader.norms("missing").is_none());
    }

    #[test]
    fn test_deletions() {
        let storage = MemoryStorage::default();
        let (mut info, fis) = build(&storage, &docs(5), false);
        let reader = SegmentReader::open(&storage, &info, fis).unwrap();
        assert!(!reader.has_deletions());

        let mut bits = BitVec::from_elem(5, false);
        bits.set(1, true);
        bits.set(4, true);
        info.del_count = write_deletions(&storage, &info, 1, &bits).unwrap();
        info.del_gen = 1;
        assert_eq!(info.del_count, 2);

        let reopened = reader.reopen(&storage, &info).unwrap();
        assert_eq!(reopened.num_docs(), 3);
        assert!(reopened.is_deleted(4));
        assert!(!reader.is_deleted(4));

        let mut td = reopened.term_docs_for("body", "odd").unwrap();
        assert!(td.next().unwrap());
        assert_eq!(td.doc(), 3);
        assert!(!td.next().unwrap());
    }
}
