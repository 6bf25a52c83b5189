//! The in-memory form of a segment.
//!
//! Documents are inverted into a [`SegmentContent`] as they are added; a
//! flush hands it to the segment writer. Merges build the same structure
//! from existing segments, so both paths share one on-disk writer.

use std::collections::BTreeMap;

use crate::analysis::analyzer::Analyzer;
use crate::error::Result;
use crate::index::document::Document;
use crate::index::field_infos::FieldInfos;
use crate::index::term::Term;
use crate::index::term_vector::{Offset, TVTerm, TermVector};
use crate::search::similarity::{Similarity, encode_norm};

/// All occurrences of a term in one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub doc: u32,
    pub positions: Vec<u32>,
}

impl Posting {
    pub fn freq(&self) -> u32 {
        self.positions.len() as u32
    }
}

/// One stored value of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    pub field: usize,
    pub value: String,
}

/// Everything a segment holds, keyed and sorted the way it is written.
#[derive(Debug, Default)]
pub struct SegmentContent {
    pub doc_count: u32,
    pub postings: BTreeMap<Term, Vec<Posting>>,
    pub stored: Vec<Vec<StoredValue>>,
    /// Norm bytes by field number, one per document.
    pub norms: BTreeMap<usize, Vec<u8>>,
    pub vectors: Vec<Vec<TermVector>>,
}

impl SegmentContent {
    /// Pad every norm column to `doc_count`.
    pub fn finish_norms(&mut self) {
        let doc_count = self.doc_count as usize;
        for column in self.norms.values_mut() {
            column.resize(doc_count, 0);
        }
    }
}

#[derive(Default)]
struct FieldInversion {
    position: i64,
    offset_base: usize,
    length: u32,
    boost: f32,
    occurrences: BTreeMap<String, (Vec<u32>, Vec<Offset>)>,
}

impl FieldInversion {
    fn new() -> Self {
        FieldInversion {
            position: -1,
            boost: 1.0,
            ..Default::default()
        }
    }

    fn add(&mut self, text: String, increment: u32, start: usize, end: usize) {
        self.position = (self.position + increment as i64).max(0);
        let entry = self.occurrences.entry(text).or_default();
        entry.0.push(self.position as u32);
        entry.1.push(Offset::new(self.offset_base + start, self.offset_base + end));
        self.length += 1;
    }
}

/// Buffers added documents until the writer flushes them.
#[derive(Debug, Default)]
pub struct DocumentBuffer {
    content: SegmentContent,
    memory: usize,
}

impl DocumentBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_docs(&self) -> u32 {
        self.content.doc_count
    }

    pub fn is_empty(&self) -> bool {
        self.content.doc_count == 0
    }

    /// Rough number of bytes held.
    pub fn memory_usage(&self) -> usize {
        self.memory
    }

    /// Hand the buffered segment over, leaving the buffer empty.
    pub fn take(&mut self) -> SegmentContent {
        self.memory = 0;
        let mut content = std::mem::take(&mut self.content);
        content.finish_norms();
        content
    }

    /// Put back content handed out by [`take`](Self::take) after a failed
    /// flush, ahead of anything buffered since.
    pub fn restore(&mut self, content: SegmentContent) {
        if self.is_empty() {
            self.memory = content.postings.len() * 48;
            self.content = content;
        } else {
            log::warn!("dropping {} documents of a failed flush", content.doc_count);
        }
    }

    /// Analyze and invert `doc`. Fields new to `field_infos` are added with
    /// the default flags. At most `max_field_length` tokens are indexed per
    /// field.
    pub fn add_document(
        &mut self,
        doc: &Document,
        field_infos: &mut FieldInfos,
        analyzer: &dyn Analyzer,
        max_field_length: usize,
    ) -> Result<()> {
        let doc_id = self.content.doc_count;
        let mut stored = Vec::new();
        let mut inversions: BTreeMap<usize, FieldInversion> = BTreeMap::new();

        for field in &doc.fields {
            let number = field_infos.add_or_get(&field.name);
            let Some(info) = field_infos.get_by_number(number as isize) else {
                continue;
            };
            if info.is_stored() {
                for value in &field.values {
                    self.memory += value.len() + 16;
                    stored.push(StoredValue {
                        field: number,
                        value: value.clone(),
                    });
                }
            }
            if !info.is_indexed() {
                continue;
            }

            let inversion = inversions.entry(number).or_insert_with(FieldInversion::new);
            inversion.boost *= field.boost;
            for value in &field.values {
                if info.is_tokenized() {
                    for token in analyzer.analyze(&field.name, value)? {
                        if inversion.length as usize >= max_field_length {
                            log::trace!("field {} truncated at {max_field_length} tokens", field.name);
                            break;
                        }
                        inversion.add(token.text, token.position_increment, token.start_offset, token.end_offset);
                    }
                } else if (inversion.length as usize) < max_field_length {
                    inversion.add(value.clone(), 1, 0, value.len());
                }
                inversion.offset_base += value.len() + 1;
            }
        }

        let similarity = Similarity;
        let mut vectors = Vec::new();
        for (number, inversion) in inversions {
            let Some(info) = field_infos.get_by_number(number as isize) else {
                continue;
            };
            if info.has_norms() {
                let norm = info.boost
                    * doc.boost
                    * inversion.boost
                    * similarity.length_norm(inversion.length);
                let column = self.content.norms.entry(number).or_default();
                column.resize(doc_id as usize, 0);
                column.push(encode_norm(norm));
            }

            let mut tv_terms = Vec::new();
            for (text, (positions, offsets)) in inversion.occurrences {
                self.memory += text.len() + positions.len() * 4 + 48;
                if info.store_term_vector() {
                    tv_terms.push(TVTerm {
                        text: text.clone(),
                        freq: positions.len() as u32,
                        positions: if info.store_positions() { positions.clone() } else { Vec::new() },
                        offsets: if info.store_offsets() { offsets } else { Vec::new() },
                    });
                }
                self.content
                    .postings
                    .entry(Term::new(info.name.clone(), text))
                    .or_default()
                    .push(Posting { doc: doc_id, positions });
            }
            if info.store_term_vector() {
                vectors.push(TermVector {
                    field: info.name.clone(),
                    terms: tv_terms,
                });
            }
        }

        self.content.stored.push(stored);
        self.content.vectors.push(vectors);
        self.content.doc_count += 1;
        log::trace!("buffered document {doc_id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::standard::StandardAnalyzer;
    use crate::index::field_infos::{FieldInfo, IndexValue, StoreValue, TermVectorValue};
    use crate::search::similarity::decode_norm;

    #[test]
    fn test_inversion() {
        let analyzer = StandardAnalyzer::default();
        let mut fis = FieldInfos::default();
        fis.add_field(FieldInfo::new("id", StoreValue::Yes, IndexValue::Untokenized, TermVectorValue::No).unwrap())
            .unwrap();

        let mut buffer = DocumentBuffer::new();
        let doc = Document::new()
            .add_field("id", "A-1")
            .add_field("body", "the quick fox")
            .add_field("body", "fox den");
        buffer.add_document(&doc, &mut fis, &analyzer, 10_000).unwrap();
        buffer.add_document(&Document::new().add_field("id", "B-2"), &mut fis, &analyzer, 10_000).unwrap();
        assert!(buffer.memory_usage() > 0);

        let content = buffer.take();
        assert!(buffer.is_empty());
        assert_eq!(content.doc_count, 2);

        let fox = &content.postings[&Term::new("body", "fox")];
        assert_eq!(fox, &vec![Posting { doc: 0, positions: vec![2, 3] }]);
        assert_eq!(content.postings[&Term::new("id", "B-2")][0].doc, 1);
        assert!(!content.postings.contains_key(&Term::new("body", "the")));

        assert_eq!(content.stored[0].len(), 3);
        assert_eq!(content.stored[1], vec![StoredValue { field: 0, value: "B-2".into() }]);

        let body = fis.number("body").unwrap();
        assert_eq!(content.norms[&body].len(), 2);
        assert_eq!(decode_norm(content.norms[&body][0]), 0.5);
        assert_eq!(content.norms[&body][1], 0);

        let tv = &content.vectors[0][0];
        assert_eq!(tv.field, "body");
        let fox = tv.find("fox").unwrap();
        assert_eq!(fox.offsets[1], Offset::new(14, 17));
    }

    #[test]
    fn test_max_field_length() {
        let analyzer = StandardAnalyzer::default();
        let mut fis = FieldInfos::default();
        let mut buffer = DocumentBuffer::new();
        buffer
            .add_document(&Document::new().add_field("body", "a1 b2 c3 d4"), &mut fis, &analyzer, 2)
            .unwrap();
        let content = buffer.take();
        assert_eq!(content.postings.len(), 2);
        assert!(content.postings.contains_key(&Term::new("body", "b2")));
    }
}
