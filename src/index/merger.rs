//! Merging segments into one.
//!
//! Live documents get new dense ids in input order; deleted documents are
//! dropped along with their postings, stored values, norms and vectors.

use crate::error::{GlaiveError, Result};
use crate::index::field_infos::FieldInfos;
use crate::index::postings::{Posting, SegmentContent, StoredValue};
use crate::index::segment_reader::SegmentReader;
use crate::index::term::Term;

/// Collect the live content of `readers` as a single segment.
pub fn merge_segments(readers: &[&SegmentReader], field_infos: &FieldInfos) -> Result<SegmentContent> {
    let mut content = SegmentContent::default();

    for reader in readers {
        let mut doc_map = Vec::with_capacity(reader.max_doc() as usize);
        for local in 0..reader.max_doc() {
            if reader.is_deleted(local) {
                doc_map.push(None);
                continue;
            }
            let new_id = content.doc_count;
            doc_map.push(Some(new_id));

            let doc = reader.document(local)?;
            let mut stored = Vec::new();
            for field in doc.fields() {
                let number = field_infos
                    .number(field.name())
                    .ok_or_else(|| GlaiveError::corrupt(format!("field {} missing from schema", field.name())))?;
                for value in field.values()? {
                    stored.push(StoredValue {
                        field: number,
                        value: value.to_string(),
                    });
                }
            }
            content.stored.push(stored);
            content.vectors.push(reader.term_vectors(local)?);

            for (number, info) in field_infos.iter().enumerate() {
                if let Some(column) = reader.norms(&info.name) {
                    let out = content.norms.entry(number).or_default();
                    out.resize(new_id as usize, 0);
                    out.push(column[local as usize]);
                }
            }
            content.doc_count += 1;
        }

        let mut terms = reader.terms();
        while terms.next()? {
            let mut docs = terms.term_docs(reader.deleted_docs().cloned());
            let mut postings = Vec::new();
            while docs.next()? {
                let Some(doc) = doc_map.get(docs.doc() as usize).copied().flatten() else {
                    continue;
                };
                postings.push(Posting {
                    doc,
                    positions: docs.positions()?,
                });
            }
            if !postings.is_empty() {
                content
                    .postings
                    .entry(Term::new(terms.field(), terms.text()))
                    .or_default()
                    .extend(postings);
            }
        }
        log::trace!("merged segment {} ({} live docs)", reader.name(), reader.num_docs());
    }

    content.finish_norms();
    Ok(content)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bit_vec::BitVec;

    use super::*;
    use crate::analysis::analyzer::whitespace::WhitespaceAnalyzer;
    use crate::index::document::Document;
    use crate::index::postings::DocumentBuffer;
    use crate::index::segment_reader::write_deletions;
    use crate::index::segment_writer::{SegmentWriteOptions, write_segment};
    use crate::storage::memory::MemoryStorage;

    const OPTIONS: SegmentWriteOptions = SegmentWriteOptions {
        index_interval: 128,
        skip_interval: 16,
        use_compound_file: true,
        chunk_size: 4096,
    };

    #[test]
    fn test_merge_drops_deleted() {
        let storage = MemoryStorage::default();
        let mut fis = FieldInfos::default();
        let analyzer = WhitespaceAnalyzer::default();

        let mut infos = Vec::new();
        for (i, bodies) in [["a b", "b c"], ["c d", "d e"]].iter().enumerate() {
            let mut buffer = DocumentBuffer::new();
            for body in bodies {
                buffer
                    .add_document(&Document::new().add_field("body", *body), &mut fis, &analyzer, 100)
                    .unwrap();
            }
            infos.push(write_segment(&storage, &format!("_{i}"), &buffer.take(), &fis, OPTIONS).unwrap());
        }

        let mut bits = BitVec::from_elem(2, false);
        bits.set(0, true);
        infos[0].del_count = write_deletions(&storage, &infos[0], 1, &bits).unwrap();
        infos[0].del_gen = 1;

        let fis = Arc::new(fis);
        let first = SegmentReader::open(&storage, &infos[0], Arc::clone(&fis)).unwrap();
        let second = SegmentReader::open(&storage, &infos[1], Arc::clone(&fis)).unwrap();
        let content = merge_segments(&[&first, &second], &fis).unwrap();

        assert_eq!(content.doc_count, 3);
        assert!(!content.postings.contains_key(&Term::new("body", "a")));
        let c = &content.postings[&Term::new("body", "c")];
        assert_eq!(c.iter().map(|p| p.doc).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(content.postings[&Term::new("body", "e")][0].positions, vec![1]);
        assert_eq!(content.stored[2][0].value, "d e");
        assert_eq!(content.norms[&0].len(), 3);
        assert_eq!(content.vectors[1][0].field, "body");
    }
}
