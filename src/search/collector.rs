//! Collectors that gather search results.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::search::sort::{SortKey, Sorter};

/// A matching document and its score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub doc: u32,
    pub score: f32,
}

/// The ranked window of a search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopDocs {
    /// Every match, not only the returned window.
    pub total_hits: u64,
    pub hits: Vec<Hit>,
    /// Highest score over all matches, 0 without matches.
    pub max_score: f32,
}

impl TopDocs {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn docs(&self) -> Vec<u32> {
        self.hits.iter().map(|h| h.doc).collect()
    }
}

/// Receives each match of a search.
pub trait Collector {
    fn collect(&mut self, doc: u32, score: f32);

    /// Number of matches seen so far.
    fn total_hits(&self) -> u64;
}

/// Heap entry; the greatest entry is the worst ranked.
struct Ranked(SortKey);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.rank(&other.0)
    }
}

/// Keeps the best `capacity` hits under a sort.
pub struct TopDocsCollector {
    capacity: usize,
    sorter: Sorter,
    heap: BinaryHeap<Ranked>,
    total_hits: u64,
    max_score: f32,
}

impl TopDocsCollector {
    pub(crate) fn new(capacity: usize, sorter: Sorter) -> Self {
        TopDocsCollector {
            capacity,
            sorter,
            heap: BinaryHeap::with_capacity(capacity.min(1024) + 1),
            total_hits: 0,
            max_score: 0.0,
        }
    }

    /// The ranked hits after skipping `offset`.
    pub fn top_docs(self, offset: usize) -> TopDocs {
        let ranked = self.heap.into_sorted_vec();
        TopDocs {
            total_hits: self.total_hits,
            hits: ranked
                .into_iter()
                .skip(offset)
                .map(|Ranked(key)| Hit {
                    doc: key.doc,
                    score: key.score,
                })
                .collect(),
            max_score: self.max_score,
        }
    }
}

impl Collector for TopDocsCollector {
    fn collect(&mut self, doc: u32, score: f32) {
        self.total_hits += 1;
        if self.total_hits == 1 || score > self.max_score {
            self.max_score = score;
        }
        if self.capacity == 0 {
            return;
        }
        let entry = Ranked(self.sorter.key(doc, score));
        if self.heap.len() < self.capacity {
            self.heap.push(entry);
        } else if let Some(worst) = self.heap.peek()
            && entry < *worst
        {
            self.heap.pop();
            self.heap.push(entry);
        }
    }

    fn total_hits(&self) -> u64 {
        self.total_hits
    }
}

/// Collects matching document ids in the order they are visited.
#[derive(Debug, Default)]
pub struct DocIdCollector {
    docs: Vec<u32>,
}

impl DocIdCollector {
    pub fn into_docs(self) -> Vec<u32> {
        self.docs
    }
}

impl Collector for DocIdCollector {
    fn collect(&mut self, doc: u32, _score: f32) {
        self.docs.push(doc);
    }

    fn total_hits(&self) -> u64 {
        self.docs.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::analysis::analyzer::whitespace::WhitespaceAnalyzer;
    use crate::index::document::Document;
    use crate::index::field_infos::FieldInfos;
    use crate::index::reader::IndexReader;
    use crate::index::writer::{IndexWriter, IndexWriterConfig, OpenMode};
    use crate::search::sort::{FieldCache, Sort};
    use crate::storage::memory::MemoryStorage;

    fn empty_reader() -> IndexReader {
        let storage = Arc::new(MemoryStorage::default());
        let mut writer = IndexWriter::open(
            storage.clone(),
            Arc::new(WhitespaceAnalyzer::default()),
            OpenMode::Create(FieldInfos::default()),
            IndexWriterConfig::default(),
        )
        .unwrap();
        writer.add_document(&Document::new().add_field("body", "x")).unwrap();
        writer.close().unwrap();
        IndexReader::open(storage).unwrap()
    }

    #[test]
    fn test_keeps_best_hits() {
        let reader = empty_reader();
        let sorter = Sorter::new(&Sort::relevance(), &reader, &FieldCache::default()).unwrap();
        let mut collector = TopDocsCollector::new(3, sorter);
        for (doc, score) in [(0, 0.5), (1, 2.0), (2, 1.0), (3, 2.0), (4, 0.1)] {
            collector.collect(doc, score);
        }
        assert_eq!(collector.total_hits(), 5);
        let top = collector.top_docs(1);
        assert_eq!(top.total_hits, 5);
        assert_eq!(top.max_score, 2.0);
        assert_eq!(top.docs(), vec![3, 2]);
    }

    #[test]
    fn test_index_order() {
        let reader = empty_reader();
        let sorter = Sorter::new(&Sort::index_order_reversed(), &reader, &FieldCache::default()).unwrap();
        let mut collector = TopDocsCollector::new(2, sorter);
        for doc in 0..5 {
            collector.collect(doc, 1.0);
        }
        assert_eq!(collector.top_docs(0).docs(), vec![4, 3]);
    }
}
