//! Query execution over an index snapshot.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use bit_vec::BitVec;

use crate::error::{GlaiveError, Result};
use crate::index::document::Document;
use crate::index::lazy_doc::LazyDoc;
use crate::index::reader::IndexReader;
use crate::index::term::Term;
use crate::query::Query;
use crate::search::collector::{Collector, TopDocs, TopDocsCollector};
use crate::search::explanation::Explanation;
use crate::search::filter::Filter;
use crate::search::highlight::{HighlightOptions, excerpts};
use crate::search::similarity::Similarity;
use crate::search::sort::{FieldCache, Sort, Sorter};
use crate::search::weight::{Weight, create_weight};

/// Window, filter and ordering of a search.
#[derive(Clone)]
pub struct SearchOptions {
    /// Ranked hits to skip.
    pub offset: usize,
    /// Hits to return; must be positive.
    pub limit: usize,
    pub filter: Option<Arc<dyn Filter>>,
    /// Relevance order when unset.
    pub sort: Option<Sort>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            offset: 0,
            limit: 10,
            filter: None,
            sort: None,
        }
    }
}

impl fmt::Debug for SearchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchOptions")
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .field("filter", &self.filter.as_ref().map(|filter| filter.describe()))
            .field("sort", &self.sort)
            .finish()
    }
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// Runs queries against one [`IndexReader`] snapshot.
#[derive(Debug)]
pub struct Searcher {
    reader: IndexReader,
    similarity: Similarity,
    field_cache: FieldCache,
}

impl Searcher {
    pub fn new(reader: IndexReader) -> Self {
        Searcher {
            reader,
            similarity: Similarity,
            field_cache: FieldCache::default(),
        }
    }

    pub fn reader(&self) -> &IndexReader {
        &self.reader
    }

    pub fn max_doc(&self) -> u32 {
        self.reader.max_doc()
    }

    pub fn doc_freq(&self, term: &Term) -> Result<u32> {
        self.reader.doc_freq(term)
    }

    pub fn get_document(&self, doc: u32) -> Result<Document> {
        self.reader.get_document(doc)
    }

    pub fn get_lazy_doc(&self, doc: u32) -> Result<LazyDoc> {
        self.reader.get_lazy_doc(doc)
    }

    /// Expand the multi-term nodes of `query` against this snapshot.
    pub fn rewrite(&self, query: &Query) -> Result<Query> {
        query.rewrite(&self.reader)
    }

    /// Terms the query would match, after rewriting. Prohibited clauses
    /// contribute nothing.
    pub fn query_terms(&self, query: &Query) -> Result<BTreeSet<Term>> {
        let mut terms = BTreeSet::new();
        self.rewrite(query)?.extract_terms(&mut terms);
        Ok(terms)
    }

    /// The normalized weight of a rewritten query.
    fn weight(&self, rewritten: &Query) -> Result<Box<dyn Weight>> {
        let mut weight = create_weight(rewritten, &self.reader, self.similarity)?;
        let norm = self.similarity.query_norm(weight.sum_of_squared_weights());
        weight.normalize(norm);
        Ok(weight)
    }

    /// The top `limit` hits after skipping `offset`, by relevance.
    pub fn search(&self, query: &Query, offset: usize, limit: usize) -> Result<TopDocs> {
        self.search_with(
            query,
            &SearchOptions {
                offset,
                limit,
                ..Default::default()
            },
        )
    }

    pub fn search_with(&self, query: &Query, options: &SearchOptions) -> Result<TopDocs> {
        if options.limit == 0 {
            return Err(GlaiveError::query("search limit must be greater than 0"));
        }
        let sort = options.sort.clone().unwrap_or_default();
        let sorter = Sorter::new(&sort, &self.reader, &self.field_cache)?;
        let mut collector = TopDocsCollector::new(options.offset.saturating_add(options.limit), sorter);
        self.search_each(query, options.filter.as_deref(), &mut collector)?;
        let top = collector.top_docs(options.offset);
        log::debug!(
            "search {query} matched {} documents, returning {}",
            top.total_hits,
            top.hits.len()
        );
        Ok(top)
    }

    /// Feed every match of `query` accepted by `filter` to `collector`, in
    /// document order.
    pub fn search_each(&self, query: &Query, filter: Option<&dyn Filter>, collector: &mut dyn Collector) -> Result<()> {
        let rewritten = self.rewrite(query)?;
        let weight = self.weight(&rewritten)?;
        let Some(mut scorer) = weight.scorer(&self.reader)? else {
            return Ok(());
        };
        let bits: Option<BitVec> = filter.map(|f| f.bits(&self.reader)).transpose()?;
        while scorer.next()? {
            let doc = scorer.doc();
            if let Some(bits) = &bits
                && !bits.get(doc as usize).unwrap_or(false)
            {
                continue;
            }
            collector.collect(doc, scorer.score()?);
        }
        Ok(())
    }

    /// How `query` scores `doc`. The value equals the score a search gives
    /// the document.
    pub fn explain(&self, query: &Query, doc: u32) -> Result<Explanation> {
        if doc >= self.reader.max_doc() {
            return Err(GlaiveError::not_found(format!(
                "document {doc} out of range (max_doc {})",
                self.reader.max_doc()
            )));
        }
        let rewritten = self.rewrite(query)?;
        self.weight(&rewritten)?.explain(&self.reader, doc)
    }

    /// Unscored ids of up to `limit` matching documents after `start_doc`.
    /// Pass the last id seen to continue a scan.
    pub fn scan(&self, query: &Query, start_doc: u32, limit: usize) -> Result<Vec<u32>> {
        let mut docs = Vec::new();
        let Some(first) = start_doc.checked_add(1) else {
            return Ok(docs);
        };
        if limit == 0 {
            return Ok(docs);
        }
        let rewritten = self.rewrite(query)?;
        let weight = create_weight(&rewritten, &self.reader, self.similarity)?;
        let Some(mut scorer) = weight.scorer(&self.reader)? else {
            return Ok(docs);
        };
        if !scorer.skip_to(first)? {
            return Ok(docs);
        }
        loop {
            docs.push(scorer.doc());
            if docs.len() >= limit || !scorer.next()? {
                break;
            }
        }
        Ok(docs)
    }

    /// Excerpts of `field` in `doc` with the query's terms marked up.
    ///
    /// `None` when the field has no stored text or its term vectors carry
    /// no offsets. Multiple values are joined with a single space.
    pub fn highlight(
        &self,
        query: &Query,
        doc: u32,
        field: &str,
        options: &HighlightOptions,
    ) -> Result<Option<Vec<String>>> {
        let lazy = self.reader.get_lazy_doc(doc)?;
        let Some(stored) = lazy.get(field) else {
            return Ok(None);
        };
        let text = stored.values()?.join(" ");
        let Some(vector) = self.reader.term_vector(doc, field)? else {
            return Ok(None);
        };
        if vector.terms.iter().all(|t| t.offsets.is_empty()) {
            return Ok(None);
        }
        let mut matches = Vec::new();
        for term in self.query_terms(query)?.iter().filter(|t| t.field == field) {
            if let Some(tv_term) = vector.find(&term.text) {
                matches.extend(tv_term.offsets.iter().map(|o| (o.start, o.end)));
            }
        }
        Ok(Some(excerpts(&text, &matches, options)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StandardAnalyzer;
    use crate::index::field_infos::FieldInfos;
    use crate::index::writer::{IndexWriter, IndexWriterConfig, OpenMode};
    use crate::query::{BooleanQuery, ConstantScoreQuery, FilteredQuery, PhraseQuery, SpanNode, SpanQuery};
    use crate::search::collector::DocIdCollector;
    use crate::search::filter::{FnFilter, QueryFilter, RangeFilter};
    use crate::search::sort::SortType;
    use crate::storage::memory::MemoryStorage;

    fn searcher(docs: &[&[(&str, &str)]]) -> Searcher {
        let storage = Arc::new(MemoryStorage::default());
        let mut writer = IndexWriter::open(
            storage.clone(),
            Arc::new(StandardAnalyzer::default()),
            OpenMode::Create(FieldInfos::default()),
            IndexWriterConfig::default(),
        )
        .unwrap();
        for fields in docs {
            let doc = fields
                .iter()
                .fold(Document::new(), |doc, (name, value)| doc.add_field(*name, *value));
            writer.add_document(&doc).unwrap();
        }
        writer.close().unwrap();
        Searcher::new(IndexReader::open(storage).unwrap())
    }

    #[test]
    fn test_term_and_boolean_search() {
        let s = searcher(&[&[("body", "cat sat")], &[("body", "cat ran")], &[("body", "dog ran")]]);
        let top = s.search(&Query::term("body", "cat"), 0, 10).unwrap();
        assert_eq!(top.total_hits, 2);
        assert_eq!(top.docs(), vec![0, 1]);
        assert!(top.max_score > 0.0);

        let q = Query::from(
            BooleanQuery::new()
                .must(Query::term("body", "cat"))
                .must_not(Query::term("body", "ran")),
        );
        assert_eq!(s.search(&q, 0, 10).unwrap().docs(), vec![0]);

        let q = Query::from(
            BooleanQuery::new()
                .should(Query::term("body", "cat"))
                .should(Query::term("body", "ran")),
        );
        let top = s.search(&q, 0, 10).unwrap();
        assert_eq!(top.total_hits, 3);
        // Doc 1 matches both clauses.
        assert_eq!(top.hits[0].doc, 1);
    }

    #[test]
    fn test_offset_limit_window() {
        let s = searcher(&[&[("body", "apple")], &[("body", "apple")], &[("body", "apple")], &[("body", "pear")]]);
        let top = s.search(&Query::term("body", "apple"), 1, 1).unwrap();
        assert_eq!(top.total_hits, 3);
        assert_eq!(top.docs(), vec![1]);
        assert!(s.search(&Query::term("body", "apple"), 0, 0).is_err());
        let empty = s.search(&Query::term("body", "zzz"), 0, 10).unwrap();
        assert_eq!(empty.total_hits, 0);
        assert_eq!(empty.max_score, 0.0);
    }

    #[test]
    fn test_phrase_and_span_search() {
        let s = searcher(&[&[("body", "the quick brown fox")], &[("body", "fox quick")]]);
        let exact = Query::from(PhraseQuery::new("body").with_terms(&["quick", "fox"]));
        assert_eq!(s.search(&exact, 0, 10).unwrap().total_hits, 0);
        let sloppy = Query::from(PhraseQuery::new("body").with_terms(&["quick", "fox"]).with_slop(1));
        assert_eq!(s.search(&sloppy, 0, 10).unwrap().docs(), vec![0]);

        let near = SpanNode::near(
            vec![SpanNode::term("body", "quick"), SpanNode::term("body", "fox")],
            1,
            false,
        )
        .unwrap();
        let mut docs = s.search(&Query::from(SpanQuery::new(near)), 0, 10).unwrap().docs();
        docs.sort_unstable();
        assert_eq!(docs, vec![0, 1]);
        let first = SpanNode::first(SpanNode::term("body", "fox"), 1);
        assert_eq!(s.search(&Query::from(SpanQuery::new(first)), 0, 10).unwrap().docs(), vec![1]);
    }

    #[test]
    fn test_explain_matches_search() {
        let s = searcher(&[
            &[("body", "cat sat on the mat")],
            &[("body", "cat cat ran")],
            &[("body", "dog ran")],
        ]);
        let q = Query::from(
            BooleanQuery::new()
                .should(Query::term("body", "cat").with_boost(2.0))
                .should(Query::term("body", "ran"))
                .should(Query::from(PhraseQuery::new("body").with_terms(&["cat", "ran"]))),
        );
        let top = s.search(&q, 0, 10).unwrap();
        assert_eq!(top.total_hits, 3);
        for hit in &top.hits {
            let explanation = s.explain(&q, hit.doc).unwrap();
            assert!(explanation.is_match());
            assert!((explanation.value - hit.score).abs() < 1e-5, "{explanation}");
            // The breakdown adds up to the value shown.
            let combined = match explanation.description.as_str() {
                "product of:" => explanation.details.iter().map(|d| d.value).product::<f32>(),
                _ => explanation.details.iter().map(|d| d.value).sum::<f32>(),
            };
            assert!((explanation.value - combined).abs() < 1e-5, "{explanation}");
        }
        let partial = s.explain(&q, 2).unwrap();
        assert_eq!(partial.description, "product of:");
        assert_eq!(partial.details[1].description, "coord(1/3)");
        assert!(!s.explain(&Query::term("body", "dog"), 0).unwrap().is_match());
        assert!(s.explain(&q, 99).is_err());
    }

    #[test]
    fn test_scan() {
        let s = searcher(&[&[("body", "x")], &[("body", "y")], &[("body", "x")], &[("body", "x")]]);
        let q = Query::term("body", "x");
        assert_eq!(s.scan(&q, 0, 10).unwrap(), vec![2, 3]);
        assert_eq!(s.scan(&q, 0, 1).unwrap(), vec![2]);
        assert_eq!(s.scan(&q, 1, 10).unwrap(), vec![2, 3]);
        assert_eq!(s.scan(&q, 2, 10).unwrap(), vec![3]);
        assert!(s.scan(&q, 3, 10).unwrap().is_empty());
        assert!(s.scan(&q, u32::MAX, 10).unwrap().is_empty());
    }

    #[test]
    fn test_sort_by_field() {
        let s = searcher(&[
            &[("body", "x"), ("year", "2001")],
            &[("body", "x"), ("year", "1999")],
            &[("body", "x")],
            &[("body", "x"), ("year", "2010")],
        ]);
        let options = SearchOptions::new().with_sort(Sort::by_field("year", SortType::Auto, false));
        assert_eq!(s.search_with(&Query::term("body", "x"), &options).unwrap().docs(), vec![1, 0, 3, 2]);
        let options = SearchOptions::new().with_sort(Sort::by_field("year", SortType::Integer, true));
        assert_eq!(s.search_with(&Query::term("body", "x"), &options).unwrap().docs(), vec![3, 0, 1, 2]);
        let options = SearchOptions::new().with_sort(Sort::index_order_reversed()).with_limit(2);
        assert_eq!(s.search_with(&Query::term("body", "x"), &options).unwrap().docs(), vec![3, 2]);
    }

    #[test]
    fn test_filters() {
        let s = searcher(&[
            &[("body", "red"), ("date", "20050101")],
            &[("body", "red"), ("date", "20041231")],
            &[("body", "blue"), ("date", "20060601")],
        ]);
        let since_2005: Arc<dyn Filter> =
            Arc::new(RangeFilter::new("date", Some("20050101"), None, true, false).unwrap());
        let options = SearchOptions::new().with_filter(Arc::clone(&since_2005));
        assert_eq!(s.search_with(&Query::term("body", "red"), &options).unwrap().docs(), vec![0]);

        let constant = Query::from(ConstantScoreQuery::new(Arc::clone(&since_2005)));
        let top = s.search(&constant, 0, 10).unwrap();
        assert_eq!(top.total_hits, 2);
        assert_eq!(top.hits[0].score, top.hits[1].score);

        let filtered = Query::from(FilteredQuery::new(
            Query::match_all(),
            Arc::new(QueryFilter::new(Query::term("body", "red"))),
        ));
        let mut collector = DocIdCollector::default();
        s.search_each(&filtered, None, &mut collector).unwrap();
        assert_eq!(collector.into_docs(), vec![0, 1]);

        let odd = FnFilter::new("odd", |reader: &IndexReader| {
            Ok((0..reader.max_doc()).map(|doc| doc % 2 == 1).collect())
        });
        let mut collector = DocIdCollector::default();
        s.search_each(&Query::match_all(), Some(&odd), &mut collector).unwrap();
        assert_eq!(collector.total_hits(), 1);
        assert_eq!(collector.into_docs(), vec![1]);
    }

    #[test]
    fn test_highlight() {
        let s = searcher(&[&[("body", "the quick brown fox jumps over the lazy dog")]]);
        let out = s
            .highlight(&Query::term("body", "fox"), 0, "body", &HighlightOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(out, vec!["the quick brown <b>fox</b> jumps over the lazy dog".to_string()]);
        assert!(
            s.highlight(&Query::term("body", "fox"), 0, "title", &HighlightOptions::default())
                .unwrap()
                .is_none()
        );
    }
}
