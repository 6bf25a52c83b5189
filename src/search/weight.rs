//! Query weights.
//!
//! A [`Weight`] is the searcher-dependent state of a rewritten query: idf
//! factors and boosts, normalized across the whole query tree. It builds
//! the scorers and explains their scores.
//!
//! Scoring follows the classic vector space model: a term contributes
//! `tf(freq) * idf^2 * boost * query_norm * field_norm`, boolean queries
//! sum their matching clauses and multiply by `coord`.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;

use bit_vec::BitVec;

use crate::error::{GlaiveError, Result};
use crate::index::reader::IndexReader;
use crate::index::term::Term;
use crate::query::boolean::{BooleanClause, BooleanQuery, Occur};
use crate::query::multi_term::MultiTermQuery;
use crate::query::phrase::PhraseQuery;
use crate::query::span::SpanQuery;
use crate::query::term::TermQuery;
use crate::query::Query;
use crate::search::boolean_scorer::BooleanScorer;
use crate::search::explanation::Explanation;
use crate::search::filter::Filter;
use crate::search::phrase_scorer::{PhraseScorer, UnionPostings};
use crate::search::scorer::{BitsScorer, FilteredScorer, Scorer, TermScorer, field_norms};
use crate::search::similarity::Similarity;
use crate::search::spans::{SpanScorer, build_spans};

/// Searcher-dependent state of a query.
pub trait Weight: Debug {
    /// Sum of squared term weights, before normalization.
    fn sum_of_squared_weights(&self) -> f32;

    /// Apply the query normalization factor.
    fn normalize(&mut self, norm: f32);

    /// A scorer over the reader, `None` when nothing can match.
    fn scorer(&self, reader: &IndexReader) -> Result<Option<Box<dyn Scorer>>>;

    /// Explain the score of `doc`. The explanation's value equals the score
    /// the scorer gives the document.
    fn explain(&self, reader: &IndexReader, doc: u32) -> Result<Explanation>;
}

/// Build the weight of a rewritten query. Multi-term nodes that still need
/// expansion are rejected.
pub fn create_weight(query: &Query, reader: &IndexReader, similarity: Similarity) -> Result<Box<dyn Weight>> {
    Ok(match query {
        Query::Term(q) => Box::new(TermWeight::new(q, reader, similarity)?),
        Query::MultiTerm(q) => Box::new(BooleanWeight::new(&multi_term_as_boolean(q), reader, similarity)?),
        Query::Phrase(q) => Box::new(PhraseWeight::new(q, reader, similarity)?),
        Query::Boolean(q) => Box::new(BooleanWeight::new(q, reader, similarity)?),
        Query::Span(q) => Box::new(SpanWeight::new(q, reader, similarity)?),
        Query::Filtered(q) => Box::new(FilteredWeight {
            inner: create_weight(&q.query, reader, similarity)?,
            filter: Arc::clone(&q.filter),
            boost: q.boost,
        }),
        Query::ConstantScore(q) => Box::new(ConstantWeight::new(Some(Arc::clone(&q.filter)), q.boost)),
        Query::MatchAll(q) => Box::new(ConstantWeight::new(None, q.boost)),
        Query::Range(_) | Query::TypedRange(_) | Query::Fuzzy(_) | Query::Wildcard(_) | Query::Prefix(_) => {
            return Err(GlaiveError::query(format!(
                "query {query} must be rewritten before it is scored"
            )));
        }
    })
}

/// A multi-term query scores like a disjunction of its boosted terms
/// without coordination.
fn multi_term_as_boolean(q: &MultiTermQuery) -> BooleanQuery {
    q.terms().iter().fold(
        BooleanQuery::new()
            .with_coord_disabled(true)
            .with_max_clause_count(usize::MAX)
            .with_boost(q.boost),
        |bq, t| {
            bq.with_clause(BooleanClause::should(Query::Term(
                TermQuery::new(q.field.clone(), t.text.clone()).with_boost(t.boost),
            )))
        },
    )
}

/// Position `scorer` on `doc` and score it, `None` if it does not match.
fn score_at(scorer: &mut dyn Scorer, doc: u32) -> Result<Option<f32>> {
    if scorer.skip_to(doc)? && scorer.doc() == doc {
        Ok(Some(scorer.score()?))
    } else {
        Ok(None)
    }
}

/// Live documents of the reader.
fn live_docs(reader: &IndexReader) -> BitVec {
    let max_doc = reader.max_doc();
    let mut bits = BitVec::from_elem(max_doc as usize, true);
    if reader.has_deletions() {
        for doc in 0..max_doc {
            if reader.is_deleted(doc) {
                bits.set(doc as usize, false);
            }
        }
    }
    bits
}

/// Explanation of the query-side factors shared by term, phrase and span
/// weights.
fn query_weight_explanation(query_weight: f32, boost: f32, idf: Explanation, query_norm: f32) -> Explanation {
    let mut e = Explanation::new(query_weight, "queryWeight, product of:");
    if boost != 1.0 {
        e.add_detail(Explanation::new(boost, "boost"));
    }
    e.add_detail(idf);
    e.add_detail(Explanation::new(query_norm, "queryNorm"));
    e
}

fn field_weight_explanation(tf: Explanation, idf: Explanation, norm: f32, field: &str, doc: u32) -> Explanation {
    Explanation::new(tf.value * idf.value * norm, format!("fieldWeight({field} in {doc}), product of:"))
        .with_detail(tf)
        .with_detail(idf)
        .with_detail(Explanation::new(norm, format!("fieldNorm(field={field}, doc={doc})")))
}

fn product_explanation(score: f32, description: String, query: Explanation, field: Explanation) -> Explanation {
    Explanation::new(score, description).with_detail(query).with_detail(field)
}

#[derive(Debug)]
struct TermWeight {
    term: Term,
    boost: f32,
    doc_freq: u32,
    idf: f32,
    query_norm: f32,
    query_weight: f32,
    value: f32,
    similarity: Similarity,
}

impl TermWeight {
    fn new(query: &TermQuery, reader: &IndexReader, similarity: Similarity) -> Result<Self> {
        let doc_freq = reader.doc_freq(&query.term)?;
        let idf = similarity.idf(doc_freq as u64, reader.max_doc() as u64);
        Ok(TermWeight {
            term: query.term.clone(),
            boost: query.boost,
            doc_freq,
            idf,
            query_norm: 1.0,
            query_weight: idf * query.boost,
            value: idf * query.boost * idf,
            similarity,
        })
    }

    fn term_scorer(&self, reader: &IndexReader) -> Result<Option<TermScorer>> {
        if self.doc_freq == 0 {
            return Ok(None);
        }
        Ok(Some(TermScorer::new(
            reader.term_docs(&self.term)?,
            self.value,
            field_norms(reader, &self.term.field),
            self.similarity,
        )))
    }

    fn idf_explanation(&self, max_doc: u32) -> Explanation {
        Explanation::new(self.idf, format!("idf(docFreq={}, numDocs={max_doc})", self.doc_freq))
    }
}

impl Weight for TermWeight {
    fn sum_of_squared_weights(&self) -> f32 {
        self.query_weight * self.query_weight
    }

    fn normalize(&mut self, norm: f32) {
        self.query_norm = norm;
        self.query_weight = self.idf * self.boost * norm;
        self.value = self.query_weight * self.idf;
    }

    fn scorer(&self, reader: &IndexReader) -> Result<Option<Box<dyn Scorer>>> {
        Ok(self.term_scorer(reader)?.map(|s| Box::new(s) as Box<dyn Scorer>))
    }

    fn explain(&self, reader: &IndexReader, doc: u32) -> Result<Explanation> {
        let Some(mut scorer) = self.term_scorer(reader)? else {
            return Ok(Explanation::no_match(format!("no documents contain {}", self.term)));
        };
        let Some(score) = score_at(&mut scorer, doc)? else {
            return Ok(Explanation::no_match(format!("{} not in document {doc}", self.term)));
        };
        let freq = scorer.freq();
        let tf = Explanation::new(self.similarity.tf(freq as f32), format!("tf(termFreq({})={freq})", self.term));
        let query = query_weight_explanation(
            self.query_weight,
            self.boost,
            self.idf_explanation(reader.max_doc()),
            self.query_norm,
        );
        let field = field_weight_explanation(
            tf,
            self.idf_explanation(reader.max_doc()),
            scorer.field_norm(),
            &self.term.field,
            doc,
        );
        Ok(product_explanation(score, format!("weight({} in {doc}), product of:", self.term), query, field))
    }
}

#[derive(Debug)]
struct PhraseWeight {
    query: PhraseQuery,
    idf: f32,
    idf_description: String,
    query_norm: f32,
    query_weight: f32,
    value: f32,
    similarity: Similarity,
}

impl PhraseWeight {
    fn new(query: &PhraseQuery, reader: &IndexReader, similarity: Similarity) -> Result<Self> {
        let max_doc = reader.max_doc() as u64;
        let mut idf = 0.0;
        let mut parts = Vec::new();
        for position in &query.positions {
            for text in &position.terms {
                let df = reader.doc_freq(&Term::new(query.field.clone(), text.clone()))?;
                idf += similarity.idf(df as u64, max_doc);
                parts.push(format!("{text}={df}"));
            }
        }
        Ok(PhraseWeight {
            query: query.clone(),
            idf,
            idf_description: format!("idf({}: {})", query.field, parts.join(" ")),
            query_norm: 1.0,
            query_weight: idf * query.boost,
            value: idf * query.boost * idf,
            similarity,
        })
    }

    fn phrase_scorer(&self, reader: &IndexReader) -> Result<Option<PhraseScorer>> {
        if self.query.positions.is_empty() {
            return Ok(None);
        }
        let mut slots = Vec::with_capacity(self.query.positions.len());
        for position in &self.query.positions {
            let mut enums = Vec::with_capacity(position.terms.len());
            for text in &position.terms {
                let term = Term::new(self.query.field.clone(), text.clone());
                if reader.doc_freq(&term)? > 0 {
                    enums.push(reader.term_positions(&term)?);
                }
            }
            if enums.is_empty() {
                return Ok(None);
            }
            slots.push((position.position, UnionPostings::new(enums)));
        }
        Ok(Some(PhraseScorer::new(
            slots,
            self.query.slop,
            self.value,
            field_norms(reader, &self.query.field),
            self.similarity,
        )))
    }
}

impl Weight for PhraseWeight {
    fn sum_of_squared_weights(&self) -> f32 {
        self.query_weight * self.query_weight
    }

    fn normalize(&mut self, norm: f32) {
        self.query_norm = norm;
        self.query_weight = self.idf * self.query.boost * norm;
        self.value = self.query_weight * self.idf;
    }

    fn scorer(&self, reader: &IndexReader) -> Result<Option<Box<dyn Scorer>>> {
        Ok(self.phrase_scorer(reader)?.map(|s| Box::new(s) as Box<dyn Scorer>))
    }

    fn explain(&self, reader: &IndexReader, doc: u32) -> Result<Explanation> {
        let rendered = self.query.to_query_string("");
        let Some(mut scorer) = self.phrase_scorer(reader)? else {
            return Ok(Explanation::no_match(format!("no documents contain {rendered}")));
        };
        let Some(score) = score_at(&mut scorer, doc)? else {
            return Ok(Explanation::no_match(format!("{rendered} not in document {doc}")));
        };
        let freq = scorer.freq();
        let tf = Explanation::new(self.similarity.tf(freq), format!("tf(phraseFreq={freq})"));
        let idf = || Explanation::new(self.idf, self.idf_description.clone());
        let query = query_weight_explanation(self.query_weight, self.query.boost, idf(), self.query_norm);
        let field = field_weight_explanation(tf, idf(), scorer.field_norm(), &self.query.field, doc);
        Ok(product_explanation(score, format!("weight({rendered} in {doc}), product of:"), query, field))
    }
}

#[derive(Debug)]
struct SpanWeight {
    query: SpanQuery,
    idf: f32,
    idf_description: String,
    query_norm: f32,
    query_weight: f32,
    value: f32,
    similarity: Similarity,
}

impl SpanWeight {
    fn new(query: &SpanQuery, reader: &IndexReader, similarity: Similarity) -> Result<Self> {
        let mut terms = BTreeSet::new();
        query.node.extract_terms(&mut terms);
        let max_doc = reader.max_doc() as u64;
        let mut idf = 0.0;
        let mut parts = Vec::new();
        for term in &terms {
            let df = reader.doc_freq(term)?;
            idf += similarity.idf(df as u64, max_doc);
            parts.push(format!("{}={df}", term.text));
        }
        Ok(SpanWeight {
            query: query.clone(),
            idf,
            idf_description: format!("idf({}: {})", query.field(), parts.join(" ")),
            query_norm: 1.0,
            query_weight: idf * query.boost,
            value: idf * query.boost * idf,
            similarity,
        })
    }

    fn span_scorer(&self, reader: &IndexReader) -> Result<SpanScorer> {
        Ok(SpanScorer::new(
            build_spans(&self.query.node, reader)?,
            self.value,
            field_norms(reader, self.query.field()),
            self.similarity,
        ))
    }
}

impl Weight for SpanWeight {
    fn sum_of_squared_weights(&self) -> f32 {
        self.query_weight * self.query_weight
    }

    fn normalize(&mut self, norm: f32) {
        self.query_norm = norm;
        self.query_weight = self.idf * self.query.boost * norm;
        self.value = self.query_weight * self.idf;
    }

    fn scorer(&self, reader: &IndexReader) -> Result<Option<Box<dyn Scorer>>> {
        Ok(Some(Box::new(self.span_scorer(reader)?)))
    }

    fn explain(&self, reader: &IndexReader, doc: u32) -> Result<Explanation> {
        let rendered = self.query.to_query_string("");
        let mut scorer = self.span_scorer(reader)?;
        let Some(score) = score_at(&mut scorer, doc)? else {
            return Ok(Explanation::no_match(format!("{rendered} not in document {doc}")));
        };
        let freq = scorer.freq();
        let tf = Explanation::new(self.similarity.tf(freq), format!("tf(phraseFreq={freq})"));
        let idf = || Explanation::new(self.idf, self.idf_description.clone());
        let query = query_weight_explanation(self.query_weight, self.query.boost, idf(), self.query_norm);
        let field = field_weight_explanation(tf, idf(), scorer.field_norm(), self.query.field(), doc);
        Ok(product_explanation(score, format!("weight({rendered} in {doc}), product of:"), query, field))
    }
}

#[derive(Debug)]
struct BooleanWeight {
    clauses: Vec<(Box<dyn Weight>, Occur)>,
    boost: f32,
    coord_disabled: bool,
    similarity: Similarity,
}

impl BooleanWeight {
    fn new(query: &BooleanQuery, reader: &IndexReader, similarity: Similarity) -> Result<Self> {
        let clauses = query
            .clauses
            .iter()
            .map(|c| Ok((create_weight(&c.query, reader, similarity)?, c.occur)))
            .collect::<Result<Vec<_>>>()?;
        Ok(BooleanWeight {
            clauses,
            boost: query.boost,
            coord_disabled: query.coord_disabled,
            similarity,
        })
    }

    fn max_coord(&self) -> usize {
        self.clauses.iter().filter(|(_, occur)| *occur != Occur::MustNot).count()
    }

    fn coord_factors(&self) -> Vec<f32> {
        let max = self.max_coord();
        (0..=max)
            .map(|overlap| {
                if self.coord_disabled {
                    1.0
                } else {
                    self.similarity.coord(overlap, max)
                }
            })
            .collect()
    }
}

impl Weight for BooleanWeight {
    fn sum_of_squared_weights(&self) -> f32 {
        let sum: f32 = self
            .clauses
            .iter()
            .filter(|(_, occur)| *occur != Occur::MustNot)
            .map(|(w, _)| w.sum_of_squared_weights())
            .sum();
        sum * self.boost * self.boost
    }

    fn normalize(&mut self, norm: f32) {
        let norm = norm * self.boost;
        for (weight, _) in &mut self.clauses {
            weight.normalize(norm);
        }
    }

    fn scorer(&self, reader: &IndexReader) -> Result<Option<Box<dyn Scorer>>> {
        let mut scorers = Vec::new();
        let mut prohibited = Vec::new();
        for (weight, occur) in &self.clauses {
            match (weight.scorer(reader)?, occur) {
                (None, Occur::Must) => return Ok(None),
                (None, _) => {}
                (Some(s), Occur::Must) => scorers.push((s, true)),
                (Some(s), Occur::Should) => scorers.push((s, false)),
                (Some(s), Occur::MustNot) => prohibited.push(s),
            }
        }
        if scorers.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(BooleanScorer::new(scorers, prohibited, self.coord_factors()))))
    }

    fn explain(&self, reader: &IndexReader, doc: u32) -> Result<Explanation> {
        let mut sum = Explanation::new(0.0, "sum of:");
        let mut overlap = 0;
        for (weight, occur) in &self.clauses {
            let e = weight.explain(reader, doc)?;
            match occur {
                Occur::MustNot if e.is_match() => {
                    return Ok(Explanation::no_match("match prohibited by a clause").with_detail(e));
                }
                Occur::MustNot => {}
                Occur::Must if !e.is_match() => {
                    return Ok(Explanation::no_match("failure to match a required clause").with_detail(e));
                }
                _ if e.is_match() => {
                    overlap += 1;
                    sum.value += e.value;
                    sum.add_detail(e);
                }
                _ => {}
            }
        }
        if overlap == 0 {
            return Ok(Explanation::no_match("no matching clauses"));
        }
        let max = self.max_coord();
        let coord = if self.coord_disabled { 1.0 } else { self.similarity.coord(overlap, max) };
        if coord == 1.0 {
            return Ok(sum);
        }
        Ok(Explanation::new(sum.value * coord, "product of:")
            .with_detail(sum)
            .with_detail(Explanation::new(coord, format!("coord({overlap}/{max})"))))
    }
}

/// Same score for every accepted live document.
#[derive(Debug)]
struct ConstantWeight {
    filter: Option<Arc<dyn Filter>>,
    boost: f32,
    query_norm: f32,
    value: f32,
}

impl ConstantWeight {
    fn new(filter: Option<Arc<dyn Filter>>, boost: f32) -> Self {
        ConstantWeight {
            filter,
            boost,
            query_norm: 1.0,
            value: boost,
        }
    }

    fn docs(&self, reader: &IndexReader) -> Result<BitVec> {
        let mut live = live_docs(reader);
        if let Some(filter) = &self.filter {
            live.and(&filter.bits(reader)?);
        }
        Ok(live)
    }

    fn describe(&self) -> String {
        match &self.filter {
            Some(filter) => format!("ConstantScore({})", filter.describe()),
            None => "MatchAll".to_string(),
        }
    }
}

impl Weight for ConstantWeight {
    fn sum_of_squared_weights(&self) -> f32 {
        self.boost * self.boost
    }

    fn normalize(&mut self, norm: f32) {
        self.query_norm = norm;
        self.value = self.boost * norm;
    }

    fn scorer(&self, reader: &IndexReader) -> Result<Option<Box<dyn Scorer>>> {
        Ok(Some(Box::new(BitsScorer::new(self.docs(reader)?, self.value))))
    }

    fn explain(&self, reader: &IndexReader, doc: u32) -> Result<Explanation> {
        if !self.docs(reader)?.get(doc as usize).unwrap_or(false) {
            return Ok(Explanation::no_match(format!("{} does not accept document {doc}", self.describe())));
        }
        let mut e = Explanation::new(self.value, format!("{}, product of:", self.describe()));
        if self.boost != 1.0 {
            e.add_detail(Explanation::new(self.boost, "boost"));
        }
        e.add_detail(Explanation::new(self.query_norm, "queryNorm"));
        Ok(e)
    }
}

#[derive(Debug)]
struct FilteredWeight {
    inner: Box<dyn Weight>,
    filter: Arc<dyn Filter>,
    boost: f32,
}

impl Weight for FilteredWeight {
    fn sum_of_squared_weights(&self) -> f32 {
        self.inner.sum_of_squared_weights() * self.boost * self.boost
    }

    fn normalize(&mut self, norm: f32) {
        self.inner.normalize(norm * self.boost);
    }

    fn scorer(&self, reader: &IndexReader) -> Result<Option<Box<dyn Scorer>>> {
        let Some(inner) = self.inner.scorer(reader)? else {
            return Ok(None);
        };
        Ok(Some(Box::new(FilteredScorer::new(inner, self.filter.bits(reader)?))))
    }

    fn explain(&self, reader: &IndexReader, doc: u32) -> Result<Explanation> {
        let inner = self.inner.explain(reader, doc)?;
        if !inner.is_match() {
            return Ok(inner);
        }
        if self.filter.bits(reader)?.get(doc as usize).unwrap_or(false) {
            Ok(inner)
        } else {
            Ok(Explanation::no_match(format!("{} rejects document {doc}", self.filter.describe())).with_detail(inner))
        }
    }
}
