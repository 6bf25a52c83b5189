//! Document filters.
//!
//! A [`Filter`] turns a reader into the set of documents it accepts. Filters
//! restrict a search without contributing to scores.

use std::fmt::{self, Debug};
use std::sync::Arc;

use bit_vec::BitVec;

use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::index::term::Term;
use crate::query::range::RangeQuery;
use crate::query::{Query, Visit, expand_terms};
use crate::search::similarity::Similarity;
use crate::search::weight::create_weight;

/// Computes the accepted documents of a reader.
pub trait Filter: Debug + Send + Sync {
    /// One bit per document id, set for accepted documents.
    fn bits(&self, reader: &IndexReader) -> Result<BitVec>;

    /// Human-readable form, used when rendering and comparing queries.
    fn describe(&self) -> String;
}

/// Set the bits of every live document containing `term`.
pub(crate) fn mark_term_docs(reader: &IndexReader, term: &Term, bits: &mut BitVec) -> Result<()> {
    let mut docs = reader.term_docs(term)?;
    while docs.next()? {
        bits.set(docs.doc() as usize, true);
    }
    Ok(())
}

/// Accepts the documents a query matches.
#[derive(Debug, Clone)]
pub struct QueryFilter {
    query: Query,
}

impl QueryFilter {
    pub fn new(query: Query) -> Self {
        QueryFilter { query }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }
}

impl Filter for QueryFilter {
    fn bits(&self, reader: &IndexReader) -> Result<BitVec> {
        let mut bits = BitVec::from_elem(reader.max_doc() as usize, false);
        let rewritten = self.query.rewrite(reader)?;
        let weight = create_weight(&rewritten, reader, Similarity)?;
        if let Some(mut scorer) = weight.scorer(reader)? {
            while scorer.next()? {
                bits.set(scorer.doc() as usize, true);
            }
        }
        Ok(bits)
    }

    fn describe(&self) -> String {
        format!("QueryFilter({})", self.query)
    }
}

/// Accepts documents with a term of `field` inside a range. Unlike a range
/// query, the filter has no cap on the number of terms it covers.
#[derive(Debug, Clone)]
pub struct RangeFilter {
    range: RangeQuery,
}

impl RangeFilter {
    pub fn new<S: Into<String>>(
        field: S,
        lower: Option<&str>,
        upper: Option<&str>,
        include_lower: bool,
        include_upper: bool,
    ) -> Result<Self> {
        let range = RangeQuery::new(field, lower, upper, include_lower, include_upper)?;
        Ok(RangeFilter { range })
    }

    pub fn field(&self) -> &str {
        &self.range.field
    }
}

impl Filter for RangeFilter {
    fn bits(&self, reader: &IndexReader) -> Result<BitVec> {
        let mut bits = BitVec::from_elem(reader.max_doc() as usize, false);
        let start = self.range.lower.as_deref().unwrap_or("");
        let describe = || self.describe();
        let terms = expand_terms(reader, &self.range.field, start, usize::MAX, false, &describe, |text| {
            match &self.range.upper {
                Some(upper) if text > upper.as_str() => Visit::Stop,
                _ if self.range.contains(text) => Visit::Take(1.0),
                _ => Visit::Skip,
            }
        })?;
        for term in terms {
            mark_term_docs(reader, &Term::new(self.range.field.clone(), term.text), &mut bits)?;
        }
        Ok(bits)
    }

    fn describe(&self) -> String {
        format!("RangeFilter({})", self.range.to_query_string(""))
    }
}

/// A filter computed by a closure.
#[derive(Clone)]
pub struct FnFilter {
    name: String,
    func: Arc<dyn Fn(&IndexReader) -> Result<BitVec> + Send + Sync>,
}

impl FnFilter {
    pub fn new<S, F>(name: S, func: F) -> Self
    where
        S: Into<String>,
        F: Fn(&IndexReader) -> Result<BitVec> + Send + Sync + 'static,
    {
        FnFilter {
            name: name.into(),
            func: Arc::new(func),
        }
    }
}

impl Debug for FnFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFilter").field("name", &self.name).finish()
    }
}

impl Filter for FnFilter {
    fn bits(&self, reader: &IndexReader) -> Result<BitVec> {
        let mut bits = (self.func)(reader)?;
        // Normalize to one bit per document.
        bits.truncate(reader.max_doc() as usize);
        bits.grow(reader.max_doc() as usize - bits.len(), false);
        Ok(bits)
    }

    fn describe(&self) -> String {
        format!("FnFilter({})", self.name)
    }
}
