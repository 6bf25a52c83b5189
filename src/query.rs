//! The query model.
//!
//! [`Query`] is a closed set of node types. Multi-term nodes (range, typed
//! range, fuzzy, wildcard, prefix and span prefix) are expanded against an
//! [`IndexReader`] by [`Query::rewrite`] into explicit term lists before
//! they are scored; every expansion is capped by its node's `max_terms`.
//!
//! ```
//! use glaive::query::{BooleanQuery, Query};
//!
//! let query = Query::from(
//!     BooleanQuery::new()
//!         .must(Query::term("body", "cat"))
//!         .must_not(Query::term("body", "ran")),
//! );
//! assert_eq!(query.to_query_string("body"), "+cat -ran");
//! assert_eq!(query.to_string(), "+body:cat -body:ran");
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{GlaiveError, Result};
use crate::index::reader::IndexReader;
use crate::index::term::Term;

pub mod boolean;
pub mod filtered;
pub mod fuzzy;
pub mod multi_term;
pub mod parser;
pub mod phrase;
pub mod range;
pub mod span;
pub mod term;
pub mod wildcard;

pub use boolean::{BooleanClause, BooleanQuery, Occur};
pub use filtered::{ConstantScoreQuery, FilteredQuery, MatchAllQuery};
pub use fuzzy::FuzzyQuery;
pub use multi_term::{BoostedTerm, MultiTermQuery};
pub use parser::{QueryParser, QueryParserConfig};
pub use phrase::{PhrasePosition, PhraseQuery};
pub use range::{RangeQuery, TypedRangeQuery};
pub use span::{SpanNode, SpanQuery};
pub use term::TermQuery;
pub use wildcard::{PrefixQuery, WildcardQuery};

/// Default cap on the number of terms a multi-term query may expand to.
pub const DEFAULT_MAX_TERMS: usize = 512;

/// A search query.
#[derive(Debug, Clone)]
pub enum Query {
    Term(TermQuery),
    MultiTerm(MultiTermQuery),
    Phrase(PhraseQuery),
    Boolean(BooleanQuery),
    Range(RangeQuery),
    TypedRange(TypedRangeQuery),
    Fuzzy(FuzzyQuery),
    Wildcard(WildcardQuery),
    Prefix(PrefixQuery),
    Span(SpanQuery),
    Filtered(FilteredQuery),
    ConstantScore(ConstantScoreQuery),
    MatchAll(MatchAllQuery),
}

impl Query {
    /// A query for documents containing `text` in `field`.
    pub fn term<F: Into<String>, T: Into<String>>(field: F, text: T) -> Self {
        Query::Term(TermQuery::new(field, text))
    }

    /// A query matching every live document.
    pub fn match_all() -> Self {
        Query::MatchAll(MatchAllQuery::new())
    }

    pub fn boost(&self) -> f32 {
        match self {
            Query::Term(q) => q.boost,
            Query::MultiTerm(q) => q.boost,
            Query::Phrase(q) => q.boost,
            Query::Boolean(q) => q.boost,
            Query::Range(q) => q.boost,
            Query::TypedRange(q) => q.range.boost,
            Query::Fuzzy(q) => q.boost,
            Query::Wildcard(q) => q.boost,
            Query::Prefix(q) => q.boost,
            Query::Span(q) => q.boost,
            Query::Filtered(q) => q.boost,
            Query::ConstantScore(q) => q.boost,
            Query::MatchAll(q) => q.boost,
        }
    }

    pub fn set_boost(&mut self, boost: f32) {
        match self {
            Query::Term(q) => q.boost = boost,
            Query::MultiTerm(q) => q.boost = boost,
            Query::Phrase(q) => q.boost = boost,
            Query::Boolean(q) => q.boost = boost,
            Query::Range(q) => q.boost = boost,
            Query::TypedRange(q) => q.range.boost = boost,
            Query::Fuzzy(q) => q.boost = boost,
            Query::Wildcard(q) => q.boost = boost,
            Query::Prefix(q) => q.boost = boost,
            Query::Span(q) => q.boost = boost,
            Query::Filtered(q) => q.boost = boost,
            Query::ConstantScore(q) => q.boost = boost,
            Query::MatchAll(q) => q.boost = boost,
        }
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.set_boost(boost);
        self
    }

    /// Render the query in parser syntax. Terms of `default_field` are
    /// written without a field prefix.
    pub fn to_query_string(&self, default_field: &str) -> String {
        match self {
            Query::Term(q) => q.to_query_string(default_field),
            Query::MultiTerm(q) => q.to_query_string(default_field),
            Query::Phrase(q) => q.to_query_string(default_field),
            Query::Boolean(q) => q.to_query_string(default_field),
            Query::Range(q) => q.to_query_string(default_field),
            Query::TypedRange(q) => q.to_query_string(default_field),
            Query::Fuzzy(q) => q.to_query_string(default_field),
            Query::Wildcard(q) => q.to_query_string(default_field),
            Query::Prefix(q) => q.to_query_string(default_field),
            Query::Span(q) => q.to_query_string(default_field),
            Query::Filtered(q) => q.to_query_string(default_field),
            Query::ConstantScore(q) => q.to_query_string(),
            Query::MatchAll(q) => q.to_query_string(),
        }
    }

    /// Expand multi-term nodes into explicit term lists using `reader`'s
    /// term dictionary. Queries that need no expansion are returned as
    /// they are.
    ///
    /// Fails with [`GlaiveError::TooManyClauses`] when an expansion or a
    /// boolean query exceeds its cap, unless the node allows truncation.
    pub fn rewrite(&self, reader: &IndexReader) -> Result<Query> {
        match self {
            Query::Range(q) => q.rewrite(reader),
            Query::TypedRange(q) => q.rewrite(reader),
            Query::Fuzzy(q) => q.rewrite(reader),
            Query::Wildcard(q) => q.rewrite(reader),
            Query::Prefix(q) => q.rewrite(reader),
            Query::Boolean(q) => q.rewrite(reader),
            Query::Span(q) => q.rewrite(reader).map(Query::Span),
            Query::Filtered(q) => q.rewrite(reader).map(Query::Filtered),
            Query::Term(_)
            | Query::MultiTerm(_)
            | Query::Phrase(_)
            | Query::ConstantScore(_)
            | Query::MatchAll(_) => Ok(self.clone()),
        }
    }

    /// Add the terms this query searches for to `terms`. Only meaningful
    /// on rewritten queries; unexpanded multi-term nodes contribute
    /// nothing. Prohibited boolean clauses are skipped.
    pub fn extract_terms(&self, terms: &mut BTreeSet<Term>) {
        match self {
            Query::Term(q) => {
                terms.insert(q.term.clone());
            }
            Query::MultiTerm(q) => {
                for t in q.terms() {
                    terms.insert(Term::new(q.field.clone(), t.text.clone()));
                }
            }
            Query::Phrase(q) => {
                for position in &q.positions {
                    for text in &position.terms {
                        terms.insert(Term::new(q.field.clone(), text.clone()));
                    }
                }
            }
            Query::Boolean(q) => {
                for clause in q.clauses.iter().filter(|c| !c.is_prohibited()) {
                    clause.query.extract_terms(terms);
                }
            }
            Query::Span(q) => q.node.extract_terms(terms),
            Query::Filtered(q) => q.query.extract_terms(terms),
            Query::Range(_)
            | Query::TypedRange(_)
            | Query::Fuzzy(_)
            | Query::Wildcard(_)
            | Query::Prefix(_)
            | Query::ConstantScore(_)
            | Query::MatchAll(_) => {}
        }
    }

    fn variant_index(&self) -> u8 {
        match self {
            Query::Term(_) => 0,
            Query::MultiTerm(_) => 1,
            Query::Phrase(_) => 2,
            Query::Boolean(_) => 3,
            Query::Range(_) => 4,
            Query::TypedRange(_) => 5,
            Query::Fuzzy(_) => 6,
            Query::Wildcard(_) => 7,
            Query::Prefix(_) => 8,
            Query::Span(_) => 9,
            Query::Filtered(_) => 10,
            Query::ConstantScore(_) => 11,
            Query::MatchAll(_) => 12,
        }
    }
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Query::Term(a), Query::Term(b)) => a == b,
            (Query::MultiTerm(a), Query::MultiTerm(b)) => a == b,
            (Query::Phrase(a), Query::Phrase(b)) => a == b,
            (Query::Boolean(a), Query::Boolean(b)) => a == b,
            (Query::Range(a), Query::Range(b)) => a == b,
            (Query::TypedRange(a), Query::TypedRange(b)) => a == b,
            (Query::Fuzzy(a), Query::Fuzzy(b)) => a == b,
            (Query::Wildcard(a), Query::Wildcard(b)) => a == b,
            (Query::Prefix(a), Query::Prefix(b)) => a == b,
            (Query::Span(a), Query::Span(b)) => a == b,
            (Query::Filtered(a), Query::Filtered(b)) => a == b,
            (Query::ConstantScore(a), Query::ConstantScore(b)) => a == b,
            (Query::MatchAll(a), Query::MatchAll(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Query {}

impl Hash for Query {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // The rendering covers every field compared by `eq`, so equal
        // queries hash alike.
        self.variant_index().hash(state);
        self.to_query_string("").hash(state);
        self.boost().to_bits().hash(state);
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string(""))
    }
}

impl From<TermQuery> for Query {
    fn from(q: TermQuery) -> Self {
        Query::Term(q)
    }
}

impl From<MultiTermQuery> for Query {
    fn from(q: MultiTermQuery) -> Self {
        Query::MultiTerm(q)
    }
}

impl From<PhraseQuery> for Query {
    fn from(q: PhraseQuery) -> Self {
        Query::Phrase(q)
    }
}

impl From<BooleanQuery> for Query {
    fn from(q: BooleanQuery) -> Self {
        Query::Boolean(q)
    }
}

impl From<RangeQuery> for Query {
    fn from(q: RangeQuery) -> Self {
        Query::Range(q)
    }
}

impl From<TypedRangeQuery> for Query {
    fn from(q: TypedRangeQuery) -> Self {
        Query::TypedRange(q)
    }
}

impl From<FuzzyQuery> for Query {
    fn from(q: FuzzyQuery) -> Self {
        Query::Fuzzy(q)
    }
}

impl From<WildcardQuery> for Query {
    fn from(q: WildcardQuery) -> Self {
        Query::Wildcard(q)
    }
}

impl From<PrefixQuery> for Query {
    fn from(q: PrefixQuery) -> Self {
        Query::Prefix(q)
    }
}

impl From<SpanQuery> for Query {
    fn from(q: SpanQuery) -> Self {
        Query::Span(q)
    }
}

impl From<FilteredQuery> for Query {
    fn from(q: FilteredQuery) -> Self {
        Query::Filtered(q)
    }
}

impl From<ConstantScoreQuery> for Query {
    fn from(q: ConstantScoreQuery) -> Self {
        Query::ConstantScore(q)
    }
}

impl From<MatchAllQuery> for Query {
    fn from(q: MatchAllQuery) -> Self {
        Query::MatchAll(q)
    }
}

/// `^boost` suffix, empty for the neutral boost.
pub(crate) fn boost_suffix(boost: f32) -> String {
    if boost == 1.0 {
        String::new()
    } else {
        format!("^{boost:?}")
    }
}

/// `field:` prefix, empty when `field` is the default field.
pub(crate) fn field_prefix(field: &str, default_field: &str) -> String {
    if field == default_field {
        String::new()
    } else {
        format!("{field}:")
    }
}

/// What an expansion does with a visited term.
pub(crate) enum Visit {
    Take(f32),
    Skip,
    Stop,
}

/// Walk the terms of `field` from `start` in dictionary order, collecting
/// those `visit` takes. More than `max_terms` takes is an error unless
/// `truncate` is set, in which case the highest-boosted terms are kept and
/// earlier terms win ties.
pub(crate) fn expand_terms(
    reader: &IndexReader,
    field: &str,
    start: &str,
    max_terms: usize,
    truncate: bool,
    describe: &dyn Fn() -> String,
    mut visit: impl FnMut(&str) -> Visit,
) -> Result<Vec<BoostedTerm>> {
    let mut out: Vec<BoostedTerm> = Vec::new();
    let mut terms = reader.terms_from(&Term::new(field, start))?;
    while terms.next()? {
        let Some(text) = terms.text() else {
            break;
        };
        let boost = match visit(text) {
            Visit::Take(boost) => boost,
            Visit::Skip => continue,
            Visit::Stop => break,
        };
        if out.len() < max_terms {
            out.push(BoostedTerm::new(text, boost));
            continue;
        }
        if !truncate {
            return Err(GlaiveError::too_many_clauses(
                max_terms,
                format!("{} expands to more than {max_terms} terms", describe()),
            ));
        }
        let weakest = out
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.boost.total_cmp(&b.boost))
            .map(|(i, t)| (i, t.boost));
        if let Some((i, weakest_boost)) = weakest
            && boost > weakest_boost
        {
            out.remove(i);
            out.push(BoostedTerm::new(text, boost));
        }
    }
    log::trace!("{} expanded to {} terms", describe(), out.len());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_boost_and_rendering() {
        let q = Query::term("title", "rust").with_boost(2.0);
        assert_eq!(q.boost(), 2.0);
        assert_eq!(q.to_query_string("body"), "title:rust^2.0");
        assert_eq!(q.to_query_string("title"), "rust^2.0");
        assert_eq!(Query::match_all().to_string(), "*");
    }

    #[test]
    fn test_equality_and_hash() {
        let a = Query::term("body", "fox");
        let b = Query::term("body", "fox");
        let c = Query::term("body", "fox").with_boost(3.0);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, Query::term("title", "fox"));

        let set: HashSet<Query> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_extract_terms_skips_prohibited() {
        let q = Query::from(
            BooleanQuery::new()
                .must(Query::term("body", "cat"))
                .should(Query::from(PhraseQuery::new("body").with_terms(&["big", "dog"])))
                .must_not(Query::term("body", "ran")),
        );
        let mut terms = BTreeSet::new();
        q.extract_terms(&mut terms);
        let texts: Vec<_> = terms.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["big", "cat", "dog"]);
    }
}
