//! Queries built on document filters, and the match-all query.

use std::sync::Arc;

use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::query::{Query, boost_suffix};
use crate::search::filter::Filter;

/// Matches what `query` matches, restricted to documents the filter
/// accepts. Scores come from `query`.
#[derive(Debug, Clone)]
pub struct FilteredQuery {
    pub query: Box<Query>,
    pub filter: Arc<dyn Filter>,
    pub boost: f32,
}

impl FilteredQuery {
    pub fn new(query: Query, filter: Arc<dyn Filter>) -> Self {
        FilteredQuery {
            query: Box::new(query),
            filter,
            boost: 1.0,
        }
    }

    pub(crate) fn rewrite(&self, reader: &IndexReader) -> Result<FilteredQuery> {
        Ok(FilteredQuery {
            query: Box::new(self.query.rewrite(reader)?),
            filter: Arc::clone(&self.filter),
            boost: self.boost,
        })
    }

    pub fn to_query_string(&self, default_field: &str) -> String {
        format!(
            "FilteredQuery(query:{}, filter:{}){}",
            self.query.to_query_string(default_field),
            self.filter.describe(),
            boost_suffix(self.boost)
        )
    }
}

/// Filters compare by their description.
impl PartialEq for FilteredQuery {
    fn eq(&self, other: &Self) -> bool {
        self.query == other.query && self.boost == other.boost && self.filter.describe() == other.filter.describe()
    }
}

/// Every document the filter accepts, all with the same score.
#[derive(Debug, Clone)]
pub struct ConstantScoreQuery {
    pub filter: Arc<dyn Filter>,
    pub boost: f32,
}

impl ConstantScoreQuery {
    pub fn new(filter: Arc<dyn Filter>) -> Self {
        ConstantScoreQuery { filter, boost: 1.0 }
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn to_query_string(&self) -> String {
        format!("ConstantScore({}){}", self.filter.describe(), boost_suffix(self.boost))
    }
}

impl PartialEq for ConstantScoreQuery {
    fn eq(&self, other: &Self) -> bool {
        self.boost == other.boost && self.filter.describe() == other.filter.describe()
    }
}

/// Every live document, all with the same score.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchAllQuery {
    pub boost: f32,
}

impl Default for MatchAllQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchAllQuery {
    pub fn new() -> Self {
        MatchAllQuery { boost: 1.0 }
    }

    pub fn to_query_string(&self) -> String {
        format!("*{}", boost_suffix(self.boost))
    }
}
