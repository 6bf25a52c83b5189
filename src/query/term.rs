//! Single-term queries.

use crate::index::term::Term;
use crate::query::{boost_suffix, field_prefix};

/// Matches documents containing one term.
#[derive(Debug, Clone, PartialEq)]
pub struct TermQuery {
    pub term: Term,
    pub boost: f32,
}

impl TermQuery {
    pub fn new<F: Into<String>, T: Into<String>>(field: F, text: T) -> Self {
        TermQuery {
            term: Term::new(field, text),
            boost: 1.0,
        }
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn field(&self) -> &str {
        &self.term.field
    }

    pub fn text(&self) -> &str {
        &self.term.text
    }

    pub fn to_query_string(&self, default_field: &str) -> String {
        format!(
            "{}{}{}",
            field_prefix(&self.term.field, default_field),
            self.term.text,
            boost_suffix(self.boost)
        )
    }
}
