//! Queries over an explicit list of weighted terms in one field.
//!
//! This is also what every expanding query rewrites to.

use crate::error::{GlaiveError, Result};
use crate::query::{DEFAULT_MAX_TERMS, boost_suffix, field_prefix};

/// A term text with its own boost.
#[derive(Debug, Clone, PartialEq)]
pub struct BoostedTerm {
    pub text: String,
    pub boost: f32,
}

impl BoostedTerm {
    pub fn new<S: Into<String>>(text: S, boost: f32) -> Self {
        BoostedTerm {
            text: text.into(),
            boost,
        }
    }
}

/// Matches documents containing any of its terms. Each matching term
/// contributes its boosted score.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiTermQuery {
    pub field: String,
    terms: Vec<BoostedTerm>,
    /// Terms with a lower boost are ignored.
    pub min_score: f32,
    pub max_terms: usize,
    /// Keep the best `max_terms` terms instead of failing on overflow.
    pub truncate_expansion: bool,
    pub boost: f32,
}

impl MultiTermQuery {
    pub fn new<S: Into<String>>(field: S) -> Self {
        MultiTermQuery {
            field: field.into(),
            terms: Vec::new(),
            min_score: 0.0,
            max_terms: DEFAULT_MAX_TERMS,
            truncate_expansion: false,
            boost: 1.0,
        }
    }

    pub(crate) fn from_terms<S: Into<String>>(
        field: S,
        terms: Vec<BoostedTerm>,
        max_terms: usize,
        truncate_expansion: bool,
        boost: f32,
    ) -> Self {
        MultiTermQuery {
            field: field.into(),
            terms,
            min_score: 0.0,
            max_terms,
            truncate_expansion,
            boost,
        }
    }

    pub fn with_max_terms(mut self, max_terms: usize) -> Self {
        self.max_terms = max_terms;
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_truncate_expansion(mut self, truncate: bool) -> Self {
        self.truncate_expansion = truncate;
        self
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn terms(&self) -> &[BoostedTerm] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn add_term<S: Into<String>>(&mut self, text: S) -> Result<()> {
        self.add_term_boost(text, 1.0)
    }

    /// Add `text` with its own boost. Terms below `min_score` are dropped.
    /// Once `max_terms` is reached a new term either replaces the weakest
    /// one (with `truncate_expansion`) or fails.
    pub fn add_term_boost<S: Into<String>>(&mut self, text: S, boost: f32) -> Result<()> {
        if boost < self.min_score {
            return Ok(());
        }
        if self.terms.len() < self.max_terms {
            self.terms.push(BoostedTerm::new(text, boost));
            return Ok(());
        }
        if !self.truncate_expansion {
            return Err(GlaiveError::too_many_clauses(
                self.max_terms,
                format!("multi-term query on {} holds more than {} terms", self.field, self.max_terms),
            ));
        }
        let weakest = self
            .terms
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.boost.total_cmp(&b.boost))
            .map(|(i, t)| (i, t.boost));
        if let Some((i, weakest_boost)) = weakest
            && boost > weakest_boost
        {
            self.terms[i] = BoostedTerm::new(text, boost);
        }
        Ok(())
    }

    pub fn to_query_string(&self, default_field: &str) -> String {
        let terms: Vec<String> = self
            .terms
            .iter()
            .map(|t| format!("{}{}", t.text, boost_suffix(t.boost)))
            .collect();
        format!(
            "{}\"{}\"{}",
            field_prefix(&self.field, default_field),
            terms.join("|"),
            boost_suffix(self.boost)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_add_terms() {
        let mut q = MultiTermQuery::new("body").with_min_score(0.2);
        q.add_term("fox").unwrap();
        q.add_term_boost("box", 0.5).unwrap();
        q.add_term_boost("fix", 0.1).unwrap();
        assert_eq!(q.len(), 2);
        assert_eq!(q.to_query_string("body"), "\"fox|box^0.5\"");
    }

    #[test]
    fn test_overflow() {
        let mut q = MultiTermQuery::new("body").with_max_terms(2);
        q.add_term("a").unwrap();
        q.add_term("b").unwrap();
        let err = q.add_term("c").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooManyClauses);

        let mut q = MultiTermQuery::new("body").with_max_terms(2).with_truncate_expansion(true);
        q.add_term_boost("a", 0.3).unwrap();
        q.add_term_boost("b", 0.9).unwrap();
        q.add_term_boost("c", 0.5).unwrap();
        q.add_term_boost("d", 0.1).unwrap();
        let texts: Vec<_> = q.terms().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["c", "b"]);
    }
}
