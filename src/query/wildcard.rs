//! Wildcard and prefix queries.

use regex::Regex;

use crate::error::{GlaiveError, Result};
use crate::index::reader::IndexReader;
use crate::index::term::Term;
use crate::query::multi_term::MultiTermQuery;
use crate::query::{DEFAULT_MAX_TERMS, Query, Visit, boost_suffix, expand_terms, field_prefix};

/// Matches terms against a pattern where `*` stands for any run of
/// characters and `?` for exactly one.
#[derive(Debug, Clone, PartialEq)]
pub struct WildcardQuery {
    pub term: Term,
    pub max_terms: usize,
    pub truncate_expansion: bool,
    pub boost: f32,
}

impl WildcardQuery {
    pub fn new<F: Into<String>, T: Into<String>>(field: F, pattern: T) -> Self {
        WildcardQuery {
            term: Term::new(field, pattern),
            max_terms: DEFAULT_MAX_TERMS,
            truncate_expansion: false,
            boost: 1.0,
        }
    }

    pub fn with_max_terms(mut self, max_terms: usize) -> Self {
        self.max_terms = max_terms;
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

    pub fn pattern(&self) -> &str {
        &self.term.text
    }

    /// The literal text before the first wildcard.
    fn literal_prefix(&self) -> &str {
        let end = self.term.text.find(['*', '?']).unwrap_or(self.term.text.len());
        &self.term.text[..end]
    }

    /// Compile the pattern into an anchored regex.
    fn compile_pattern(pattern: &str) -> Result<Regex> {
        let mut regex_pattern = String::with_capacity(pattern.len() + 8);
        regex_pattern.push('^');
        let mut literal = String::new();
        for c in pattern.chars() {
            match c {
                '*' | '?' => {
                    regex_pattern.push_str(&regex::escape(&literal));
                    literal.clear();
                    regex_pattern.push_str(if c == '*' { ".*" } else { "." });
                }
                c => literal.push(c),
            }
        }
        regex_pattern.push_str(&regex::escape(&literal));
        regex_pattern.push('$');
        Regex::new(&regex_pattern).map_err(|e| GlaiveError::query(format!("invalid wildcard pattern {pattern}: {e}")))
    }

    pub fn matches(&self, text: &str) -> Result<bool> {
        Ok(Self::compile_pattern(&self.term.text)?.is_match(text))
    }

    pub(crate) fn rewrite(&self, reader: &IndexReader) -> Result<Query> {
        let regex = Self::compile_pattern(&self.term.text)?;
        let prefix = self.literal_prefix();
        let describe = || format!("wildcard query {}", self.to_query_string(""));
        let terms = expand_terms(
            reader,
            &self.term.field,
            prefix,
            self.max_terms,
            self.truncate_expansion,
            &describe,
            |text| {
                if !text.starts_with(prefix) {
                    Visit::Stop
                } else if regex.is_match(text) {
                    Visit::Take(1.0)
                } else {
                    Visit::Skip
                }
            },
        )?;
        Ok(Query::MultiTerm(MultiTermQuery::from_terms(
            self.term.field.clone(),
            terms,
            self.max_terms,
            self.truncate_expansion,
            self.boost,
        )))
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

/// Matches terms starting with a prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefixQuery {
    pub term: Term,
    pub max_terms: usize,
    pub truncate_expansion: bool,
    pub boost: f32,
}

impl PrefixQuery {
    pub fn new<F: Into<String>, T: Into<String>>(field: F, prefix: T) -> Self {
        PrefixQuery {
            term: Term::new(field, prefix),
            max_terms: DEFAULT_MAX_TERMS,
            truncate_expansion: false,
            boost: 1.0,
        }
    }

    pub fn with_max_terms(mut self, max_terms: usize) -> Self {
        self.max_terms = max_terms;
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

    pub(crate) fn rewrite(&self, reader: &IndexReader) -> Result<Query> {
        let prefix = self.term.text.as_str();
        let describe = || format!("prefix query {}", self.to_query_string(""));
        let terms = expand_terms(
            reader,
            &self.term.field,
            prefix,
            self.max_terms,
            self.truncate_expansion,
            &describe,
            |text| if text.starts_with(prefix) { Visit::Take(1.0) } else { Visit::Stop },
        )?;
        Ok(Query::MultiTerm(MultiTermQuery::from_terms(
            self.term.field.clone(),
            terms,
            self.max_terms,
            self.truncate_expansion,
            self.boost,
        )))
    }

    pub fn to_query_string(&self, default_field: &str) -> String {
        format!(
            "{}{}*{}",
            field_prefix(&self.term.field, default_field),
            self.term.text,
            boost_suffix(self.boost)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_matching() {
        let q = WildcardQuery::new("body", "f?x*");
        assert_eq!(q.literal_prefix(), "f");
        assert!(q.matches("fox").unwrap());
        assert!(q.matches("fixes").unwrap());
        assert!(!q.matches("fx").unwrap());
        assert!(!q.matches("afox").unwrap());
    }

    #[test]
    fn test_special_regex_characters() {
        let q = WildcardQuery::new("body", "a.b(c)*");
        assert!(q.matches("a.b(c)d").unwrap());
        assert!(!q.matches("axb(c)d").unwrap());
    }

    #[test]
    fn test_prefix_rendering() {
        assert_eq!(PrefixQuery::new("title", "qu").to_query_string("body"), "title:qu*");
    }
}
