//! Fuzzy queries: terms within an edit-distance similarity of a target.

use crate::error::{GlaiveError, Result};
use crate::index::reader::IndexReader;
use crate::index::term::Term;
use crate::query::multi_term::MultiTermQuery;
use crate::query::{DEFAULT_MAX_TERMS, Query, Visit, boost_suffix, expand_terms, field_prefix};
use crate::util::levenshtein::fuzzy_similarity;

pub const DEFAULT_MIN_SIMILARITY: f32 = 0.5;

/// Matches terms whose similarity to `term` is at least `min_similarity`.
///
/// Similarity is `1 - distance / min_len`, where `distance` is the edit
/// distance and `min_len` the length of the shorter word. The first
/// `prefix_length` characters must match exactly. Each expanded term is
/// boosted by how far its similarity exceeds the minimum.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyQuery {
    pub term: Term,
    pub min_similarity: f32,
    pub prefix_length: usize,
    pub max_terms: usize,
    pub truncate_expansion: bool,
    pub boost: f32,
}

impl FuzzyQuery {
    pub fn new<F: Into<String>, T: Into<String>>(field: F, text: T) -> Self {
        FuzzyQuery {
            term: Term::new(field, text),
            min_similarity: DEFAULT_MIN_SIMILARITY,
            prefix_length: 0,
            max_terms: DEFAULT_MAX_TERMS,
            truncate_expansion: false,
            boost: 1.0,
        }
    }

    /// `min_similarity` must lie in `[0, 1)`.
    pub fn with_min_similarity(mut self, min_similarity: f32) -> Result<Self> {
        if !(0.0..1.0).contains(&min_similarity) {
            return Err(GlaiveError::query(format!(
                "fuzzy min similarity must be in [0, 1), got {min_similarity}"
            )));
        }
        self.min_similarity = min_similarity;
        Ok(self)
    }

    pub fn with_prefix_length(mut self, prefix_length: usize) -> Self {
        self.prefix_length = prefix_length;
        self
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
        let target: Vec<char> = self.term.text.chars().collect();
        let prefix_len = self.prefix_length.min(target.len());
        let prefix: String = target[..prefix_len].iter().collect();
        let target_suffix = &target[prefix_len..];
        let scale = 1.0 / (1.0 - self.min_similarity);

        let describe = || format!("fuzzy query {}", self.to_query_string(""));
        let terms = expand_terms(
            reader,
            &self.term.field,
            &prefix,
            self.max_terms,
            self.truncate_expansion,
            &describe,
            |text| {
                let Some(rest) = text.strip_prefix(prefix.as_str()) else {
                    return Visit::Stop;
                };
                let candidate: Vec<char> = rest.chars().collect();
                match fuzzy_similarity(target_suffix, &candidate, prefix_len, self.min_similarity) {
                    Some(similarity) => Visit::Take((similarity - self.min_similarity) * scale),
                    None => Visit::Skip,
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
        let similarity = if self.min_similarity == DEFAULT_MIN_SIMILARITY {
            String::new()
        } else {
            format!("{:?}", self.min_similarity)
        };
        format!(
            "{}{}~{similarity}{}",
            field_prefix(&self.term.field, default_field),
            self.term.text,
            boost_suffix(self.boost)
        )
    }
}
