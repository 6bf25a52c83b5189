//! Boolean query implementation for combining multiple queries.

use crate::error::{GlaiveError, Result};
use crate::index::reader::IndexReader;
use crate::query::{Query, boost_suffix};

/// Default cap on the clauses of one boolean query.
pub const DEFAULT_MAX_CLAUSE_COUNT: usize = 1024;

/// Occurrence requirements for boolean clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occur {
    /// The clause must match (equivalent to AND).
    Must,
    /// The clause should match (equivalent to OR).
    Should,
    /// The clause must not match (equivalent to NOT).
    MustNot,
}

/// A clause in a boolean query.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanClause {
    pub query: Query,
    pub occur: Occur,
}

impl BooleanClause {
    pub fn new(query: Query, occur: Occur) -> Self {
        BooleanClause { query, occur }
    }

    pub fn must(query: Query) -> Self {
        BooleanClause::new(query, Occur::Must)
    }

    pub fn should(query: Query) -> Self {
        BooleanClause::new(query, Occur::Should)
    }

    pub fn must_not(query: Query) -> Self {
        BooleanClause::new(query, Occur::MustNot)
    }

    pub fn is_required(&self) -> bool {
        self.occur == Occur::Must
    }

    pub fn is_prohibited(&self) -> bool {
        self.occur == Occur::MustNot
    }

    pub fn set_occur(&mut self, occur: Occur) {
        self.occur = occur;
    }
}

/// A boolean combination of clauses.
///
/// A document matches when it matches every `Must` clause and no `MustNot`
/// clause, and, if there are no `Must` clauses, at least one `Should`
/// clause. A query of only `MustNot` clauses matches nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanQuery {
    pub clauses: Vec<BooleanClause>,
    /// Skip the coordination factor when scoring.
    pub coord_disabled: bool,
    pub max_clause_count: usize,
    pub boost: f32,
}

impl Default for BooleanQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl BooleanQuery {
    pub fn new() -> Self {
        BooleanQuery {
            clauses: Vec::new(),
            coord_disabled: false,
            max_clause_count: DEFAULT_MAX_CLAUSE_COUNT,
            boost: 1.0,
        }
    }

    pub fn with_coord_disabled(mut self, disabled: bool) -> Self {
        self.coord_disabled = disabled;
        self
    }

    pub fn with_max_clause_count(mut self, max: usize) -> Self {
        self.max_clause_count = max;
        self
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn must(self, query: Query) -> Self {
        self.with_clause(BooleanClause::must(query))
    }

    pub fn should(self, query: Query) -> Self {
        self.with_clause(BooleanClause::should(query))
    }

    pub fn must_not(self, query: Query) -> Self {
        self.with_clause(BooleanClause::must_not(query))
    }

    pub fn with_clause(mut self, clause: BooleanClause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Add a clause, failing once `max_clause_count` is reached.
    pub fn add_clause(&mut self, clause: BooleanClause) -> Result<()> {
        self.check_clause_count(self.clauses.len() + 1)?;
        self.clauses.push(clause);
        Ok(())
    }

    pub fn add_query(&mut self, query: Query, occur: Occur) -> Result<()> {
        self.add_clause(BooleanClause::new(query, occur))
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    fn check_clause_count(&self, count: usize) -> Result<()> {
        if count > self.max_clause_count {
            return Err(GlaiveError::too_many_clauses(
                self.max_clause_count,
                format!("boolean query has {count} clauses"),
            ));
        }
        Ok(())
    }

    /// Rewrite every clause. A single non-prohibited clause collapses into
    /// its own query with the boosts multiplied.
    pub(crate) fn rewrite(&self, reader: &IndexReader) -> Result<Query> {
        self.check_clause_count(self.clauses.len())?;
        if let [clause] = self.clauses.as_slice()
            && !clause.is_prohibited()
        {
            let mut query = clause.query.rewrite(reader)?;
            let boost = query.boost() * self.boost;
            query.set_boost(boost);
            return Ok(query);
        }
        let mut rewritten = self.clone_empty();
        for clause in &self.clauses {
            rewritten
                .clauses
                .push(BooleanClause::new(clause.query.rewrite(reader)?, clause.occur));
        }
        Ok(Query::Boolean(rewritten))
    }

    fn clone_empty(&self) -> BooleanQuery {
        BooleanQuery {
            clauses: Vec::new(),
            coord_disabled: self.coord_disabled,
            max_clause_count: self.max_clause_count,
            boost: self.boost,
        }
    }

    pub fn to_query_string(&self, default_field: &str) -> String {
        let clauses: Vec<String> = self
            .clauses
            .iter()
            .map(|clause| {
                let prefix = match clause.occur {
                    Occur::Must => "+",
                    Occur::MustNot => "-",
                    Occur::Should => "",
                };
                let inner = clause.query.to_query_string(default_field);
                match clause.query {
                    Query::Boolean(_) => format!("{prefix}({inner})"),
                    _ => format!("{prefix}{inner}"),
                }
            })
            .collect();
        let body = clauses.join(" ");
        if self.boost == 1.0 {
            body
        } else {
            format!("({body}){}", boost_suffix(self.boost))
        }
    }
}
