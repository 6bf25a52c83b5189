//! Span queries: position-interval matching.
//!
//! A span is a `[start, end)` range of token positions in one document.
//! Span nodes compose: terms produce one-position spans, and the other
//! nodes filter or combine the spans of their children. All nodes of one
//! span query work on the same field.

use std::collections::BTreeSet;

use crate::error::{GlaiveError, Result};
use crate::index::reader::IndexReader;
use crate::index::term::Term;
use crate::query::{DEFAULT_MAX_TERMS, Visit, boost_suffix, expand_terms, field_prefix};

/// One node of a span query tree.
#[derive(Debug, Clone, PartialEq)]
pub enum SpanNode {
    Term(Term),
    /// Spans of `inner` ending at or before position `end`.
    First { inner: Box<SpanNode>, end: u32 },
    /// Spans where every clause matches within `slop` unmatched positions,
    /// in clause order when `in_order` is set.
    Near {
        clauses: Vec<SpanNode>,
        slop: u32,
        in_order: bool,
    },
    Or(Vec<SpanNode>),
    /// Spans of `include` that overlap no span of `exclude`.
    Not {
        include: Box<SpanNode>,
        exclude: Box<SpanNode>,
    },
    /// Expanded to a `MultiTerm` node by rewriting.
    Prefix {
        term: Term,
        max_terms: usize,
        truncate_expansion: bool,
    },
    MultiTerm { field: String, terms: Vec<String> },
}

fn same_field(nodes: &[&SpanNode]) -> Result<String> {
    let mut field: Option<&str> = None;
    for node in nodes {
        let f = node.field();
        match field {
            Some(existing) if existing != f => {
                return Err(GlaiveError::query(format!(
                    "span clauses must share one field, got {existing} and {f}"
                )));
            }
            _ => field = Some(f),
        }
    }
    field
        .map(str::to_string)
        .ok_or_else(|| GlaiveError::query("span query needs at least one clause"))
}

impl SpanNode {
    pub fn term<F: Into<String>, T: Into<String>>(field: F, text: T) -> Self {
        SpanNode::Term(Term::new(field, text))
    }

    pub fn first(inner: SpanNode, end: u32) -> Self {
        SpanNode::First {
            inner: Box::new(inner),
            end,
        }
    }

    pub fn near(clauses: Vec<SpanNode>, slop: u32, in_order: bool) -> Result<Self> {
        same_field(&clauses.iter().collect::<Vec<_>>())?;
        Ok(SpanNode::Near { clauses, slop, in_order })
    }

    pub fn or(clauses: Vec<SpanNode>) -> Result<Self> {
        same_field(&clauses.iter().collect::<Vec<_>>())?;
        Ok(SpanNode::Or(clauses))
    }

    pub fn not(include: SpanNode, exclude: SpanNode) -> Result<Self> {
        same_field(&[&include, &exclude])?;
        Ok(SpanNode::Not {
            include: Box::new(include),
            exclude: Box::new(exclude),
        })
    }

    pub fn prefix<F: Into<String>, T: Into<String>>(field: F, prefix: T) -> Self {
        SpanNode::Prefix {
            term: Term::new(field, prefix),
            max_terms: DEFAULT_MAX_TERMS,
            truncate_expansion: false,
        }
    }

    /// At most `DEFAULT_MAX_TERMS` terms.
    pub fn multi_term<F: Into<String>>(field: F, terms: Vec<String>) -> Result<Self> {
        if terms.len() > DEFAULT_MAX_TERMS {
            return Err(GlaiveError::too_many_clauses(
                DEFAULT_MAX_TERMS,
                format!("span multi-term query holds {} terms", terms.len()),
            ));
        }
        Ok(SpanNode::MultiTerm {
            field: field.into(),
            terms,
        })
    }

    /// The field every span of this node lies in.
    pub fn field(&self) -> &str {
        match self {
            SpanNode::Term(term) | SpanNode::Prefix { term, .. } => &term.field,
            SpanNode::First { inner, .. } => inner.field(),
            SpanNode::Near { clauses, .. } | SpanNode::Or(clauses) => {
                clauses.first().map_or("", SpanNode::field)
            }
            SpanNode::Not { include, .. } => include.field(),
            SpanNode::MultiTerm { field, .. } => field,
        }
    }

    pub(crate) fn rewrite(&self, reader: &IndexReader) -> Result<SpanNode> {
        Ok(match self {
            SpanNode::Prefix {
                term,
                max_terms,
                truncate_expansion,
            } => {
                let prefix = term.text.as_str();
                let describe = || format!("span prefix query {term}*");
                let terms = expand_terms(
                    reader,
                    &term.field,
                    prefix,
                    *max_terms,
                    *truncate_expansion,
                    &describe,
                    |text| if text.starts_with(prefix) { Visit::Take(1.0) } else { Visit::Stop },
                )?;
                SpanNode::MultiTerm {
                    field: term.field.clone(),
                    terms: terms.into_iter().map(|t| t.text).collect(),
                }
            }
            SpanNode::First { inner, end } => SpanNode::First {
                inner: Box::new(inner.rewrite(reader)?),
                end: *end,
            },
            SpanNode::Near { clauses, slop, in_order } => SpanNode::Near {
                clauses: clauses.iter().map(|c| c.rewrite(reader)).collect::<Result<_>>()?,
                slop: *slop,
                in_order: *in_order,
            },
            SpanNode::Or(clauses) => SpanNode::Or(clauses.iter().map(|c| c.rewrite(reader)).collect::<Result<_>>()?),
            SpanNode::Not { include, exclude } => SpanNode::Not {
                include: Box::new(include.rewrite(reader)?),
                exclude: Box::new(exclude.rewrite(reader)?),
            },
            SpanNode::Term(_) | SpanNode::MultiTerm { .. } => self.clone(),
        })
    }

    /// Terms that can produce spans. Excluded spans of `Not` are skipped.
    pub fn extract_terms(&self, terms: &mut BTreeSet<Term>) {
        match self {
            SpanNode::Term(term) => {
                terms.insert(term.clone());
            }
            SpanNode::First { inner, .. } => inner.extract_terms(terms),
            SpanNode::Near { clauses, .. } | SpanNode::Or(clauses) => {
                for clause in clauses {
                    clause.extract_terms(terms);
                }
            }
            SpanNode::Not { include, .. } => include.extract_terms(terms),
            SpanNode::MultiTerm { field, terms: texts } => {
                for text in texts {
                    terms.insert(Term::new(field.clone(), text.clone()));
                }
            }
            SpanNode::Prefix { .. } => {}
        }
    }

    pub fn to_query_string(&self, default_field: &str) -> String {
        let join = |clauses: &[SpanNode]| {
            clauses
                .iter()
                .map(|c| c.to_query_string(default_field))
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            SpanNode::Term(term) => format!("{}{}", field_prefix(&term.field, default_field), term.text),
            SpanNode::First { inner, end } => {
                format!("span_first({}, {end})", inner.to_query_string(default_field))
            }
            SpanNode::Near { clauses, slop, in_order } => {
                format!("span_near([{}], {slop}, {in_order})", join(clauses))
            }
            SpanNode::Or(clauses) => format!("span_or([{}])", join(clauses)),
            SpanNode::Not { include, exclude } => format!(
                "span_not({}, {})",
                include.to_query_string(default_field),
                exclude.to_query_string(default_field)
            ),
            SpanNode::Prefix { term, .. } => {
                format!("span_prefix({}{}*)", field_prefix(&term.field, default_field), term.text)
            }
            SpanNode::MultiTerm { field, terms } => {
                format!("span_terms({}[{}])", field_prefix(field, default_field), terms.join(", "))
            }
        }
    }
}

/// A scored span query.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanQuery {
    pub node: SpanNode,
    pub boost: f32,
}

impl SpanQuery {
    pub fn new(node: SpanNode) -> Self {
        SpanQuery { node, boost: 1.0 }
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn field(&self) -> &str {
        self.node.field()
    }

    pub(crate) fn rewrite(&self, reader: &IndexReader) -> Result<SpanQuery> {
        Ok(SpanQuery {
            node: self.node.rewrite(reader)?,
            boost: self.boost,
        })
    }

    pub fn to_query_string(&self, default_field: &str) -> String {
        format!("{}{}", self.node.to_query_string(default_field), boost_suffix(self.boost))
    }
}

impl From<SpanNode> for SpanQuery {
    fn from(node: SpanNode) -> Self {
        SpanQuery::new(node)
    }
}
