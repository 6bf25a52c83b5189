//! Span enumeration and span scoring.
//!
//! Spans are enumerated a document at a time: once positioned, a [`Spans`]
//! exposes every `[start, end)` match of the current document, sorted.

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::{GlaiveError, Result};
use crate::index::reader::{IndexReader, TermDocEnum};
use crate::index::term::Term;
use crate::query::span::SpanNode;
use crate::search::scorer::{Scorer, norm_at};
use crate::search::similarity::Similarity;

pub type Span = (u32, u32);

/// Document-at-a-time span enumeration.
pub trait Spans: Debug {
    /// Advance to the next document with at least one span.
    fn next_doc(&mut self) -> Result<bool>;

    /// Move to the first document `>= target` with spans, staying put when
    /// the current document qualifies.
    fn skip_to_doc(&mut self, target: u32) -> Result<bool>;

    fn doc(&self) -> u32;

    /// Spans of the current document, sorted by start then end.
    fn spans(&self) -> &[Span];
}

/// Build the span enumeration of a rewritten node.
pub(crate) fn build_spans(node: &SpanNode, reader: &IndexReader) -> Result<Box<dyn Spans>> {
    Ok(match node {
        SpanNode::Term(term) => Box::new(TermSpans::new(reader.term_positions(term)?)),
        SpanNode::MultiTerm { field, terms } => {
            let mut children: Vec<Box<dyn Spans>> = Vec::with_capacity(terms.len());
            for text in terms {
                children.push(Box::new(TermSpans::new(reader.term_positions(&Term::new(field.clone(), text.clone()))?)));
            }
            Box::new(OrSpans::new(children))
        }
        SpanNode::First { inner, end } => Box::new(FirstSpans {
            inner: build_spans(inner, reader)?,
            end: *end,
            spans: Vec::new(),
            positioned: false,
        }),
        SpanNode::Near { clauses, slop, in_order } => {
            let children = clauses
                .iter()
                .map(|c| build_spans(c, reader).map(SpanCursor::new))
                .collect::<Result<Vec<_>>>()?;
            Box::new(NearSpans {
                children,
                slop: *slop,
                in_order: *in_order,
                doc: None,
                spans: Vec::new(),
                exhausted: false,
            })
        }
        SpanNode::Or(clauses) => Box::new(OrSpans::new(
            clauses.iter().map(|c| build_spans(c, reader)).collect::<Result<Vec<_>>>()?,
        )),
        SpanNode::Not { include, exclude } => Box::new(NotSpans {
            include: build_spans(include, reader)?,
            exclude: SpanCursor::new(build_spans(exclude, reader)?),
            spans: Vec::new(),
            positioned: false,
        }),
        SpanNode::Prefix { term, .. } => {
            return Err(GlaiveError::query(format!(
                "span prefix {term}* must be rewritten before scoring"
            )));
        }
    })
}

/// A child enumeration whose document is tracked by its parent.
#[derive(Debug)]
struct SpanCursor {
    spans: Box<dyn Spans>,
    doc: Option<u32>,
    exhausted: bool,
}

impl SpanCursor {
    fn new(spans: Box<dyn Spans>) -> Self {
        SpanCursor {
            spans,
            doc: None,
            exhausted: false,
        }
    }

    fn advance_to(&mut self, target: u32) -> Result<Option<u32>> {
        if self.exhausted {
            return Ok(None);
        }
        if let Some(doc) = self.doc
            && doc >= target
        {
            return Ok(Some(doc));
        }
        if self.spans.skip_to_doc(target)? {
            self.doc = Some(self.spans.doc());
        } else {
            self.exhausted = true;
            self.doc = None;
        }
        Ok(self.doc)
    }
}

/// One-position spans of a term.
#[derive(Debug)]
struct TermSpans {
    docs: TermDocEnum,
    spans: Vec<Span>,
    positioned: bool,
}

impl TermSpans {
    fn new(docs: TermDocEnum) -> Self {
        TermSpans {
            docs,
            spans: Vec::new(),
            positioned: false,
        }
    }

    fn load(&mut self, found: bool) -> Result<bool> {
        self.positioned = found;
        self.spans.clear();
        if found {
            self.spans.extend(self.docs.positions()?.into_iter().map(|p| (p, p + 1)));
        }
        Ok(found)
    }
}

impl Spans for TermSpans {
    fn next_doc(&mut self) -> Result<bool> {
        let found = self.docs.next()?;
        self.load(found)
    }

    fn skip_to_doc(&mut self, target: u32) -> Result<bool> {
        if self.positioned && self.docs.doc() >= target {
            return Ok(true);
        }
        let found = self.docs.skip_to(target)?;
        self.load(found)
    }

    fn doc(&self) -> u32 {
        self.docs.doc()
    }

    fn spans(&self) -> &[Span] {
        &self.spans
    }
}

/// Spans of any child.
#[derive(Debug)]
struct OrSpans {
    children: Vec<SpanCursor>,
    doc: Option<u32>,
    spans: Vec<Span>,
    exhausted: bool,
}

impl OrSpans {
    fn new(children: Vec<Box<dyn Spans>>) -> Self {
        OrSpans {
            children: children.into_iter().map(SpanCursor::new).collect(),
            doc: None,
            spans: Vec::new(),
            exhausted: false,
        }
    }

    fn find(&mut self, target: u32) -> Result<bool> {
        let mut smallest: Option<u32> = None;
        for child in &mut self.children {
            if let Some(doc) = child.advance_to(target)? {
                smallest = Some(smallest.map_or(doc, |s| s.min(doc)));
            }
        }
        let Some(doc) = smallest else {
            self.exhausted = true;
            self.spans.clear();
            return Ok(false);
        };
        self.doc = Some(doc);
        self.spans.clear();
        for child in self.children.iter().filter(|c| c.doc == Some(doc)) {
            self.spans.extend_from_slice(child.spans.spans());
        }
        self.spans.sort_unstable();
        self.spans.dedup();
        Ok(true)
    }
}

impl Spans for OrSpans {
    fn next_doc(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        let target = match self.doc {
            None => 0,
            Some(doc) => doc.saturating_add(1),
        };
        self.find(target)
    }

    fn skip_to_doc(&mut self, target: u32) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if let Some(doc) = self.doc
            && doc >= target
        {
            return Ok(true);
        }
        self.find(target)
    }

    fn doc(&self) -> u32 {
        self.doc.unwrap_or(u32::MAX)
    }

    fn spans(&self) -> &[Span] {
        &self.spans
    }
}

/// Spans of the inner node ending at or before `end`.
#[derive(Debug)]
struct FirstSpans {
    inner: Box<dyn Spans>,
    end: u32,
    spans: Vec<Span>,
    positioned: bool,
}

impl FirstSpans {
    fn settle(&mut self, mut found: bool) -> Result<bool> {
        while found {
            self.spans.clear();
            let end = self.end;
            self.spans.extend(self.inner.spans().iter().filter(|s| s.1 <= end));
            if !self.spans.is_empty() {
                break;
            }
            found = self.inner.next_doc()?;
        }
        self.positioned = found;
        Ok(found)
    }
}

impl Spans for FirstSpans {
    fn next_doc(&mut self) -> Result<bool> {
        let found = self.inner.next_doc()?;
        self.settle(found)
    }

    fn skip_to_doc(&mut self, target: u32) -> Result<bool> {
        if self.positioned && self.inner.doc() >= target {
            return Ok(true);
        }
        let found = self.inner.skip_to_doc(target)?;
        self.settle(found)
    }

    fn doc(&self) -> u32 {
        self.inner.doc()
    }

    fn spans(&self) -> &[Span] {
        &self.spans
    }
}

/// Spans of `include` overlapping no span of `exclude`.
#[derive(Debug)]
struct NotSpans {
    include: Box<dyn Spans>,
    exclude: SpanCursor,
    spans: Vec<Span>,
    positioned: bool,
}

impl NotSpans {
    fn settle(&mut self, mut found: bool) -> Result<bool> {
        while found {
            let doc = self.include.doc();
            let excluded: &[Span] = if self.exclude.advance_to(doc)? == Some(doc) {
                self.exclude.spans.spans()
            } else {
                &[]
            };
            self.spans.clear();
            self.spans.extend(
                self.include
                    .spans()
                    .iter()
                    .filter(|s| !excluded.iter().any(|e| s.0 < e.1 && e.0 < s.1)),
            );
            if !self.spans.is_empty() {
                break;
            }
            found = self.include.next_doc()?;
        }
        self.positioned = found;
        Ok(found)
    }
}

impl Spans for NotSpans {
    fn next_doc(&mut self) -> Result<bool> {
        let found = self.include.next_doc()?;
        self.settle(found)
    }

    fn skip_to_doc(&mut self, target: u32) -> Result<bool> {
        if self.positioned && self.include.doc() >= target {
            return Ok(true);
        }
        let found = self.include.skip_to_doc(target)?;
        self.settle(found)
    }

    fn doc(&self) -> u32 {
        self.include.doc()
    }

    fn spans(&self) -> &[Span] {
        &self.spans
    }
}

/// Matches where every clause has a span and the gaps between them add up
/// to at most `slop` positions.
#[derive(Debug)]
struct NearSpans {
    children: Vec<SpanCursor>,
    slop: u32,
    in_order: bool,
    doc: Option<u32>,
    spans: Vec<Span>,
    exhausted: bool,
}

fn span_len(span: &Span) -> u32 {
    span.1.saturating_sub(span.0)
}

/// Ordered matches: each clause's span starts at or after the previous
/// one ends.
fn ordered_matches(lists: &[&[Span]], slop: u32) -> Vec<Span> {
    let mut out = Vec::new();
    let Some((first, rest)) = lists.split_first() else {
        return out;
    };
    'starts: for head in first.iter() {
        let mut end = head.1;
        let mut covered = span_len(head);
        for list in rest {
            let Some(next) = list.iter().find(|s| s.0 >= end) else {
                break 'starts;
            };
            end = next.1;
            covered += span_len(next);
        }
        let gaps = (end - head.0).saturating_sub(covered);
        if gaps <= slop {
            out.push((head.0, end));
        }
    }
    out
}

/// Unordered matches: for each window start, every clause contributes its
/// earliest-ending span starting in the window.
fn unordered_matches(lists: &[&[Span]], slop: u32) -> Vec<Span> {
    let mut starts: Vec<u32> = lists.iter().flat_map(|l| l.iter().map(|s| s.0)).collect();
    starts.sort_unstable();
    starts.dedup();
    let mut out = Vec::new();
    for from in starts {
        let mut start = u32::MAX;
        let mut end = 0;
        let mut covered = 0;
        let mut complete = true;
        for list in lists {
            match list.iter().filter(|s| s.0 >= from).min_by_key(|s| s.1) {
                Some(span) => {
                    start = start.min(span.0);
                    end = end.max(span.1);
                    covered += span_len(span);
                }
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if complete && (end - start).saturating_sub(covered) <= slop {
            out.push((start, end));
        }
    }
    out.sort_unstable();
    out.dedup();
    out
}

impl NearSpans {
    fn find(&mut self, mut candidate: u32) -> Result<bool> {
        if self.children.is_empty() {
            self.exhausted = true;
            return Ok(false);
        }
        loop {
            loop {
                let mut agreed = true;
                for child in &mut self.children {
                    match child.advance_to(candidate)? {
                        None => {
                            self.exhausted = true;
                            return Ok(false);
                        }
                        Some(doc) if doc > candidate => {
                            candidate = doc;
                            agreed = false;
                        }
                        Some(_) => {}
                    }
                }
                if agreed {
                    break;
                }
            }
            let lists: Vec<&[Span]> = self.children.iter().map(|c| c.spans.spans()).collect();
            let matches = if self.in_order {
                ordered_matches(&lists, self.slop)
            } else {
                unordered_matches(&lists, self.slop)
            };
            if !matches.is_empty() {
                self.doc = Some(candidate);
                self.spans = matches;
                return Ok(true);
            }
            let Some(next) = candidate.checked_add(1) else {
                self.exhausted = true;
                return Ok(false);
            };
            candidate = next;
        }
    }
}

impl Spans for NearSpans {
    fn next_doc(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        let target = match self.doc {
            None => 0,
            Some(doc) => doc.saturating_add(1),
        };
        self.find(target)
    }

    fn skip_to_doc(&mut self, target: u32) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if let Some(doc) = self.doc
            && doc >= target
        {
            return Ok(true);
        }
        self.find(target)
    }

    fn doc(&self) -> u32 {
        self.doc.unwrap_or(u32::MAX)
    }

    fn spans(&self) -> &[Span] {
        &self.spans
    }
}

/// Scores documents by the sloppy frequency of their spans.
#[derive(Debug)]
pub struct SpanScorer {
    spans: Box<dyn Spans>,
    value: f32,
    norms: Option<Arc<[u8]>>,
    similarity: Similarity,
    freq: f32,
    positioned: bool,
}

impl SpanScorer {
    pub(crate) fn new(spans: Box<dyn Spans>, value: f32, norms: Option<Arc<[u8]>>, similarity: Similarity) -> Self {
        SpanScorer {
            spans,
            value,
            norms,
            similarity,
            freq: 0.0,
            positioned: false,
        }
    }

    pub fn freq(&self) -> f32 {
        self.freq
    }

    pub(crate) fn field_norm(&self) -> f32 {
        norm_at(self.norms.as_ref(), self.spans.doc())
    }

    fn load(&mut self, found: bool) -> bool {
        self.positioned = found;
        self.freq = if found {
            self.spans
                .spans()
                .iter()
                .map(|s| self.similarity.sloppy_freq(span_len(s)))
                .sum()
        } else {
            0.0
        };
        found
    }
}

impl Scorer for SpanScorer {
    fn next(&mut self) -> Result<bool> {
        let found = self.spans.next_doc()?;
        Ok(self.load(found))
    }

    fn skip_to(&mut self, target: u32) -> Result<bool> {
        if self.positioned && self.spans.doc() >= target {
            return Ok(true);
        }
        let found = self.spans.skip_to_doc(target)?;
        Ok(self.load(found))
    }

    fn doc(&self) -> u32 {
        self.spans.doc()
    }

    fn score(&mut self) -> Result<f32> {
        let tf = self.similarity.tf(self.freq);
        Ok(tf * self.value * self.field_norm())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_matches() {
        let a: &[Span] = &[(0, 1), (5, 6)];
        let b: &[Span] = &[(2, 3)];
        assert_eq!(ordered_matches(&[a, b], 1), vec![(0, 3)]);
        assert_eq!(ordered_matches(&[a, b], 0), Vec::<Span>::new());
        assert_eq!(ordered_matches(&[b, a], 2), vec![(2, 6)]);
    }

    #[test]
    fn test_unordered_matches() {
        let a: &[Span] = &[(4, 5)];
        let b: &[Span] = &[(2, 3)];
        assert_eq!(unordered_matches(&[a, b], 1), vec![(2, 5)]);
        assert_eq!(unordered_matches(&[a, b], 0), Vec::<Span>::new());
        assert_eq!(ordered_matches(&[a, b], 5), Vec::<Span>::new());
    }
}
