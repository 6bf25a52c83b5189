//! Document-at-a-time scorers.
//!
//! A scorer walks the documents its query matches in increasing id order.
//! It starts unpositioned; [`Scorer::next`] or [`Scorer::skip_to`] moves it
//! onto its first match.

use std::fmt::Debug;
use std::sync::Arc;

use bit_vec::BitVec;

use crate::error::Result;
use crate::index::reader::{IndexReader, TermDocEnum};
use crate::search::similarity::{Similarity, decode_norm};

/// Iterates matching documents and scores the current one.
pub trait Scorer: Debug {
    /// Advance to the next matching document.
    fn next(&mut self) -> Result<bool>;

    /// Move to the first matching document `>= target`, staying put when
    /// the current document already qualifies.
    fn skip_to(&mut self, target: u32) -> Result<bool>;

    /// The current document. Only meaningful after a successful move.
    fn doc(&self) -> u32;

    fn score(&mut self) -> Result<f32>;
}

/// A sub-scorer with its position tracked by the combining scorer.
#[derive(Debug)]
pub(crate) struct Cursor {
    pub(crate) scorer: Box<dyn Scorer>,
    doc: Option<u32>,
    exhausted: bool,
}

impl Cursor {
    pub(crate) fn new(scorer: Box<dyn Scorer>) -> Self {
        Cursor {
            scorer,
            doc: None,
            exhausted: false,
        }
    }

    /// Position on the first match `>= target`. `None` once exhausted.
    pub(crate) fn advance_to(&mut self, target: u32) -> Result<Option<u32>> {
        if self.exhausted {
            return Ok(None);
        }
        if let Some(doc) = self.doc
            && doc >= target
        {
            return Ok(Some(doc));
        }
        if self.scorer.skip_to(target)? {
            self.doc = Some(self.scorer.doc());
        } else {
            self.exhausted = true;
            self.doc = None;
        }
        Ok(self.doc)
    }
}

/// Norm bytes of `field` when the field keeps norms.
pub(crate) fn field_norms(reader: &IndexReader, field: &str) -> Option<Arc<[u8]>> {
    if reader.field_infos().get(field).is_some_and(|info| info.has_norms()) {
        reader.norms(field)
    } else {
        None
    }
}

/// Decoded norm of `doc`, 1.0 for fields without norms.
pub(crate) fn norm_at(norms: Option<&Arc<[u8]>>, doc: u32) -> f32 {
    norms
        .and_then(|n| n.get(doc as usize))
        .map_or(1.0, |&byte| decode_norm(byte))
}

/// Scores the documents of one term.
#[derive(Debug)]
pub struct TermScorer {
    docs: TermDocEnum,
    value: f32,
    norms: Option<Arc<[u8]>>,
    similarity: Similarity,
    positioned: bool,
}

impl TermScorer {
    pub(crate) fn new(docs: TermDocEnum, value: f32, norms: Option<Arc<[u8]>>, similarity: Similarity) -> Self {
        TermScorer {
            docs,
            value,
            norms,
            similarity,
            positioned: false,
        }
    }

    pub fn freq(&self) -> u32 {
        self.docs.freq()
    }

    pub(crate) fn field_norm(&self) -> f32 {
        norm_at(self.norms.as_ref(), self.docs.doc())
    }
}

impl Scorer for TermScorer {
    fn next(&mut self) -> Result<bool> {
        self.positioned = self.docs.next()?;
        Ok(self.positioned)
    }

    fn skip_to(&mut self, target: u32) -> Result<bool> {
        self.positioned = self.docs.skip_to(target)?;
        Ok(self.positioned)
    }

    fn doc(&self) -> u32 {
        self.docs.doc()
    }

    fn score(&mut self) -> Result<f32> {
        let tf = self.similarity.tf(self.docs.freq() as f32);
        Ok(tf * self.value * self.field_norm())
    }
}

/// Every set bit of a document set, each with the same score.
#[derive(Debug)]
pub struct BitsScorer {
    bits: BitVec,
    value: f32,
    doc: Option<u32>,
}

impl BitsScorer {
    pub(crate) fn new(bits: BitVec, value: f32) -> Self {
        BitsScorer { bits, value, doc: None }
    }

    fn find(&mut self, from: u32) -> bool {
        let found = (from as usize..self.bits.len()).find(|&i| self.bits.get(i).unwrap_or(false));
        match found {
            Some(i) => {
                self.doc = Some(i as u32);
                true
            }
            None => {
                self.doc = Some(u32::MAX);
                false
            }
        }
    }
}

impl Scorer for BitsScorer {
    fn next(&mut self) -> Result<bool> {
        let from = match self.doc {
            None => 0,
            Some(u32::MAX) => return Ok(false),
            Some(doc) => doc + 1,
        };
        Ok(self.find(from))
    }

    fn skip_to(&mut self, target: u32) -> Result<bool> {
        match self.doc {
            Some(u32::MAX) => Ok(false),
            Some(doc) if doc >= target => Ok(true),
            _ => Ok(self.find(target)),
        }
    }

    fn doc(&self) -> u32 {
        self.doc.unwrap_or(u32::MAX)
    }

    fn score(&mut self) -> Result<f32> {
        Ok(self.value)
    }
}

/// Restricts another scorer to the documents of a bit set.
#[derive(Debug)]
pub struct FilteredScorer {
    inner: Box<dyn Scorer>,
    bits: BitVec,
}

impl FilteredScorer {
    pub(crate) fn new(inner: Box<dyn Scorer>, bits: BitVec) -> Self {
        FilteredScorer { inner, bits }
    }

    fn accepted(&self) -> bool {
        self.bits.get(self.inner.doc() as usize).unwrap_or(false)
    }

    fn settle(&mut self, mut found: bool) -> Result<bool> {
        while found && !self.accepted() {
            found = self.inner.next()?;
        }
        Ok(found)
    }
}

impl Scorer for FilteredScorer {
    fn next(&mut self) -> Result<bool> {
        let found = self.inner.next()?;
        self.settle(found)
    }

    fn skip_to(&mut self, target: u32) -> Result<bool> {
        let found = self.inner.skip_to(target)?;
        self.settle(found)
    }

    fn doc(&self) -> u32 {
        self.inner.doc()
    }

    fn score(&mut self) -> Result<f32> {
        self.inner.score()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_scorer() {
        let mut bits = BitVec::from_elem(10, false);
        for i in [1, 4, 7] {
            bits.set(i, true);
        }
        let mut scorer = BitsScorer::new(bits.clone(), 0.5);
        assert!(scorer.next().unwrap());
        assert_eq!(scorer.doc(), 1);
        assert!(scorer.skip_to(4).unwrap());
        assert!(scorer.skip_to(4).unwrap());
        assert_eq!(scorer.doc(), 4);
        assert_eq!(scorer.score().unwrap(), 0.5);
        assert!(scorer.next().unwrap());
        assert_eq!(scorer.doc(), 7);
        assert!(!scorer.next().unwrap());
        assert!(!scorer.skip_to(0).unwrap());

        let mut filter = BitVec::from_elem(10, false);
        filter.set(7, true);
        let mut filtered = FilteredScorer::new(Box::new(BitsScorer::new(bits, 1.0)), filter);
        assert!(filtered.next().unwrap());
        assert_eq!(filtered.doc(), 7);
        assert!(!filtered.next().unwrap());
    }

    #[test]
    fn test_cursor_stays_put() {
        let mut bits = BitVec::from_elem(5, false);
        bits.set(3, true);
        let mut cursor = Cursor::new(Box::new(BitsScorer::new(bits, 1.0)));
        assert_eq!(cursor.advance_to(0).unwrap(), Some(3));
        assert_eq!(cursor.advance_to(2).unwrap(), Some(3));
        assert_eq!(cursor.scorer.doc(), 3);
        assert_eq!(cursor.advance_to(4).unwrap(), None);
        assert_eq!(cursor.advance_to(0).unwrap(), None);
    }
}
