//! Phrase matching over positional postings.

use std::sync::Arc;

use crate::error::Result;
use crate::index::reader::TermDocEnum;
use crate::search::scorer::{Scorer, norm_at};
use crate::search::similarity::Similarity;

/// The union of several terms' postings, as used for a phrase position
/// with alternatives.
#[derive(Debug)]
pub(crate) struct UnionPostings {
    enums: Vec<TermDocEnum>,
    docs: Vec<Option<u32>>,
    started: bool,
}

impl UnionPostings {
    pub(crate) fn new(enums: Vec<TermDocEnum>) -> Self {
        let docs = vec![None; enums.len()];
        UnionPostings {
            enums,
            docs,
            started: false,
        }
    }

    fn start(&mut self) -> Result<()> {
        if !self.started {
            for (docs, slot) in self.enums.iter_mut().zip(self.docs.iter_mut()) {
                *slot = if docs.next()? { Some(docs.doc()) } else { None };
            }
            self.started = true;
        }
        Ok(())
    }

    fn doc(&self) -> Option<u32> {
        self.docs.iter().flatten().copied().min()
    }

    /// Position every member on its first document `>= target` and return
    /// the smallest.
    pub(crate) fn skip_to(&mut self, target: u32) -> Result<Option<u32>> {
        self.start()?;
        for (docs, slot) in self.enums.iter_mut().zip(self.docs.iter_mut()) {
            if let Some(doc) = *slot
                && doc < target
            {
                *slot = if docs.skip_to(target)? { Some(docs.doc()) } else { None };
            }
        }
        Ok(self.doc())
    }

    /// Sorted positions of the current document over all members. Reads
    /// the postings, so call once per document.
    pub(crate) fn positions(&mut self) -> Result<Vec<u32>> {
        let Some(current) = self.doc() else {
            return Ok(Vec::new());
        };
        let mut positions = Vec::new();
        for (docs, slot) in self.enums.iter_mut().zip(&self.docs) {
            if *slot == Some(current) {
                positions.extend(docs.positions()?);
            }
        }
        positions.sort_unstable();
        positions.dedup();
        Ok(positions)
    }
}

/// Weighted count of phrase matches.
///
/// `lists[i]` holds the positions of phrase slot `i` shifted back by the
/// slot's offset in the phrase, so an exact match lines up on one value.
/// Windows spanning at most `slop` contribute `sloppy_freq(distance)`;
/// exact matches count 1.
pub(crate) fn phrase_freq(lists: &[Vec<i64>], slop: u32, similarity: &Similarity) -> f32 {
    if lists.is_empty() || lists.iter().any(Vec::is_empty) {
        return 0.0;
    }
    let mut index = vec![0usize; lists.len()];
    let mut freq = 0.0;
    loop {
        let mut lowest = 0;
        let mut start = i64::MAX;
        let mut end = i64::MIN;
        for (i, list) in lists.iter().enumerate() {
            let value = list[index[i]];
            if value < start {
                start = value;
                lowest = i;
            }
            end = end.max(value);
        }
        let distance = end - start;
        if distance <= slop as i64 {
            freq += similarity.sloppy_freq(distance as u32);
        }
        index[lowest] += 1;
        if index[lowest] >= lists[lowest].len() {
            return freq;
        }
    }
}

/// Scores documents containing a phrase, exactly or within a slop.
#[derive(Debug)]
pub struct PhraseScorer {
    slots: Vec<(u32, UnionPostings)>,
    slop: u32,
    value: f32,
    norms: Option<Arc<[u8]>>,
    similarity: Similarity,
    doc: Option<u32>,
    freq: f32,
    exhausted: bool,
}

impl PhraseScorer {
    /// `slots` pairs each phrase position with the postings of the terms
    /// accepted there.
    pub(crate) fn new(
        slots: Vec<(u32, UnionPostings)>,
        slop: u32,
        value: f32,
        norms: Option<Arc<[u8]>>,
        similarity: Similarity,
    ) -> Self {
        PhraseScorer {
            slots,
            slop,
            value,
            norms,
            similarity,
            doc: None,
            freq: 0.0,
            exhausted: false,
        }
    }

    /// Phrase frequency of the current document.
    pub fn freq(&self) -> f32 {
        self.freq
    }

    pub(crate) fn field_norm(&self) -> f32 {
        norm_at(self.norms.as_ref(), self.doc())
    }

    fn find(&mut self, mut candidate: u32) -> Result<bool> {
        loop {
            loop {
                let mut agreed = true;
                for (_, postings) in &mut self.slots {
                    match postings.skip_to(candidate)? {
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

            let mut lists = Vec::with_capacity(self.slots.len());
            for (offset, postings) in &mut self.slots {
                let shift = *offset as i64;
                lists.push(postings.positions()?.into_iter().map(|p| p as i64 - shift).collect());
            }
            let freq = phrase_freq(&lists, self.slop, &self.similarity);
            if freq > 0.0 {
                self.doc = Some(candidate);
                self.freq = freq;
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

impl Scorer for PhraseScorer {
    fn next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        let target = match self.doc {
            None => 0,
            Some(doc) => match doc.checked_add(1) {
                Some(next) => next,
                None => return Ok(false),
            },
        };
        self.find(target)
    }

    fn skip_to(&mut self, target: u32) -> Result<bool> {
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

    fn score(&mut self) -> Result<f32> {
        let tf = self.similarity.tf(self.freq);
        Ok(tf * self.value * self.field_norm())
    }
}
