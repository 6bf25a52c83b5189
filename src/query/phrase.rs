//! Phrase queries: terms at relative positions, optionally within a slop.

use crate::query::{boost_suffix, field_prefix};

/// The alternatives accepted at one phrase position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhrasePosition {
    pub position: u32,
    pub terms: Vec<String>,
}

/// Matches documents where the phrase's terms occur at their relative
/// positions. With a non-zero `slop` the terms may be up to that many
/// position moves away from the exact arrangement.
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseQuery {
    pub field: String,
    pub positions: Vec<PhrasePosition>,
    pub slop: u32,
    pub boost: f32,
}

impl PhraseQuery {
    pub fn new<S: Into<String>>(field: S) -> Self {
        PhraseQuery {
            field: field.into(),
            positions: Vec::new(),
            slop: 0,
            boost: 1.0,
        }
    }

    /// Append one term per position.
    pub fn with_terms(mut self, texts: &[&str]) -> Self {
        for text in texts {
            self.add_term(*text, 1);
        }
        self
    }

    pub fn with_slop(mut self, slop: u32) -> Self {
        self.slop = slop;
        self
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// Add `text` `position_increment` positions after the last term. The
    /// first term sits at position 0.
    pub fn add_term<S: Into<String>>(&mut self, text: S, position_increment: u32) {
        let position = match self.positions.last() {
            Some(last) => last.position + position_increment,
            None => 0,
        };
        self.positions.push(PhrasePosition {
            position,
            terms: vec![text.into()],
        });
    }

    /// Add `text` as an alternative at the last position.
    pub fn append_term<S: Into<String>>(&mut self, text: S) {
        match self.positions.last_mut() {
            Some(last) => last.terms.push(text.into()),
            None => self.add_term(text, 0),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn to_query_string(&self, default_field: &str) -> String {
        let mut words = Vec::with_capacity(self.positions.len());
        let mut previous: Option<u32> = None;
        for position in &self.positions {
            if let Some(previous) = previous {
                for _ in previous + 1..position.position {
                    words.push("<>".to_string());
                }
            }
            words.push(position.terms.join("|"));
            previous = Some(position.position);
        }
        let slop = if self.slop > 0 {
            format!("~{}", self.slop)
        } else {
            String::new()
        };
        format!(
            "{}\"{}\"{}{}",
            field_prefix(&self.field, default_field),
            words.join(" "),
            slop,
            boost_suffix(self.boost)
        )
    }
}
