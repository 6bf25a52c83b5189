//! Per-document term vectors.

use serde::{Deserialize, Serialize};

/// Byte range of one occurrence in the original field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Offset {
    pub start: usize,
    pub end: usize,
}

impl Offset {
    pub fn new(start: usize, end: usize) -> Self {
        Offset { start, end }
    }
}

/// One distinct term of a field in one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TVTerm {
    pub text: String,
    pub freq: u32,
    /// Empty unless the field stores positions.
    pub positions: Vec<u32>,
    /// Empty unless the field stores offsets.
    pub offsets: Vec<Offset>,
}

/// The terms of one field of one document, sorted by text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermVector {
    pub field: String,
    pub terms: Vec<TVTerm>,
}

impl TermVector {
    /// Find a term by text.
    pub fn find(&self, text: &str) -> Option<&TVTerm> {
        self.terms
            .binary_search_by(|t| t.text.as_str().cmp(text))
            .ok()
            .map(|i| &self.terms[i])
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Total occurrences over all terms.
    pub fn total_freq(&self) -> u64 {
        self.terms.iter().map(|t| t.freq as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find() {
        let tv = TermVector {
            field: "body".into(),
            terms: vec![
                TVTerm { text: "brown".into(), freq: 1, positions: vec![2], offsets: vec![] },
                TVTerm { text: "fox".into(), freq: 2, positions: vec![3, 5], offsets: vec![] },
            ],
        };
        assert_eq!(tv.find("fox").unwrap().positions, vec![3, 5]);
        assert!(tv.find("cat").is_none());
        assert_eq!(tv.total_freq(), 3);
    }
}
