//! Scoring boolean combinations.

use crate::error::Result;
use crate::search::scorer::{Cursor, Scorer};

/// A clause scorer and whether its clause is required.
#[derive(Debug)]
struct Clause {
    cursor: Cursor,
    required: bool,
}

/// Matches the conjunction of required clauses (or, without any, the
/// disjunction of optional ones) minus prohibited documents.
///
/// The score is the sum of the matching clause scores, in clause order,
/// times the coordination factor for the number of matching clauses.
#[derive(Debug)]
pub struct BooleanScorer {
    clauses: Vec<Clause>,
    prohibited: Vec<Cursor>,
    coord: Vec<f32>,
    has_required: bool,
    doc: Option<u32>,
    exhausted: bool,
}

impl BooleanScorer {
    /// `scorers` pairs each non-prohibited clause's scorer with whether it
    /// is required, in clause order. `coord[n]` is the factor for `n`
    /// matching clauses.
    pub(crate) fn new(scorers: Vec<(Box<dyn Scorer>, bool)>, prohibited: Vec<Box<dyn Scorer>>, coord: Vec<f32>) -> Self {
        let has_required = scorers.iter().any(|(_, required)| *required);
        BooleanScorer {
            clauses: scorers
                .into_iter()
                .map(|(scorer, required)| Clause {
                    cursor: Cursor::new(scorer),
                    required,
                })
                .collect(),
            prohibited: prohibited.into_iter().map(Cursor::new).collect(),
            coord,
            has_required,
            doc: None,
            exhausted: false,
        }
    }

    /// Smallest candidate `>= target` before prohibited clauses are
    /// checked.
    fn candidate(&mut self, target: u32) -> Result<Option<u32>> {
        if !self.has_required {
            let mut smallest: Option<u32> = None;
            for clause in &mut self.clauses {
                if let Some(doc) = clause.cursor.advance_to(target)? {
                    smallest = Some(smallest.map_or(doc, |s| s.min(doc)));
                }
            }
            return Ok(smallest);
        }
        let mut candidate = target;
        loop {
            let mut agreed = true;
            for clause in self.clauses.iter_mut().filter(|c| c.required) {
                match clause.cursor.advance_to(candidate)? {
                    None => return Ok(None),
                    Some(doc) if doc > candidate => {
                        candidate = doc;
                        agreed = false;
                    }
                    Some(_) => {}
                }
            }
            if agreed {
                return Ok(Some(candidate));
            }
        }
    }

    fn find(&mut self, mut target: u32) -> Result<bool> {
        loop {
            let Some(candidate) = self.candidate(target)? else {
                self.exhausted = true;
                return Ok(false);
            };
            let mut excluded = false;
            for cursor in &mut self.prohibited {
                if cursor.advance_to(candidate)? == Some(candidate) {
                    excluded = true;
                    break;
                }
            }
            if !excluded {
                self.doc = Some(candidate);
                return Ok(true);
            }
            let Some(next) = candidate.checked_add(1) else {
                self.exhausted = true;
                return Ok(false);
            };
            target = next;
        }
    }
}

impl Scorer for BooleanScorer {
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
        let Some(doc) = self.doc else {
            return Ok(0.0);
        };
        let mut sum = 0.0;
        let mut overlap = 0;
        for clause in &mut self.clauses {
            let matches = if clause.required {
                true
            } else {
                clause.cursor.advance_to(doc)? == Some(doc)
            };
            if matches {
                sum += clause.cursor.scorer.score()?;
                overlap += 1;
            }
        }
        Ok(sum * self.coord.get(overlap).copied().unwrap_or(1.0))
    }
}

#[cfg(test)]
mod tests {
    use bit_vec::BitVec;

    use super::*;
    use crate::search::scorer::BitsScorer;

    fn bits(docs: &[usize], value: f32) -> Box<dyn Scorer> {
        let mut bits = BitVec::from_elem(10, false);
        for &d in docs {
            bits.set(d, true);
        }
        Box::new(BitsScorer::new(bits, value))
    }

    fn collect(scorer: &mut dyn Scorer) -> Vec<(u32, f32)> {
        let mut out = Vec::new();
        while scorer.next().unwrap() {
            out.push((scorer.doc(), scorer.score().unwrap()));
        }
        out
    }

    #[test]
    fn test_disjunction_with_coord() {
        let mut scorer = BooleanScorer::new(
            vec![(bits(&[1, 3], 1.0), false), (bits(&[3, 5], 2.0), false)],
            Vec::new(),
            vec![0.0, 0.5, 1.0],
        );
        assert_eq!(collect(&mut scorer), vec![(1, 0.5), (3, 3.0), (5, 1.0)]);
    }

    #[test]
    fn test_conjunction_and_prohibited() {
        let mut scorer = BooleanScorer::new(
            vec![(bits(&[1, 3, 5, 7], 1.0), true), (bits(&[3, 5, 7, 9], 1.0), true), (bits(&[5], 1.0), false)],
            vec![bits(&[7], 1.0)],
            vec![1.0; 4],
        );
        assert_eq!(collect(&mut scorer), vec![(3, 2.0), (5, 3.0)]);
    }

    #[test]
    fn test_skip_to_stays_put() {
        let mut scorer = BooleanScorer::new(vec![(bits(&[2, 6], 1.0), true)], Vec::new(), vec![1.0; 2]);
        assert!(scorer.skip_to(1).unwrap());
        assert_eq!(scorer.doc(), 2);
        assert!(scorer.skip_to(2).unwrap());
        assert_eq!(scorer.doc(), 2);
        assert!(scorer.skip_to(3).unwrap());
        assert_eq!(scorer.doc(), 6);
        assert!(!scorer.next().unwrap());
    }
}
