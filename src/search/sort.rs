//! Result ordering.
//!
//! A [`Sort`] is a list of [`SortField`]s compared in turn; ties left after
//! the last field go to the lower document id. Field sorts read one value
//! per document from the field's term dictionary, cached per reader.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::error::{GlaiveError, Result};
use crate::index::reader::IndexReader;
use crate::index::term::Term;

/// How a sort field's values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortType {
    /// Relevance, highest first.
    Score,
    /// Document id, lowest first.
    Doc,
    Integer,
    Float,
    String,
    /// Integer, float or string, decided by the field's first term.
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortField {
    pub field: Option<String>,
    pub sort_type: SortType,
    pub reverse: bool,
}

impl SortField {
    pub const SCORE: SortField = SortField {
        field: None,
        sort_type: SortType::Score,
        reverse: false,
    };
    pub const SCORE_REV: SortField = SortField {
        field: None,
        sort_type: SortType::Score,
        reverse: true,
    };
    pub const DOC: SortField = SortField {
        field: None,
        sort_type: SortType::Doc,
        reverse: false,
    };
    pub const DOC_REV: SortField = SortField {
        field: None,
        sort_type: SortType::Doc,
        reverse: true,
    };

    /// Sort by the values of `field`.
    pub fn new<S: Into<String>>(field: S, sort_type: SortType) -> Self {
        SortField {
            field: Some(field.into()),
            sort_type,
            reverse: false,
        }
    }

    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.field, self.sort_type) {
            (_, SortType::Score) => write!(f, "<SCORE>")?,
            (_, SortType::Doc) => write!(f, "<DOC>")?,
            (Some(field), t) => write!(f, "{field}:{t:?}")?,
            (None, t) => write!(f, "<{t:?}>")?,
        }
        if self.reverse {
            write!(f, "!")?;
        }
        Ok(())
    }
}

/// An ordered list of sort fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sort {
    pub fields: Vec<SortField>,
}

impl Sort {
    pub fn new(fields: Vec<SortField>) -> Self {
        Sort { fields }
    }

    /// Highest score first.
    pub fn relevance() -> Self {
        Sort::new(vec![SortField::SCORE, SortField::DOC])
    }

    /// Lowest score first.
    pub fn relevance_reversed() -> Self {
        Sort::new(vec![SortField::SCORE_REV, SortField::DOC])
    }

    /// Lowest document id first.
    pub fn index_order() -> Self {
        Sort::new(vec![SortField::DOC])
    }

    pub fn index_order_reversed() -> Self {
        Sort::new(vec![SortField::DOC_REV])
    }

    /// Sort by one field's values.
    pub fn by_field<S: Into<String>>(field: S, sort_type: SortType, reverse: bool) -> Self {
        Sort::new(vec![SortField::new(field, sort_type).with_reverse(reverse)])
    }
}

impl Default for Sort {
    fn default() -> Self {
        Sort::relevance()
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.fields.iter().map(ToString::to_string).collect();
        write!(f, "Sort[{}]", parts.join(", "))
    }
}

/// Per-document values of one field.
#[derive(Debug)]
pub enum FieldValues {
    Integer(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    /// Ordinal of the document's term in the field's sorted term list.
    String(Vec<Option<u32>>),
}

impl FieldValues {
    /// Load the values of `field`. When a document has several terms the
    /// last one in term order wins.
    pub fn load(reader: &IndexReader, field: &str, sort_type: SortType) -> Result<FieldValues> {
        let max_doc = reader.max_doc() as usize;
        let sort_type = match sort_type {
            SortType::Auto => detect_type(reader, field)?,
            other => other,
        };
        let mut terms = reader.terms(field)?;
        let values = match sort_type {
            SortType::Integer => {
                let mut values = vec![None; max_doc];
                while terms.next()? {
                    let Some(text) = terms.text() else { break };
                    if let Ok(value) = text.trim().parse::<i64>() {
                        mark(reader, field, text, |doc| values[doc] = Some(value))?;
                    }
                }
                FieldValues::Integer(values)
            }
            SortType::Float => {
                let mut values = vec![None; max_doc];
                while terms.next()? {
                    let Some(text) = terms.text() else { break };
                    if let Ok(value) = text.trim().parse::<f64>() {
                        mark(reader, field, text, |doc| values[doc] = Some(value))?;
                    }
                }
                FieldValues::Float(values)
            }
            SortType::String => {
                let mut values = vec![None; max_doc];
                let mut ordinal = 0u32;
                while terms.next()? {
                    let Some(text) = terms.text() else { break };
                    mark(reader, field, text, |doc| values[doc] = Some(ordinal))?;
                    ordinal += 1;
                }
                FieldValues::String(values)
            }
            SortType::Score | SortType::Doc | SortType::Auto => {
                return Err(GlaiveError::query(format!("{sort_type:?} is not a field sort type")));
            }
        };
        log::trace!("loaded {sort_type:?} sort values of {field} for {max_doc} documents");
        Ok(values)
    }

    fn key(&self, doc: u32) -> SortValue {
        let doc = doc as usize;
        match self {
            FieldValues::Integer(v) => v.get(doc).copied().flatten().map_or(SortValue::Missing, SortValue::Integer),
            FieldValues::Float(v) => v.get(doc).copied().flatten().map_or(SortValue::Missing, SortValue::Float),
            FieldValues::String(v) => v.get(doc).copied().flatten().map_or(SortValue::Missing, SortValue::Ordinal),
        }
    }
}

fn mark(reader: &IndexReader, field: &str, text: &str, mut set: impl FnMut(usize)) -> Result<()> {
    let mut docs = reader.term_docs(&Term::new(field, text))?;
    while docs.next()? {
        set(docs.doc() as usize);
    }
    Ok(())
}

fn detect_type(reader: &IndexReader, field: &str) -> Result<SortType> {
    let mut terms = reader.terms(field)?;
    if !terms.next()? {
        return Ok(SortType::String);
    }
    Ok(match terms.text().map(str::trim) {
        Some(text) if text.parse::<i64>().is_ok() => SortType::Integer,
        Some(text) if text.parse::<f64>().is_ok() => SortType::Float,
        _ => SortType::String,
    })
}

/// Cache of loaded field values, keyed by field and sort type.
#[derive(Debug, Default)]
pub struct FieldCache {
    values: Mutex<AHashMap<(String, SortType), Arc<FieldValues>>>,
}

impl FieldCache {
    pub fn get(&self, reader: &IndexReader, field: &str, sort_type: SortType) -> Result<Arc<FieldValues>> {
        let key = (field.to_string(), sort_type);
        if let Some(values) = self.values.lock().get(&key) {
            return Ok(Arc::clone(values));
        }
        let values = Arc::new(FieldValues::load(reader, field, sort_type)?);
        self.values.lock().insert(key, Arc::clone(&values));
        Ok(values)
    }
}

/// One component of a hit's sort key.
#[derive(Debug, Clone, Copy)]
enum SortValue {
    Score(f32),
    Doc(u32),
    Integer(i64),
    Float(f64),
    Ordinal(u32),
    Missing,
}

impl SortValue {
    /// Natural order, before `reverse` is applied.
    fn cmp_natural(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            // Higher scores rank first.
            (SortValue::Score(a), SortValue::Score(b)) => b.total_cmp(a),
            (SortValue::Doc(a), SortValue::Doc(b)) => a.cmp(b),
            (SortValue::Integer(a), SortValue::Integer(b)) => a.cmp(b),
            (SortValue::Float(a), SortValue::Float(b)) => a.total_cmp(b),
            (SortValue::Ordinal(a), SortValue::Ordinal(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// The sort key of a collected hit. `Less` ranks first.
#[derive(Debug, Clone)]
pub(crate) struct SortKey {
    pub(crate) doc: u32,
    pub(crate) score: f32,
    values: Vec<(SortValue, bool)>,
}

impl SortKey {
    pub(crate) fn rank(&self, other: &SortKey) -> Ordering {
        for ((a, reverse), (b, _)) in self.values.iter().zip(&other.values) {
            let ord = match (a, b) {
                // Missing values sort last in either direction.
                (SortValue::Missing, SortValue::Missing) => Ordering::Equal,
                (SortValue::Missing, _) => Ordering::Greater,
                (_, SortValue::Missing) => Ordering::Less,
                _ if *reverse => a.cmp_natural(b).reverse(),
                _ => a.cmp_natural(b),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.doc.cmp(&other.doc)
    }
}

/// A sort resolved against one reader.
#[derive(Debug)]
pub(crate) struct Sorter {
    fields: Vec<(SortField, Option<Arc<FieldValues>>)>,
}

impl Sorter {
    pub(crate) fn new(sort: &Sort, reader: &IndexReader, cache: &FieldCache) -> Result<Self> {
        let mut fields = Vec::with_capacity(sort.fields.len());
        for field in &sort.fields {
            let values = match (field.sort_type, &field.field) {
                (SortType::Score | SortType::Doc, _) => None,
                (sort_type, Some(name)) => Some(cache.get(reader, name, sort_type)?),
                (sort_type, None) => {
                    return Err(GlaiveError::query(format!("{sort_type:?} sort requires a field name")));
                }
            };
            fields.push((field.clone(), values));
        }
        Ok(Sorter { fields })
    }

    pub(crate) fn key(&self, doc: u32, score: f32) -> SortKey {
        let values = self
            .fields
            .iter()
            .map(|(field, values)| {
                let value = match (field.sort_type, values) {
                    (SortType::Score, _) => SortValue::Score(score),
                    (SortType::Doc, _) => SortValue::Doc(doc),
                    (_, Some(values)) => values.key(doc),
                    (_, None) => SortValue::Missing,
                };
                (value, field.reverse)
            })
            .collect();
        SortKey { doc, score, values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(doc: u32, score: f32, values: Vec<(SortValue, bool)>) -> SortKey {
        SortKey { doc, score, values }
    }

    #[test]
    fn test_score_then_doc() {
        let a = key(3, 2.0, vec![(SortValue::Score(2.0), false)]);
        let b = key(1, 1.0, vec![(SortValue::Score(1.0), false)]);
        let c = key(0, 2.0, vec![(SortValue::Score(2.0), false)]);
        assert_eq!(a.rank(&b), Ordering::Less);
        assert_eq!(c.rank(&a), Ordering::Less);
        let reversed = key(1, 1.0, vec![(SortValue::Score(1.0), true)]);
        assert_eq!(reversed.rank(&key(3, 2.0, vec![(SortValue::Score(2.0), true)])), Ordering::Less);
    }

    #[test]
    fn test_missing_values_sort_last() {
        let present = key(5, 0.0, vec![(SortValue::Integer(7), true)]);
        let missing = key(0, 0.0, vec![(SortValue::Missing, true)]);
        assert_eq!(present.rank(&missing), Ordering::Less);
        assert_eq!(missing.rank(&present), Ordering::Greater);
    }

    #[test]
    fn test_sort_rendering() {
        assert_eq!(Sort::relevance().to_string(), "Sort[<SCORE>, <DOC>]");
        assert_eq!(Sort::by_field("date", SortType::Integer, true).to_string(), "Sort[date:Integer!]");
        assert_eq!(Sort::default(), Sort::relevance());
    }
}
