//! Per-field indexing configuration.
//!
//! A [`FieldInfos`] lists every field an index knows about, in the order the
//! fields were first seen. The ordinal of a field never changes once it has
//! been assigned, so segment files refer to fields by number. Fields that
//! show up in a document without having been declared are added with the
//! schema's default flags.

use std::fmt;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{GlaiveError, Result};
use crate::index::segment_infos::SegmentInfos;
use crate::storage::Storage;

/// Whether, and how, a field's original value is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StoreValue {
    No,
    #[default]
    Yes,
    /// Stored with LZ4 compression.
    Compress,
}

/// Whether, and how, a field is indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum IndexValue {
    No,
    /// The whole value is indexed as a single term.
    Untokenized,
    #[default]
    Yes,
    UntokenizedOmitNorms,
    YesOmitNorms,
}

/// Which term vector data is kept per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TermVectorValue {
    No,
    Yes,
    WithPositions,
    WithOffsets,
    #[default]
    WithPositionsOffsets,
}

/// The configuration of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub store: StoreValue,
    pub index: IndexValue,
    pub term_vector: TermVectorValue,
    pub boost: f32,
}

impl FieldInfo {
    /// Create a field, rejecting flag combinations that cannot work.
    pub fn new<S: Into<String>>(
        name: S,
        store: StoreValue,
        index: IndexValue,
        term_vector: TermVectorValue,
    ) -> Result<Self> {
        let name = name.into();
        validate(&name, store, index, term_vector)?;
        Ok(FieldInfo {
            name,
            store,
            index,
            term_vector,
            boost: 1.0,
        })
    }

    /// Set the field's index-time boost.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn is_stored(&self) -> bool {
        self.store != StoreValue::No
    }

    pub fn is_compressed(&self) -> bool {
        self.store == StoreValue::Compress
    }

    pub fn is_indexed(&self) -> bool {
        self.index != IndexValue::No
    }

    pub fn is_tokenized(&self) -> bool {
        matches!(self.index, IndexValue::Yes | IndexValue::YesOmitNorms)
    }

    pub fn omit_norms(&self) -> bool {
        matches!(
            self.index,
            IndexValue::UntokenizedOmitNorms | IndexValue::YesOmitNorms
        )
    }

    /// Whether a norm byte is written for every document.
    pub fn has_norms(&self) -> bool {
        self.is_indexed() && !self.omit_norms()
    }

    pub fn store_term_vector(&self) -> bool {
        self.term_vector != TermVectorValue::No
    }

    pub fn store_positions(&self) -> bool {
        matches!(
            self.term_vector,
            TermVectorValue::WithPositions | TermVectorValue::WithPositionsOffsets
        )
    }

    pub fn store_offsets(&self) -> bool {
        matches!(
            self.term_vector,
            TermVectorValue::WithOffsets | TermVectorValue::WithPositionsOffsets
        )
    }
}

fn validate(
    name: &str,
    store: StoreValue,
    index: IndexValue,
    term_vector: TermVectorValue,
) -> Result<()> {
    if name.is_empty() {
        return Err(GlaiveError::configuration("field name must not be empty"));
    }
    if store == StoreValue::No && index == IndexValue::No {
        return Err(GlaiveError::configuration(format!(
            "field {name} must be stored, indexed or both"
        )));
    }
    if index == IndexValue::No && term_vector != TermVectorValue::No {
        return Err(GlaiveError::configuration(format!(
            "field {name} cannot store term vectors without being indexed"
        )));
    }
    Ok(())
}

/// The ordered set of fields of an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFieldInfos", into = "RawFieldInfos")]
pub struct FieldInfos {
    store: StoreValue,
    index: IndexValue,
    term_vector: TermVectorValue,
    fields: Vec<FieldInfo>,
    by_name: AHashMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct RawFieldInfos {
    store: StoreValue,
    index: IndexValue,
    term_vector: TermVectorValue,
    fields: Vec<FieldInfo>,
}

impl From<RawFieldInfos> for FieldInfos {
    fn from(raw: RawFieldInfos) -> Self {
        let by_name = raw
            .fields
            .iter()
            .enumerate()
            .map(|(i, fi)| (fi.name.clone(), i))
            .collect();
        FieldInfos {
            store: raw.store,
            index: raw.index,
            term_vector: raw.term_vector,
            fields: raw.fields,
            by_name,
        }
    }
}

impl From<FieldInfos> for RawFieldInfos {
    fn from(fis: FieldInfos) -> Self {
        RawFieldInfos {
            store: fis.store,
            index: fis.index,
            term_vector: fis.term_vector,
            fields: fis.fields,
        }
    }
}

impl Default for FieldInfos {
    fn default() -> Self {
        FieldInfos {
            store: StoreValue::default(),
            index: IndexValue::default(),
            term_vector: TermVectorValue::default(),
            fields: Vec::new(),
            by_name: AHashMap::new(),
        }
    }
}

impl FieldInfos {
    /// Create an empty schema whose undeclared fields get these flags.
    pub fn new(store: StoreValue, index: IndexValue, term_vector: TermVectorValue) -> Result<Self> {
        validate("default", store, index, term_vector)?;
        Ok(FieldInfos {
            store,
            index,
            term_vector,
            ..Default::default()
        })
    }

    /// Add a field. Re-declaring an existing name is an error.
    pub fn add_field(&mut self, field: FieldInfo) -> Result<usize> {
        if self.by_name.contains_key(&field.name) {
            return Err(GlaiveError::configuration(format!(
                "field {} is already defined",
                field.name
            )));
        }
        let number = self.fields.len();
        self.by_name.insert(field.name.clone(), number);
        self.fields.push(field);
        Ok(number)
    }

    /// Builder form of [`add_field`](Self::add_field).
    pub fn with_field(mut self, field: FieldInfo) -> Result<Self> {
        self.add_field(field)?;
        Ok(self)
    }

    /// Number of `name`, adding it with the default flags if it is new.
    pub fn add_or_get(&mut self, name: &str) -> usize {
        if let Some(&number) = self.by_name.get(name) {
            return number;
        }
        let number = self.fields.len();
        self.by_name.insert(name.to_string(), number);
        self.fields.push(FieldInfo {
            name: name.to_string(),
            store: self.store,
            index: self.index,
            term_vector: self.term_vector,
            boost: 1.0,
        });
        log::trace!("added field {name} with default flags as #{number}");
        number
    }

    /// Look a field up by name.
    pub fn get(&self, name: &str) -> Option<&FieldInfo> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// Mutable lookup, e.g. to change a field's boost.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldInfo> {
        self.by_name.get(name).map(|&i| &mut self.fields[i])
    }

    /// Look a field up by ordinal. Negative ordinals count from the end.
    pub fn get_by_number(&self, number: isize) -> Option<&FieldInfo> {
        let index = if number < 0 {
            self.fields.len().checked_sub(number.unsigned_abs())?
        } else {
            number as usize
        };
        self.fields.get(index)
    }

    /// Ordinal of `name`.
    pub fn number(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Name of field `number`.
    pub fn name(&self, number: usize) -> Option<&str> {
        self.fields.get(number).map(|fi| fi.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldInfo> {
        self.fields.iter()
    }

    /// Field names in ordinal order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|fi| fi.name.as_str()).collect()
    }

    /// Names of the tokenized fields.
    pub fn tokenized_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|fi| fi.is_tokenized())
            .map(|fi| fi.name.as_str())
            .collect()
    }

    /// Append every field of `other` that this schema lacks. Existing
    /// ordinals are untouched.
    pub fn union(&mut self, other: &FieldInfos) {
        for field in &other.fields {
            if !self.by_name.contains_key(&field.name) {
                self.by_name.insert(field.name.clone(), self.fields.len());
                self.fields.push(field.clone());
            }
        }
    }

    /// Default store flag for undeclared fields.
    pub fn default_store(&self) -> StoreValue {
        self.store
    }

    /// Default index flag for undeclared fields.
    pub fn default_index(&self) -> IndexValue {
        self.index
    }

    /// Default term vector flag for undeclared fields.
    pub fn default_term_vector(&self) -> TermVectorValue {
        self.term_vector
    }

    /// Seed `storage` with a new, empty index using this schema. Any index
    /// already there is replaced.
    pub fn create_index(&self, storage: &dyn Storage) -> Result<()> {
        SegmentInfos::new(self.clone()).write(storage)
    }
}

impl<'a> IntoIterator for &'a FieldInfos {
    type Item = &'a FieldInfo;
    type IntoIter = std::slice::Iter<'a, FieldInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl fmt::Display for FieldInfos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "default:")?;
        writeln!(f, "  store: {:?}", self.store)?;
        writeln!(f, "  index: {:?}", self.index)?;
        writeln!(f, "  term_vector: {:?}", self.term_vector)?;
        writeln!(f, "fields:")?;
        for fi in &self.fields {
            writeln!(f, "  {}:", fi.name)?;
            writeln!(f, "    boost: {}", fi.boost)?;
            writeln!(f, "    store: {:?}", fi.store)?;
            writeln!(f, "    index: {:?}", fi.index)?;
            writeln!(f, "    term_vector: {:?}", fi.term_vector)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_invalid_combinations() {
        let err = FieldInfo::new("x", StoreValue::No, IndexValue::No, TermVectorValue::No)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = FieldInfo::new("x", StoreValue::Yes, IndexValue::No, TermVectorValue::Yes)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("x"));

        assert!(FieldInfos::new(StoreValue::No, IndexValue::No, TermVectorValue::No).is_err());
    }

    #[test]
    fn test_flags() {
        let fi = FieldInfo::new(
            "id",
            StoreValue::Compress,
            IndexValue::UntokenizedOmitNorms,
            TermVectorValue::WithOffsets,
        )
        .unwrap();
        assert!(fi.is_stored() && fi.is_compressed());
        assert!(fi.is_indexed() && !fi.is_tokenized());
        assert!(fi.omit_norms() && !fi.has_norms());
        assert!(fi.store_term_vector() && fi.store_offsets() && !fi.store_positions());
    }

    #[test]
    fn test_lookup_and_defaults() {
        let mut fis = FieldInfos::default();
        let title = FieldInfo::new("title", StoreValue::Yes, IndexValue::Untokenized, TermVectorValue::No)
            .unwrap()
            .with_boost(2.0);
        assert_eq!(fis.add_field(title).unwrap(), 0);
        assert_eq!(fis.add_or_get("body"), 1);
        assert_eq!(fis.add_or_get("title"), 0);
        assert!(fis.add_field(FieldInfo::new("body", StoreValue::Yes, IndexValue::Yes, TermVectorValue::No).unwrap()).is_err());

        assert_eq!(fis.get("title").unwrap().boost, 2.0);
        assert!(fis.get("body").unwrap().is_tokenized());
        assert_eq!(fis.get_by_number(-1).unwrap().name, "body");
        assert_eq!(fis.get_by_number(-2).unwrap().name, "title");
        assert!(fis.get_by_number(-3).is_none());
        assert!(fis.get_by_number(2).is_none());
        assert_eq!(fis.tokenized_fields(), vec!["body"]);
    }

    #[test]
    fn test_union_and_json() {
        let mut a = FieldInfos::default();
        a.add_or_get("x");
        let mut b = FieldInfos::default();
        b.add_or_get("y");
        b.add_or_get("x");
        a.union(&b);
        assert_eq!(a.field_names(), vec!["x", "y"]);

        let json = serde_json::to_string(&a).unwrap();
        let back: FieldInfos = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
        assert_eq!(back.number("y"), Some(1));
        assert!(back.to_string().contains("  y:\n"));
    }
}
