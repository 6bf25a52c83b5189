//! Documents handed to the writer and returned by readers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One named field of a document. A field may hold several values; each
/// value is analyzed and stored separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocField {
    pub name: String,
    pub values: Vec<String>,
    pub boost: f32,
}

impl DocField {
    pub fn new<S: Into<String>>(name: S) -> Self {
        DocField {
            name: name.into(),
            values: Vec::new(),
            boost: 1.0,
        }
    }

    pub fn with_value<S: Into<String>>(mut self, value: S) -> Self {
        self.values.push(value.into());
        self
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn add_value<S: Into<String>>(&mut self, value: S) {
        self.values.push(value.into());
    }

    /// The first value, if any.
    pub fn first(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    /// All values joined with a single space.
    pub fn text(&self) -> String {
        self.values.join(" ")
    }
}

/// An ordered collection of fields plus a document-level boost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub fields: Vec<DocField>,
    pub boost: f32,
}

impl Default for Document {
    fn default() -> Self {
        Document {
            fields: Vec::new(),
            boost: 1.0,
        }
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` to field `name`, creating the field on first use.
    pub fn add_field<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.push_value(name, value);
        self
    }

    /// Append a complete field.
    pub fn with_field(mut self, field: DocField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// In-place form of [`add_field`](Self::add_field).
    pub fn push_value<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        let name = name.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.add_value(value),
            None => self.fields.push(DocField::new(name).with_value(value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&DocField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// First value of `name`.
    pub fn get_value(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(DocField::first)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Document {{")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {}: {:?}", field.name, field.values)?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_valued_fields() {
        let doc = Document::new()
            .add_field("tag", "red")
            .add_field("title", "Hello")
            .add_field("tag", "blue")
            .with_boost(2.0);

        assert_eq!(doc.len(), 2);
        assert_eq!(doc.get("tag").unwrap().values, vec!["red", "blue"]);
        assert_eq!(doc.get("tag").unwrap().text(), "red blue");
        assert_eq!(doc.get_value("title"), Some("Hello"));
        assert_eq!(doc.field_names(), vec!["tag", "title"]);
        assert_eq!(doc.boost, 2.0);
        assert_eq!(
            doc.to_string(),
            "Document { tag: [\"red\", \"blue\"], title: [\"Hello\"] }"
        );
    }
}
